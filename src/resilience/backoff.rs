//! Exponential backoff with jitter between fallback rounds.

use rand::Rng;
use std::time::Duration;

/// Delay before retry round `round` (1-based), doubling from `base` up to `max`
/// plus up to 10% jitter.
pub fn calculate_backoff(round: u32, base: Duration, max: Duration) -> Duration {
    if round == 0 {
        return Duration::ZERO;
    }

    let base_ms = base.as_millis().min(u64::MAX as u128) as u64;
    let max_ms = max.as_millis().min(u64::MAX as u128) as u64;

    let factor = 2u64.saturating_pow(round - 1);
    let capped = base_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = capped / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
