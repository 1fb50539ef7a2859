//! Resilience helpers for post-construction RPC calls.
//!
//! # Data Flow
//! ```text
//! Fallback round fails to reach quorum:
//!     → retries.rs (are rounds left?)
//!     → backoff.rs (how long to wait)
//!     → next round
//! ```

pub mod backoff;
pub mod retries;

pub use retries::RetryPolicy;
