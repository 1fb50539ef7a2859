//! Fallback aggregation over several read backends.
//!
//! # Call Flow
//! ```text
//! call
//!     → order members (healthy first, configured order as tie-break)
//!     → try each member sequentially, tallying equal responses
//!     → return once a value reaches the quorum
//!     → round exhausted: back off and start another round, or fail
//! ```
//!
//! # Design Decisions
//! - Members are trait objects, so an aggregator can hold endpoints or other
//!   aggregators
//! - The quorum is a plain policy value; 1-of-N is the default
//! - Health is tracked for the provider's lifetime only

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use url::Url;

use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::rpc::backend::ReadBackend;
use crate::rpc::health::{EndpointHealth, HealthThresholds};
use crate::rpc::types::{RpcError, RpcResult};

/// Minimum number of members that must return the same value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuorumPolicy {
    min_successes: NonZeroUsize,
}

impl QuorumPolicy {
    pub fn new(min_successes: NonZeroUsize) -> Self {
        Self { min_successes }
    }

    /// Build from a raw count, treating 0 as 1.
    pub fn at_least(min_successes: usize) -> Self {
        Self::new(NonZeroUsize::new(min_successes).unwrap_or(NonZeroUsize::MIN))
    }

    pub fn min_successes(&self) -> usize {
        self.min_successes.get()
    }
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self::new(NonZeroUsize::MIN)
    }
}

struct Member {
    backend: Arc<dyn ReadBackend>,
    health: EndpointHealth,
}

/// Read provider that fans a call out across members until quorum is met.
pub struct FallbackProvider {
    members: Vec<Member>,
    quorum: QuorumPolicy,
    retry: RetryPolicy,
    thresholds: HealthThresholds,
}

impl FallbackProvider {
    /// Create an aggregator over `backends` in fallback order.
    ///
    /// Fails when the quorum exceeds the number of backends.
    pub fn new(
        backends: Vec<Arc<dyn ReadBackend>>,
        quorum: QuorumPolicy,
        retry: RetryPolicy,
        thresholds: HealthThresholds,
    ) -> RpcResult<Self> {
        if backends.is_empty() || quorum.min_successes() > backends.len() {
            return Err(RpcError::InvalidQuorum {
                required: quorum.min_successes(),
                available: backends.len(),
            });
        }

        let members = backends
            .into_iter()
            .map(|backend| Member {
                backend,
                health: EndpointHealth::new(),
            })
            .collect();

        Ok(Self {
            members,
            quorum,
            retry,
            thresholds,
        })
    }

    pub fn quorum(&self) -> QuorumPolicy {
        self.quorum
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Number of members currently considered healthy.
    pub fn healthy_count(&self) -> usize {
        self.members.iter().filter(|m| m.health.is_healthy()).count()
    }

    fn ordered_members(&self) -> impl Iterator<Item = &Member> {
        let (healthy, unhealthy): (Vec<_>, Vec<_>) =
            self.members.iter().partition(|m| m.health.is_healthy());
        healthy.into_iter().chain(unhealthy)
    }

    fn record_outcome(&self, member: &Member, ok: bool) {
        let transitioned = if ok {
            member.health.mark_success(self.thresholds.healthy)
        } else {
            member.health.mark_failure(self.thresholds.unhealthy)
        };
        if transitioned {
            for url in member.backend.endpoints() {
                tracing::info!(url = %url, healthy = ok, "Endpoint health changed");
                metrics::record_endpoint_health(url.as_str(), ok);
            }
        }
    }

    async fn execute<T, F, Fut>(&self, method: &'static str, op: F) -> RpcResult<T>
    where
        T: PartialEq,
        F: Fn(Arc<dyn ReadBackend>) -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        let required = self.quorum.min_successes();
        let attempts = self.retry.attempts();
        let mut last_error = String::from("no endpoint responded");

        for attempt in 1..=attempts {
            if attempt > 1 {
                let delay = self.retry.delay_before(attempt);
                tracing::debug!(method, attempt, delay = ?delay, "Retrying fallback round");
                tokio::time::sleep(delay).await;
            }

            let mut tallies: Vec<(T, usize)> = Vec::new();

            for (position, member) in self.ordered_members().enumerate() {
                match op(member.backend.clone()).await {
                    Ok(value) => {
                        self.record_outcome(member, true);
                        let idx = match tallies.iter().position(|(seen, _)| *seen == value) {
                            Some(i) => {
                                tallies[i].1 += 1;
                                i
                            }
                            None => {
                                tallies.push((value, 1));
                                tallies.len() - 1
                            }
                        };
                        if tallies[idx].1 >= required {
                            return Ok(tallies.swap_remove(idx).0);
                        }
                    }
                    Err(e) => {
                        self.record_outcome(member, false);
                        tracing::warn!(method, member = position, error = %e, "RPC error, trying next endpoint");
                        last_error = e.to_string();
                    }
                }
            }

            if tallies.len() > 1 {
                last_error = format!("{} distinct responses disagreed", tallies.len());
            }
        }

        Err(RpcError::QuorumNotReached {
            required,
            attempts,
            last_error,
        })
    }
}

#[async_trait]
impl ReadBackend for FallbackProvider {
    fn endpoints(&self) -> Vec<Url> {
        self.members
            .iter()
            .flat_map(|m| m.backend.endpoints())
            .collect()
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        self.execute("eth_chainId", |b| async move { b.chain_id().await })
            .await
    }

    async fn get_balance(&self, address: Address) -> RpcResult<U256> {
        self.execute("eth_getBalance", |b| async move {
            b.get_balance(address).await
        })
        .await
    }

    async fn call(&self, tx: TransactionRequest) -> RpcResult<Bytes> {
        self.execute("eth_call", |b| {
            let tx = tx.clone();
            async move { b.call(tx).await }
        })
        .await
    }

    async fn get_block_number(&self) -> RpcResult<u64> {
        self.execute("eth_blockNumber", |b| async move {
            b.get_block_number().await
        })
        .await
    }
}

impl fmt::Debug for FallbackProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let urls: Vec<String> = self.endpoints().iter().map(Url::to_string).collect();
        f.debug_struct("FallbackProvider")
            .field("endpoints", &urls)
            .field("quorum", &self.quorum.min_successes())
            .field("max_attempts", &self.retry.max_attempts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Backend that replays scripted balances and counts calls.
    #[derive(Debug)]
    struct ScriptedBackend {
        url: Url,
        responses: Mutex<Vec<Option<u64>>>,
        calls: AtomicUsize,
    }

    impl ScriptedBackend {
        /// `None` entries fail; the last entry repeats forever.
        fn new(name: &str, responses: Vec<Option<u64>>) -> Arc<Self> {
            Arc::new(Self {
                url: Url::parse(&format!("https://{}.example", name)).unwrap(),
                responses: Mutex::new(responses),
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn next(&self) -> RpcResult<u64> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            let next = if responses.len() > 1 {
                responses.remove(0)
            } else {
                responses[0]
            };
            next.ok_or_else(|| RpcError::Transport {
                url: self.url.to_string(),
                message: "connection refused".into(),
            })
        }
    }

    #[async_trait]
    impl ReadBackend for ScriptedBackend {
        fn endpoints(&self) -> Vec<Url> {
            vec![self.url.clone()]
        }

        async fn chain_id(&self) -> RpcResult<u64> {
            self.next()
        }

        async fn get_balance(&self, _address: Address) -> RpcResult<U256> {
            self.next().map(U256::from)
        }

        async fn call(&self, _tx: TransactionRequest) -> RpcResult<Bytes> {
            self.next().map(|v| Bytes::from(v.to_be_bytes().to_vec()))
        }

        async fn get_block_number(&self) -> RpcResult<u64> {
            self.next()
        }
    }

    fn provider(backends: Vec<Arc<ScriptedBackend>>, quorum: usize) -> RpcResult<FallbackProvider> {
        let backends = backends
            .into_iter()
            .map(|b| b as Arc<dyn ReadBackend>)
            .collect();
        FallbackProvider::new(
            backends,
            QuorumPolicy::at_least(quorum),
            RetryPolicy::none(),
            HealthThresholds::default(),
        )
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let a = ScriptedBackend::new("a", vec![Some(10)]);
        let b = ScriptedBackend::new("b", vec![Some(20)]);
        let p = provider(vec![a.clone(), b.clone()], 1).unwrap();

        assert_eq!(p.get_balance(Address::ZERO).await.unwrap(), U256::from(10));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 0);
    }

    #[tokio::test]
    async fn test_falls_back_on_failure() {
        let a = ScriptedBackend::new("a", vec![None]);
        let b = ScriptedBackend::new("b", vec![Some(20)]);
        let p = provider(vec![a.clone(), b.clone()], 1).unwrap();

        assert_eq!(p.get_balance(Address::ZERO).await.unwrap(), U256::from(20));
        assert_eq!(a.calls(), 1);
        assert_eq!(b.calls(), 1);
    }

    #[tokio::test]
    async fn test_fails_only_when_all_fail() {
        let a = ScriptedBackend::new("a", vec![None]);
        let b = ScriptedBackend::new("b", vec![None]);
        let p = provider(vec![a, b], 1).unwrap();

        let err = p.get_block_number().await.unwrap_err();
        match err {
            RpcError::QuorumNotReached { required, attempts, last_error } => {
                assert_eq!(required, 1);
                assert_eq!(attempts, 1);
                assert!(last_error.contains("connection refused"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_unhealthy_member_is_tried_last() {
        let a = ScriptedBackend::new("a", vec![None]);
        let b = ScriptedBackend::new("b", vec![Some(7)]);
        let p = provider(vec![a.clone(), b.clone()], 1).unwrap();

        // Default unhealthy threshold is 2 consecutive failures.
        p.chain_id().await.unwrap();
        p.chain_id().await.unwrap();
        assert_eq!(p.healthy_count(), 1);
        assert_eq!(a.calls(), 2);

        p.chain_id().await.unwrap();
        assert_eq!(a.calls(), 2, "unhealthy member should be skipped once b answers");
        assert_eq!(b.calls(), 3);
    }

    #[tokio::test]
    async fn test_quorum_of_two_agreeing() {
        let a = ScriptedBackend::new("a", vec![Some(5)]);
        let b = ScriptedBackend::new("b", vec![Some(9)]);
        let c = ScriptedBackend::new("c", vec![Some(5)]);
        let p = provider(vec![a, b, c.clone()], 2).unwrap();

        assert_eq!(p.chain_id().await.unwrap(), 5);
        assert_eq!(c.calls(), 1);
    }

    #[tokio::test]
    async fn test_quorum_of_two_disagreeing() {
        let a = ScriptedBackend::new("a", vec![Some(5)]);
        let b = ScriptedBackend::new("b", vec![Some(9)]);
        let p = provider(vec![a, b], 2).unwrap();

        let err = p.chain_id().await.unwrap_err();
        assert!(err.to_string().contains("disagreed"));
    }

    #[tokio::test]
    async fn test_retry_round_recovers() {
        let a = ScriptedBackend::new("a", vec![None, Some(3)]);
        let backends: Vec<Arc<dyn ReadBackend>> = vec![a.clone()];
        let retry = RetryPolicy {
            max_attempts: 2,
            base_delay: std::time::Duration::from_millis(1),
            max_delay: std::time::Duration::from_millis(5),
        };
        let p = FallbackProvider::new(backends, QuorumPolicy::default(), retry, HealthThresholds::default())
            .unwrap();

        assert_eq!(p.get_block_number().await.unwrap(), 3);
        assert_eq!(a.calls(), 2);
    }

    #[test]
    fn test_quorum_larger_than_members_is_rejected() {
        let a = ScriptedBackend::new("a", vec![Some(1)]);
        let err = provider(vec![a], 2).unwrap_err();
        assert!(matches!(err, RpcError::InvalidQuorum { required: 2, available: 1 }));
    }

    #[test]
    fn test_endpoints_preserve_order() {
        let a = ScriptedBackend::new("a", vec![Some(1)]);
        let b = ScriptedBackend::new("b", vec![Some(1)]);
        let p = provider(vec![a, b], 1).unwrap();
        let hosts: Vec<String> = p
            .endpoints()
            .iter()
            .filter_map(|u| u.host_str().map(str::to_string))
            .collect();
        assert_eq!(hosts, vec!["a.example", "b.example"]);
    }
}
