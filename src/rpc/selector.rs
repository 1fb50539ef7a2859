//! RPC endpoint selection.
//!
//! # Responsibilities
//! - Probe candidate URLs and keep those serving the expected chain ID
//! - Build a read provider over the surviving URLs
//!
//! # Design Decisions
//! - Probing and construction are separate steps so callers can re-probe
//!   without rebuilding providers
//! - Probes run one at a time, never retry, and never fail: a bad endpoint is
//!   logged and dropped
//! - Construction fails hard when handed nothing to build from
//! - Nothing is cached between calls; endpoint health can change between
//!   requests

use alloy::primitives::{Address, Bytes, U256};
use alloy::rpc::types::TransactionRequest;
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::schema::GatewayConfig;
use crate::observability::metrics;
use crate::resilience::RetryPolicy;
use crate::rpc::backend::ReadBackend;
use crate::rpc::endpoint::{http_client, parse_rpc_url, HttpEndpoint};
use crate::rpc::fallback::{FallbackProvider, QuorumPolicy};
use crate::rpc::health::HealthThresholds;
use crate::rpc::types::{ChainId, RpcError, RpcResult};

/// Default per-request timeout for probes and reads.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Result of probing one candidate URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ProbeOutcome {
    Working,
    ChainMismatch { detected: u64 },
    Failed { error: String },
}

impl ProbeOutcome {
    pub fn is_working(&self) -> bool {
        matches!(self, ProbeOutcome::Working)
    }

    fn label(&self) -> &'static str {
        match self {
            ProbeOutcome::Working => "working",
            ProbeOutcome::ChainMismatch { .. } => "chain_mismatch",
            ProbeOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeReport {
    pub url: String,
    #[serde(flatten)]
    pub outcome: ProbeOutcome,
}

/// Knobs shared by probing and provider construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectorOptions {
    pub request_timeout: Duration,
    pub quorum: QuorumPolicy,
    pub retry: RetryPolicy,
    pub thresholds: HealthThresholds,
}

impl SelectorOptions {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            request_timeout: Duration::from_millis(config.rpc.request_timeout_ms),
            quorum: QuorumPolicy::at_least(config.rpc.quorum),
            retry: RetryPolicy::from(&config.retries),
            thresholds: HealthThresholds {
                healthy: config.rpc.healthy_threshold,
                unhealthy: config.rpc.unhealthy_threshold,
            },
        }
    }
}

impl Default for SelectorOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            quorum: QuorumPolicy::default(),
            retry: RetryPolicy::default(),
            thresholds: HealthThresholds::default(),
        }
    }
}

/// Provider returned by [`RpcSelector::build_provider`].
#[derive(Debug)]
pub enum ChainProvider {
    /// Exactly one working endpoint.
    Single(HttpEndpoint),
    /// Several endpoints behind a quorum fallback.
    Fallback(FallbackProvider),
}

impl ChainProvider {
    pub fn is_fallback(&self) -> bool {
        matches!(self, ChainProvider::Fallback(_))
    }

    pub fn endpoint_count(&self) -> usize {
        match self {
            ChainProvider::Single(_) => 1,
            ChainProvider::Fallback(p) => p.len(),
        }
    }

    fn backend(&self) -> &dyn ReadBackend {
        match self {
            ChainProvider::Single(p) => p,
            ChainProvider::Fallback(p) => p,
        }
    }
}

#[async_trait]
impl ReadBackend for ChainProvider {
    fn endpoints(&self) -> Vec<Url> {
        self.backend().endpoints()
    }

    async fn chain_id(&self) -> RpcResult<u64> {
        self.backend().chain_id().await
    }

    async fn get_balance(&self, address: Address) -> RpcResult<U256> {
        self.backend().get_balance(address).await
    }

    async fn call(&self, tx: TransactionRequest) -> RpcResult<Bytes> {
        self.backend().call(tx).await
    }

    async fn get_block_number(&self) -> RpcResult<u64> {
        self.backend().get_block_number().await
    }
}

/// Stateless endpoint selector.
#[derive(Debug, Clone, Copy, Default)]
pub struct RpcSelector {
    options: SelectorOptions,
}

impl RpcSelector {
    pub fn new(options: SelectorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &SelectorOptions {
        &self.options
    }

    /// Probe every candidate in order and report what each one answered.
    pub async fn probe_rpc_urls(&self, chain_id: ChainId, rpc_urls: &[String]) -> Vec<ProbeReport> {
        let mut reports = Vec::with_capacity(rpc_urls.len());
        for url in rpc_urls {
            let outcome = self.probe_one(chain_id, url).await;
            match &outcome {
                ProbeOutcome::Working => {
                    tracing::debug!(url = %url, chain_id = chain_id.0, "RPC endpoint verified");
                }
                ProbeOutcome::ChainMismatch { detected } => {
                    tracing::warn!(
                        url = %url,
                        expected = chain_id.0,
                        detected = *detected,
                        "RPC endpoint reports a different chain ID, skipping"
                    );
                }
                ProbeOutcome::Failed { error } => {
                    tracing::warn!(url = %url, error = %error, "RPC endpoint probe failed, skipping");
                }
            }
            metrics::record_probe(chain_id.0, outcome.label());
            reports.push(ProbeReport {
                url: url.clone(),
                outcome,
            });
        }
        reports
    }

    /// Return the candidates that answer `eth_chainId` with `chain_id`, in input order.
    pub async fn filter_working_rpc_urls(&self, chain_id: ChainId, rpc_urls: &[String]) -> Vec<String> {
        self.probe_rpc_urls(chain_id, rpc_urls)
            .await
            .into_iter()
            .filter(|report| report.outcome.is_working())
            .map(|report| report.url)
            .collect()
    }

    async fn probe_one(&self, chain_id: ChainId, raw_url: &str) -> ProbeOutcome {
        let endpoint = match self.transient_endpoint(chain_id, raw_url) {
            Ok(endpoint) => endpoint,
            Err(e) => return ProbeOutcome::Failed { error: e.to_string() },
        };

        match endpoint.chain_id().await {
            Ok(detected) if detected == chain_id.0 => ProbeOutcome::Working,
            Ok(detected) => ProbeOutcome::ChainMismatch { detected },
            Err(e) => ProbeOutcome::Failed { error: e.to_string() },
        }
    }

    /// An endpoint with its own unpooled client, dropped after the probe.
    fn transient_endpoint(&self, chain_id: ChainId, raw_url: &str) -> RpcResult<HttpEndpoint> {
        let url = parse_rpc_url(raw_url)?;
        let client = http_client(self.options.request_timeout, false)?;
        Ok(HttpEndpoint::connect(url, chain_id, client))
    }

    /// Build a read provider over already-verified URLs.
    ///
    /// One URL yields a single-endpoint provider; several yield a fallback
    /// provider using the configured quorum (1-of-N by default).
    pub fn build_provider(&self, chain_id: ChainId, rpc_urls: &[String]) -> RpcResult<ChainProvider> {
        if rpc_urls.is_empty() {
            return Err(RpcError::NoEndpoints(chain_id));
        }

        let client = http_client(self.options.request_timeout, true)?;
        let mut endpoints = rpc_urls
            .iter()
            .map(|raw| parse_rpc_url(raw).map(|url| HttpEndpoint::connect(url, chain_id, client.clone())))
            .collect::<RpcResult<Vec<_>>>()?;

        if endpoints.len() == 1 {
            if self.options.quorum.min_successes() > 1 {
                return Err(RpcError::InvalidQuorum {
                    required: self.options.quorum.min_successes(),
                    available: 1,
                });
            }
            let endpoint = endpoints.remove(0);
            tracing::debug!(url = %endpoint.url(), chain_id = chain_id.0, "Built single-endpoint provider");
            return Ok(ChainProvider::Single(endpoint));
        }

        let backends: Vec<Arc<dyn ReadBackend>> = endpoints
            .into_iter()
            .map(|e| Arc::new(e) as Arc<dyn ReadBackend>)
            .collect();
        let provider = FallbackProvider::new(
            backends,
            self.options.quorum,
            self.options.retry,
            self.options.thresholds,
        )?;
        tracing::debug!(
            chain_id = chain_id.0,
            endpoints = provider.len(),
            quorum = self.options.quorum.min_successes(),
            "Built fallback provider"
        );
        Ok(ChainProvider::Fallback(provider))
    }
}

/// [`RpcSelector::filter_working_rpc_urls`] with default options.
pub async fn filter_working_rpc_urls(chain_id: ChainId, rpc_urls: &[String]) -> Vec<String> {
    RpcSelector::default()
        .filter_working_rpc_urls(chain_id, rpc_urls)
        .await
}

/// [`RpcSelector::build_provider`] with default options.
pub fn build_provider(chain_id: ChainId, rpc_urls: &[String]) -> RpcResult<ChainProvider> {
    RpcSelector::default().build_provider(chain_id, rpc_urls)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_candidates_yield_empty_result() {
        let working = filter_working_rpc_urls(ChainId(137), &[]).await;
        assert!(working.is_empty());
    }

    #[tokio::test]
    async fn test_unparsable_url_is_excluded() {
        let reports = RpcSelector::default()
            .probe_rpc_urls(ChainId(137), &urls(&["not a url"]))
            .await;
        assert_eq!(reports.len(), 1);
        assert!(matches!(reports[0].outcome, ProbeOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_build_provider_requires_endpoints() {
        let err = build_provider(ChainId(137), &[]).unwrap_err();
        assert!(matches!(err, RpcError::NoEndpoints(ChainId(137))));
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_build_single_endpoint_provider() {
        let provider = build_provider(ChainId(137), &urls(&["https://good.example"])).unwrap();
        assert!(!provider.is_fallback());
        assert_eq!(provider.endpoint_count(), 1);
        let endpoints = provider.endpoints();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].host_str(), Some("good.example"));
    }

    #[tokio::test]
    async fn test_build_fallback_provider() {
        let provider = build_provider(
            ChainId(137),
            &urls(&["https://a.example", "https://b.example"]),
        )
        .unwrap();
        assert!(provider.is_fallback());
        assert_eq!(provider.endpoint_count(), 2);
        match provider {
            ChainProvider::Fallback(p) => assert_eq!(p.quorum().min_successes(), 1),
            ChainProvider::Single(_) => panic!("expected fallback provider"),
        }
    }

    #[tokio::test]
    async fn test_build_provider_rejects_invalid_url() {
        let err = build_provider(ChainId(1), &urls(&["https://a.example", "ftp://b.example"])).unwrap_err();
        assert!(matches!(err, RpcError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_single_endpoint_cannot_meet_larger_quorum() {
        let selector = RpcSelector::new(SelectorOptions {
            quorum: QuorumPolicy::at_least(2),
            ..SelectorOptions::default()
        });
        let err = selector
            .build_provider(ChainId(1), &urls(&["https://a.example"]))
            .unwrap_err();
        assert!(matches!(err, RpcError::InvalidQuorum { required: 2, available: 1 }));
    }

    #[test]
    fn test_probe_report_serialization() {
        let report = ProbeReport {
            url: "https://wrong-chain.example".into(),
            outcome: ProbeOutcome::ChainMismatch { detected: 80002 },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "chain_mismatch");
        assert_eq!(json["detected"], 80002);
        assert_eq!(json["url"], "https://wrong-chain.example");
    }
}
