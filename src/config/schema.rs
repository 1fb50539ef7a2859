//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::rpc::ChainId;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, request deadline).
    pub listener: ListenerConfig,

    /// RPC probing and provider settings.
    pub rpc: RpcConfig,

    /// Retry configuration for fallback rounds.
    pub retries: RetryConfig,

    /// Chains and their candidate RPC URLs.
    pub chains: Vec<ChainConfig>,

    /// Faucet wallet whose gas balance is exposed.
    pub faucet: FaucetConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl GatewayConfig {
    /// Look up a configured chain.
    pub fn chain(&self, chain_id: ChainId) -> Option<&ChainConfig> {
        self.chains.iter().find(|c| c.chain_id == chain_id.0)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Deadline for a whole request, probing included, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// RPC probing and provider configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Per-request timeout for probes and reads in milliseconds.
    pub request_timeout_ms: u64,

    /// Number of endpoints that must agree on a response.
    pub quorum: usize,

    /// Consecutive successes before an endpoint is healthy again.
    pub healthy_threshold: usize,

    /// Consecutive failures before an endpoint is tried last.
    pub unhealthy_threshold: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            quorum: 1,
            healthy_threshold: 1,
            unhealthy_threshold: 2,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of fallback rounds, including the first.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

/// A chain and its candidate endpoints.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ChainConfig {
    /// Chain ID (e.g., 137 for Polygon, 80002 for Amoy).
    pub chain_id: u64,

    /// Display name.
    #[serde(default)]
    pub name: String,

    /// Candidate JSON-RPC URLs in fallback order.
    #[serde(default)]
    pub rpc_urls: Vec<String>,
}

/// Faucet configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FaucetConfig {
    /// Address of the faucet wallet.
    pub address: Option<Address>,

    /// Chain used when a request does not name one.
    pub default_chain_id: Option<u64>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
