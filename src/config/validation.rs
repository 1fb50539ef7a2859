//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, thresholds >= 1)
//! - Check chain entries (unique IDs, http(s) URLs)
//! - Check references (faucet default chain exists)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - A chain with no URLs is accepted; requests for it fail at runtime with a
//!   configuration error

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::rpc::endpoint::parse_rpc_url;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("retries.base_delay_ms ({base}) exceeds retries.max_delay_ms ({max})")]
    DelayRange { base: u64, max: u64 },

    #[error("chain_id must be positive")]
    ZeroChainId,

    #[error("chain {0} is configured more than once")]
    DuplicateChain(u64),

    #[error("chain {chain_id}: {reason}")]
    InvalidRpcUrl { chain_id: u64, reason: String },

    #[error("faucet.default_chain_id {0} is not a configured chain")]
    UnknownFaucetChain(u64),
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("listener.request_timeout_secs"));
    }

    if config.rpc.request_timeout_ms == 0 {
        errors.push(ValidationError::Zero("rpc.request_timeout_ms"));
    }
    if config.rpc.quorum == 0 {
        errors.push(ValidationError::Zero("rpc.quorum"));
    }
    if config.rpc.healthy_threshold == 0 {
        errors.push(ValidationError::Zero("rpc.healthy_threshold"));
    }
    if config.rpc.unhealthy_threshold == 0 {
        errors.push(ValidationError::Zero("rpc.unhealthy_threshold"));
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::Zero("retries.max_attempts"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::DelayRange {
            base: config.retries.base_delay_ms,
            max: config.retries.max_delay_ms,
        });
    }

    let mut seen = HashSet::new();
    for chain in &config.chains {
        if chain.chain_id == 0 {
            errors.push(ValidationError::ZeroChainId);
        } else if !seen.insert(chain.chain_id) {
            errors.push(ValidationError::DuplicateChain(chain.chain_id));
        }
        for url in &chain.rpc_urls {
            if let Err(e) = parse_rpc_url(url) {
                errors.push(ValidationError::InvalidRpcUrl {
                    chain_id: chain.chain_id,
                    reason: e.to_string(),
                });
            }
        }
    }

    if let Some(chain_id) = config.faucet.default_chain_id {
        if !config.chains.iter().any(|c| c.chain_id == chain_id) {
            errors.push(ValidationError::UnknownFaucetChain(chain_id));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
