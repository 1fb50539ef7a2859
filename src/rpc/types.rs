//! Chain-specific types and error definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Chain ID type for strong typing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl From<u64> for ChainId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<ChainId> for u64 {
    fn from(id: ChainId) -> Self {
        id.0
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors that can occur while selecting endpoints or reading chain state.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Provider construction was attempted without any endpoint.
    #[error("no endpoints provided for chain {0}")]
    NoEndpoints(ChainId),

    /// An endpoint URL could not be parsed.
    #[error("invalid RPC URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client backing the transport could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// The endpoint failed at the transport or JSON-RPC level.
    #[error("RPC error from {url}: {message}")]
    Transport { url: String, message: String },

    /// Chain configuration mismatch.
    #[error("chain ID mismatch at {url}: expected {expected}, got {actual}")]
    ChainMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    /// The quorum asks for more agreeing endpoints than the provider holds.
    #[error("quorum of {required} cannot be met by {available} endpoint(s)")]
    InvalidQuorum { required: usize, available: usize },

    /// No value gathered enough agreeing responses.
    #[error("quorum of {required} not reached after {attempts} attempt(s): {last_error}")]
    QuorumNotReached {
        required: usize,
        attempts: u32,
        last_error: String,
    },
}

impl RpcError {
    /// True when the error comes from configuration rather than upstream availability.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            RpcError::NoEndpoints(_) | RpcError::InvalidUrl { .. } | RpcError::Client(_)
        )
    }
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;
