//! API error type and its HTTP mapping.
//!
//! | cause                              | status | code                    |
//! |------------------------------------|--------|-------------------------|
//! | chain not configured               | 400    | `UNSUPPORTED_CHAIN`     |
//! | malformed address / parameter      | 400    | `INVALID_ADDRESS`, `INVALID_REQUEST` |
//! | chain has no RPC URLs              | 500    | `RPC_NOT_CONFIGURED`    |
//! | faucet address missing             | 500    | `FAUCET_NOT_CONFIGURED` |
//! | every candidate failed its probe   | 503    | `NO_HEALTHY_RPC`        |
//! | read failed after construction     | 502    | `RPC_CALL_FAILED`       |
//! | whole request exceeded its timeout | 408    | `REQUEST_TIMEOUT`       |

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::rpc::{ChainId, RpcError};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("chain {0} is not supported")]
    UnsupportedChain(ChainId),

    #[error("no RPC endpoints configured for chain {0}")]
    RpcNotConfigured(ChainId),

    #[error("no healthy RPC endpoint for chain {0}")]
    NoHealthyRpc(ChainId),

    #[error("faucet address is not configured")]
    FaucetNotConfigured,

    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("request did not complete within {0:?}")]
    Timeout(std::time::Duration),

    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Serialize)]
struct ErrorDetail<'a> {
    code: &'a str,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::UnsupportedChain(_) | ApiError::InvalidAddress(_) | ApiError::InvalidRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::RpcNotConfigured(_) | ApiError::FaucetNotConfigured => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NoHealthyRpc(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rpc(e) if e.is_configuration() => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Rpc(RpcError::InvalidQuorum { .. }) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Rpc(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::UnsupportedChain(_) => "UNSUPPORTED_CHAIN",
            ApiError::InvalidAddress(_) => "INVALID_ADDRESS",
            ApiError::InvalidRequest(_) => "INVALID_REQUEST",
            ApiError::RpcNotConfigured(_) => "RPC_NOT_CONFIGURED",
            ApiError::FaucetNotConfigured => "FAUCET_NOT_CONFIGURED",
            ApiError::NoHealthyRpc(_) => "NO_HEALTHY_RPC",
            ApiError::Timeout(_) => "REQUEST_TIMEOUT",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Rpc(e) if e.is_configuration() => "RPC_NOT_CONFIGURED",
            ApiError::Rpc(RpcError::InvalidQuorum { .. }) => "NO_HEALTHY_RPC",
            ApiError::Rpc(_) => "RPC_CALL_FAILED",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(code = self.code(), error = %self, "Request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "Request rejected");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            },
        };
        (status, Json(body)).into_response()
    }
}
