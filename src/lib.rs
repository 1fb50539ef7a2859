//! Chain-read gateway for the creator-tipping platform.
//!
//! The core is [`rpc::selector`]: probe candidate RPC URLs for the expected
//! chain ID, then build a read provider (single endpoint or quorum fallback)
//! over the survivors. The rest of the crate serves that over HTTP.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod rpc;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use rpc::{build_provider, filter_working_rpc_urls, ChainId, ChainProvider, RpcSelector};
