//! Chain-read subsystem.
//!
//! # Data Flow
//! ```text
//! configured candidate URLs
//!     → selector.rs (probe eth_chainId, drop mismatched/unreachable)
//!     → selector.rs (build provider from survivors)
//!         one URL   → endpoint.rs (HttpEndpoint)
//!         many URLs → fallback.rs (FallbackProvider, quorum 1-of-N)
//!     → backend.rs contract (balance, eth_call, block number)
//! ```
//!
//! # Design Decisions
//! - Probe failures are soft, construction failures are hard
//! - Providers live for one request; nothing is pooled process-wide
//! - All calls go out unbatched

pub mod backend;
pub mod endpoint;
pub mod fallback;
pub mod health;
pub mod selector;
pub mod types;

pub use backend::ReadBackend;
pub use endpoint::HttpEndpoint;
pub use fallback::{FallbackProvider, QuorumPolicy};
pub use selector::{
    build_provider, filter_working_rpc_urls, ChainProvider, ProbeOutcome, ProbeReport, RpcSelector,
    SelectorOptions,
};
pub use types::{ChainId, RpcError, RpcResult};
