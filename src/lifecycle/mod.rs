//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Init logging/metrics → Bind → Watch config → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received (signals.rs) → trigger → server drains → Exit
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
