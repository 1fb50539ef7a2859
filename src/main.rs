//! tipjar-gateway
//!
//! Chain-read gateway for the creator-tipping platform.
//!
//! # Architecture Overview
//!
//! ```text
//!   API request                ┌──────────────────────────────────────────────┐
//!   ──────────────────────────▶│ http (axum)                                  │
//!                              │   handlers ──▶ rpc::selector                 │
//!                              │                 probe eth_chainId per URL    │
//!                              │                 build provider from survivors│
//!                              │                   │                          │
//!                              │                   ▼                          │
//!                              │   single endpoint │ fallback (quorum 1-of-N)  │──▶ JSON-RPC
//!   JSON response              │                   │                          │    endpoints
//!   ◀──────────────────────────│   shape balance JSON                         │
//!                              │                                              │
//!                              │ config (TOML + env, hot reload) │ logging    │
//!                              │ metrics (Prometheus)            │ lifecycle  │
//!                              └──────────────────────────────────────────────┘
//! ```
//!
//! Usage: `tipjar-gateway [CONFIG_PATH]` (or `TIPJAR_CONFIG`, default
//! `tipjar.toml`).

use tipjar_gateway::lifecycle::startup;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = startup::config_path(std::env::args().nth(1));
    startup::run(&path).await
}
