//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, timeout, request ID, metrics)
//! - Hold the live configuration snapshot and apply reloads
//! - Serve until the shutdown signal fires

use arc_swap::ArcSwap;
use axum::{error_handling::HandleErrorLayer, middleware, routing::get, BoxError, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::timeout::{error::Elapsed, TimeoutLayer};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::error::ApiError;
use crate::http::handlers;
use crate::http::middleware::track_requests;
use crate::http::request::MakeRequestUuidV4;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ArcSwap<GatewayConfig>>,
}

impl AppState {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config: Arc::new(ArcSwap::from_pointee(config)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn config(&self) -> Arc<GatewayConfig> {
        self.config.load_full()
    }

    /// Swap in a new configuration for subsequent requests.
    pub fn replace_config(&self, config: GatewayConfig) {
        tracing::info!(chains = config.chains.len(), "Configuration reloaded");
        self.config.store(Arc::new(config));
    }
}

/// Map a middleware error into the JSON error body.
fn timeout_error(err: BoxError, limit: Duration) -> ApiError {
    if err.is::<Elapsed>() {
        tracing::warn!(timeout = ?limit, "Request timed out");
        ApiError::Timeout(limit)
    } else {
        ApiError::Internal(err.to_string())
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let request_timeout = Duration::from_secs(config.listener.request_timeout_secs);
        let state = AppState::new(config);
        let router = Self::build_router(state.clone(), request_timeout);
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/chains", get(handlers::list_chains))
            .route("/api/chains/{chain_id}/rpc", get(handlers::probe_chain))
            .route(
                "/api/chains/{chain_id}/balance/{address}",
                get(handlers::address_balance),
            )
            .route("/api/faucet/balance", get(handlers::faucet_balance))
            .route_layer(middleware::from_fn(track_requests))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(HandleErrorLayer::new(move |err: BoxError| async move {
                        timeout_error(err, request_timeout)
                    }))
                    .layer(TimeoutLayer::new(request_timeout)),
            )
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
    }

    /// Shared state, e.g. for applying reloads from outside the server.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// The router, for serving or driving in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.replace_config(config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}
