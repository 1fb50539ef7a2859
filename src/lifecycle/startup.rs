//! Startup orchestration.
//!
//! Order: config → logging → metrics → listener → watcher → server.
//! Any startup error is fatal.

use std::path::{Path, PathBuf};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, ConfigWatcher, GatewayConfig};
use crate::http::HttpServer;
use crate::lifecycle::signals::shutdown_signal;
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV_VAR: &str = "TIPJAR_CONFIG";

/// Config file used when neither an argument nor the env var is given.
pub const DEFAULT_CONFIG_PATH: &str = "tipjar.toml";

/// Resolve the config path from an explicit argument, then the environment.
pub fn config_path(arg: Option<String>) -> PathBuf {
    arg.or_else(|| std::env::var(CONFIG_PATH_ENV_VAR).ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Start the gateway and block until a termination signal.
pub async fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let file_exists = path.exists();
    let config = if file_exists {
        load_config(path)?
    } else {
        GatewayConfig::default()
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "tipjar-gateway starting");
    if !file_exists {
        tracing::warn!(path = ?path, "Config file not found, using defaults");
    }
    tracing::info!(
        bind_address = %config.listener.bind_address,
        chains = config.chains.len(),
        request_timeout_ms = config.rpc.request_timeout_ms,
        quorum = config.rpc.quorum,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let (_watcher, config_updates) = if file_exists {
        let (watcher, updates) = ConfigWatcher::new(path);
        (Some(watcher.run()?), updates)
    } else {
        let (_, updates) = mpsc::unbounded_channel();
        (None, updates)
    };

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    let server_task = tokio::spawn(server.run(listener, config_updates, server_shutdown));

    shutdown_signal().await;
    shutdown.trigger();
    server_task.await??;

    tracing::info!("Shutdown complete");
    Ok(())
}
