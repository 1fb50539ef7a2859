//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

use tipjar_gateway::config::{ChainConfig, GatewayConfig};
use tipjar_gateway::lifecycle::Shutdown;
use tipjar_gateway::HttpServer;

/// How a mock node answers.
#[derive(Debug, Clone)]
pub struct NodeBehavior {
    pub chain_id: u64,
    pub balance_wei: u128,
    /// Delay before every response.
    pub delay: Duration,
    /// Answer every request with HTTP 500.
    pub broken: bool,
    /// Answer `eth_getBalance` with a JSON-RPC error while `eth_chainId` still works.
    pub failing_reads: bool,
}

impl NodeBehavior {
    pub fn chain(chain_id: u64) -> Self {
        Self {
            chain_id,
            balance_wei: 0,
            delay: Duration::ZERO,
            broken: false,
            failing_reads: false,
        }
    }

    pub fn balance(mut self, wei: u128) -> Self {
        self.balance_wei = wei;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.failing_reads = true;
        self
    }
}

#[derive(Default)]
pub struct NodeStats {
    pub requests: AtomicUsize,
    pub batches: AtomicUsize,
    pub balance_calls: AtomicUsize,
}

struct NodeState {
    behavior: NodeBehavior,
    stats: Arc<NodeStats>,
}

/// A JSON-RPC node answering `eth_chainId`, `eth_getBalance` and `eth_blockNumber`.
pub struct MockNode {
    pub addr: SocketAddr,
    pub stats: Arc<NodeStats>,
}

impl MockNode {
    pub async fn start(behavior: NodeBehavior) -> Self {
        let stats = Arc::new(NodeStats::default());
        let state = Arc::new(NodeState {
            behavior,
            stats: stats.clone(),
        });

        let app = Router::new().route("/", post(handle)).with_state(state);
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self { addr, stats }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> usize {
        self.stats.requests.load(Ordering::SeqCst)
    }

    pub fn batches(&self) -> usize {
        self.stats.batches.load(Ordering::SeqCst)
    }

    pub fn balance_calls(&self) -> usize {
        self.stats.balance_calls.load(Ordering::SeqCst)
    }
}

async fn handle(State(state): State<Arc<NodeState>>, Json(body): Json<Value>) -> impl IntoResponse {
    state.stats.requests.fetch_add(1, Ordering::SeqCst);
    if !state.behavior.delay.is_zero() {
        tokio::time::sleep(state.behavior.delay).await;
    }
    if state.behavior.broken {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!("down"))).into_response();
    }

    let reply = match body {
        Value::Array(calls) => {
            state.stats.batches.fetch_add(1, Ordering::SeqCst);
            Value::Array(calls.iter().map(|c| answer(&state, c)).collect())
        }
        call => answer(&state, &call),
    };
    Json(reply).into_response()
}

fn answer(state: &NodeState, call: &Value) -> Value {
    let id = call.get("id").cloned().unwrap_or(Value::Null);
    let method = call.get("method").and_then(Value::as_str).unwrap_or_default();

    let result = match method {
        "eth_chainId" => json!(format!("0x{:x}", state.behavior.chain_id)),
        "eth_blockNumber" => json!("0x10"),
        "eth_getBalance" => {
            state.stats.balance_calls.fetch_add(1, Ordering::SeqCst);
            if state.behavior.failing_reads {
                return json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": { "code": -32000, "message": "header not found" }
                });
            }
            json!(format!("0x{:x}", state.behavior.balance_wei))
        }
        other => {
            return json!({
                "jsonrpc": "2.0",
                "id": id,
                "error": { "code": -32601, "message": format!("method {} not found", other) }
            });
        }
    };

    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

/// A URL nothing listens on.
pub async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

/// Gateway config with fast timeouts and metrics off.
pub fn gateway_config(chains: Vec<(u64, Vec<String>)>) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.rpc.request_timeout_ms = 500;
    config.retries.max_attempts = 1;
    config.chains = chains
        .into_iter()
        .map(|(chain_id, rpc_urls)| ChainConfig {
            chain_id,
            name: format!("chain-{}", chain_id),
            rpc_urls,
        })
        .collect();
    config
}

/// Serve a gateway on an ephemeral port. Returns its base URL.
pub async fn start_gateway(config: GatewayConfig, shutdown: &Shutdown) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (_tx, updates) = tokio::sync::mpsc::unbounded_channel();
    let server = HttpServer::new(config);
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, updates, server_shutdown).await;
    });

    format!("http://{}", addr)
}

/// One recorded tracing event.
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: HashMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Tracing layer that keeps every event for later assertions.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl LogCapture {
    /// Route this thread's events into the capture until the guard drops.
    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        tracing::subscriber::set_default(tracing_subscriber::registry().with(self.clone()))
    }

    pub fn events(&self, level: Level, target: &str) -> Vec<CapturedEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level && e.target == target)
            .cloned()
            .collect()
    }
}

struct FieldRecorder<'a>(&'a mut HashMap<String, String>);

impl Visit for FieldRecorder<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

impl<S: Subscriber> Layer<S> for LogCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = HashMap::new();
        event.record(&mut FieldRecorder(&mut fields));
        self.events.lock().unwrap().push(CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
        });
    }
}
