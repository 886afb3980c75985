//! Shared utilities for integration testing: a scripted JSON-RPC node, a
//! scripted private relay and a helper that boots the service against them.

#![allow(dead_code)]

use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use approval_revoker::config::{ChainConfig, RevokerConfig};
use approval_revoker::http::HttpServer;
use approval_revoker::lifecycle::{build_orchestrator, Shutdown};

pub const SIGNER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";
pub const SIGNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
pub const SPONSOR_KEY: &str = "59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const TOKEN: &str = "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48";
pub const SPENDER: &str = "0x1111111254EEB25477B68fb85Ed929f73A960582";

async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    addr
}

fn rpc_result(id: &Value, result: Value) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "result": result }))
}

fn rpc_error(id: &Value, code: i64, message: &str) -> Json<Value> {
    Json(json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } }))
}

/// Scripted Ethereum node. Nothing is ever mined.
pub struct NodeState {
    pub chain_id: u64,
    pub nonce: AtomicU64,
    pub head: AtomicU64,
    pub gas_price: u128,
    pub methods: Mutex<Vec<String>>,
}

pub struct MockNode {
    pub url: String,
    pub state: Arc<NodeState>,
}

impl MockNode {
    pub fn calls(&self, method: &str) -> usize {
        self.state.methods.lock().unwrap().iter().filter(|m| *m == method).count()
    }
}

pub async fn spawn_node(chain_id: u64, nonce: u64) -> MockNode {
    let state = Arc::new(NodeState {
        chain_id,
        nonce: AtomicU64::new(nonce),
        head: AtomicU64::new(100),
        gas_price: 1_000_000_000,
        methods: Mutex::new(Vec::new()),
    });
    let addr = serve(Router::new().route("/", post(node_handler)).with_state(state.clone())).await;
    MockNode {
        url: format!("http://{addr}"),
        state,
    }
}

async fn node_handler(State(state): State<Arc<NodeState>>, Json(req): Json<Value>) -> Json<Value> {
    let id = req["id"].clone();
    let method = req["method"].as_str().unwrap_or_default().to_string();
    state.methods.lock().unwrap().push(method.clone());

    let quantity = |n: u128| json!(format!("{n:#x}"));
    match method.as_str() {
        "eth_chainId" => rpc_result(&id, quantity(state.chain_id.into())),
        "eth_blockNumber" => rpc_result(&id, quantity(state.head.load(Ordering::SeqCst).into())),
        "eth_getTransactionCount" => rpc_result(&id, quantity(state.nonce.load(Ordering::SeqCst).into())),
        "eth_gasPrice" => rpc_result(&id, quantity(state.gas_price)),
        "eth_estimateGas" => rpc_result(&id, quantity(46_000)),
        "eth_getTransactionByHash" => rpc_result(&id, Value::Null),
        _ => rpc_error(&id, -32601, "method not found"),
    }
}

#[derive(Debug, Clone)]
pub enum RelayMode {
    Accept,
    Reject,
    Unavailable,
}

/// Scripted Flashbots-style relay.
pub struct RelayState {
    pub mode: Mutex<RelayMode>,
    /// Returned by `flashbots_getBundleStatsV2`; `None` answers "bundle not found".
    pub stats: Mutex<Option<Value>>,
    pub bundles: Mutex<Vec<Value>>,
    pub signatures: Mutex<Vec<String>>,
    pub send_attempts: AtomicU64,
}

pub struct MockRelay {
    pub url: String,
    pub state: Arc<RelayState>,
}

pub const RELAY_BUNDLE_HASH: &str = "0x6a2f0fe3a1f46d3e3f6c4f8d2b1e9a7c5d3b1f0e9d8c7b6a5f4e3d2c1b0a9f8e";

impl MockRelay {
    pub fn bundles(&self) -> Vec<Value> {
        self.state.bundles.lock().unwrap().clone()
    }

    pub fn signatures(&self) -> Vec<String> {
        self.state.signatures.lock().unwrap().clone()
    }

    pub fn send_attempts(&self) -> u64 {
        self.state.send_attempts.load(Ordering::SeqCst)
    }

    pub fn set_stats(&self, stats: Value) {
        *self.state.stats.lock().unwrap() = Some(stats);
    }
}

pub async fn spawn_relay(mode: RelayMode) -> MockRelay {
    let state = Arc::new(RelayState {
        mode: Mutex::new(mode),
        stats: Mutex::new(None),
        bundles: Mutex::new(Vec::new()),
        signatures: Mutex::new(Vec::new()),
        send_attempts: AtomicU64::new(0),
    });
    let addr = serve(Router::new().route("/", post(relay_handler)).with_state(state.clone())).await;
    MockRelay {
        url: format!("http://{addr}/"),
        state,
    }
}

async fn relay_handler(
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    Json(req): Json<Value>,
) -> axum::response::Response {
    use axum::response::IntoResponse;

    let id = req["id"].clone();
    if let Some(sig) = headers.get("x-flashbots-signature").and_then(|v| v.to_str().ok()) {
        state.signatures.lock().unwrap().push(sig.to_string());
    }

    match req["method"].as_str() {
        Some("eth_sendBundle") => {
            state.send_attempts.fetch_add(1, Ordering::SeqCst);
            let mode = state.mode.lock().unwrap().clone();
            match mode {
                RelayMode::Accept => {
                    state.bundles.lock().unwrap().push(req["params"][0].clone());
                    rpc_result(&id, json!({ "bundleHash": RELAY_BUNDLE_HASH })).into_response()
                }
                RelayMode::Reject => rpc_error(&id, -32000, "bundle simulation failed").into_response(),
                RelayMode::Unavailable => axum::http::StatusCode::SERVICE_UNAVAILABLE.into_response(),
            }
        }
        Some("flashbots_getBundleStatsV2") => match state.stats.lock().unwrap().clone() {
            Some(stats) => rpc_result(&id, stats).into_response(),
            None => rpc_error(&id, -32000, "bundle not found").into_response(),
        },
        _ => rpc_error(&id, -32601, "method not found").into_response(),
    }
}

/// Config pointing the "ethereum" chain at `node` and every relay call at `relay`.
pub fn service_config(node: &MockNode, relay: &MockRelay) -> RevokerConfig {
    let mut config = RevokerConfig::default();
    config.chains.clear();
    config
        .chains
        .insert("ethereum".into(), ChainConfig::with_rpc(&node.url, node.state.chain_id));
    config.relay.url = relay.url.clone();
    config.relay.timeout_secs = 2;
    config.timeouts.rpc_secs = 2;
    config.retries.base_delay_ms = 1;
    config.retries.max_delay_ms = 5;
    config.status.poll_interval_ms = 10;
    config.status.max_poll_interval_ms = 20;
    config.listener.bind_address = "127.0.0.1:0".into();
    config
}

/// A running service instance; shuts down when dropped.
pub struct RunningService {
    pub base_url: String,
    shutdown: Shutdown,
}

impl Drop for RunningService {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

pub async fn start_service(config: RevokerConfig) -> RunningService {
    let orchestrator = Arc::new(build_orchestrator(&config).await.unwrap());
    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(orchestrator, &config);
    tokio::spawn(server.run(listener, shutdown.subscribe()));

    RunningService {
        base_url: format!("http://{addr}"),
        shutdown,
    }
}
