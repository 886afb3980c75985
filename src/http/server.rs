//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing, CORS, body limit)
//! - Bind server to listener and drain on shutdown

use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{get, post},
    Router,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{RevokerConfig, StatusConfig};
use crate::http::handlers;
use crate::http::request::X_REQUEST_ID;
use crate::revocation::{CancelHandle, SponsoredRevocationOrchestrator};

/// How long a finished revocation can still be looked up by the cancel route.
pub const CANCEL_RETENTION: Duration = Duration::from_secs(300);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<SponsoredRevocationOrchestrator>,
    pub in_flight: Arc<DashMap<String, CancelHandle>>,
    pub status: StatusConfig,
    pub cancel_retention: Duration,
    /// Deadline for a revocation request to reach the relay.
    pub request_timeout: Duration,
}

/// HTTP front end of the revocation service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(orchestrator: Arc<SponsoredRevocationOrchestrator>, config: &RevokerConfig) -> Self {
        let state = AppState {
            orchestrator,
            in_flight: Arc::new(DashMap::new()),
            status: config.status.clone(),
            cancel_retention: CANCEL_RETENTION,
            request_timeout: Duration::from_secs(config.timeouts.request_secs),
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &RevokerConfig, state: AppState) -> Router {
        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let request_id = req
                    .headers()
                    .get(X_REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id,
                )
            }))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(CorsLayer::permissive());

        Router::new()
            .route("/health", get(handlers::health))
            .route("/api/sponsored-tx", post(handlers::submit_revocation))
            .route("/api/sponsored-tx/{request_id}/cancel", post(handlers::cancel_revocation))
            .route("/api/bundle-status", post(handlers::bundle_status))
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_bytes))
            .layer(middleware)
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires, then drain open requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::revocation::test_support::{test_orchestrator, MockRelay, MockRpc};
    use alloy::primitives::{address, Address, B256};
    use axum::http::{header, StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const SIGNER: Address = address!("f39Fd6e51aad88F6F4ce6aB8827279cffFb92266");
    const BUNDLE: &str = "0x2b1b7e5c3f6a4a6c1e2d8d1a3c3f0b9e8a7d6c5b4a39281706f5e4d3c2b1a090";

    fn server(rpc: MockRpc, relay: MockRelay) -> HttpServer {
        server_with(rpc, Arc::new(relay), &RevokerConfig::default())
    }

    fn server_with(rpc: MockRpc, relay: Arc<MockRelay>, config: &RevokerConfig) -> HttpServer {
        let orchestrator = Arc::new(test_orchestrator(Arc::new(rpc), relay));
        HttpServer::new(orchestrator, config)
    }

    fn one_second_deadline() -> RevokerConfig {
        let mut config = RevokerConfig::default();
        config.timeouts.request_secs = 1;
        config
    }

    fn revoke_body(spender: &str, chain: &str) -> Value {
        json!({
            "tokenAddress": "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48",
            "spenderAddress": spender,
            "signerAddress": SIGNER.to_string(),
            "signerPrivateKey": "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
            "chain": chain,
        })
    }

    fn post_json(uri: &str, body: &Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(router: Router, req: Request<Body>) -> (StatusCode, Value) {
        let res = router.oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn test_submit_returns_bundle_and_request_id() {
        let server = server(MockRpc::new(1).with_nonce(SIGNER, 7), MockRelay::accepting("0xbundle"));
        let mut req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );
        req.headers_mut().insert(X_REQUEST_ID, "req-1".parse().unwrap());

        let res = server.router().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.headers()[X_REQUEST_ID], "req-1");

        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["bundleHash"], "0xbundle");
        assert_eq!(body["chain"], "ethereum");
        assert_eq!(body["nonce"], 7);
        assert_eq!(body["targetBlock"], 101);
        assert_eq!(body["requestId"], "req-1");
        assert!(body["txHash"].as_str().unwrap().starts_with("0x"));
    }

    #[tokio::test]
    async fn test_short_spender_is_400_with_field() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let req = post_json("/api/sponsored-tx", &revoke_body("0x123", "ethereum"));
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");
        assert_eq!(body["error"]["field"], "spender");
    }

    #[tokio::test]
    async fn test_unsupported_chain_is_400() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "fantom"),
        );
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "chain");
    }

    #[tokio::test]
    async fn test_relay_rejection_is_502() {
        let server = server(MockRpc::new(1), MockRelay::rejecting(-32000, "simulation failed"));
        let req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["kind"], "upstream_rejected");
        assert_eq!(body["error"]["stage"], "submit");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let req = post_json("/api/sponsored-tx", &json!({ "tokenAddress": "0x00" }));
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["stage"], "request");
    }

    #[tokio::test]
    async fn test_mistyped_key_is_not_echoed() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let mut body = revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum");
        body["signerPrivateKey"] = json!(7_788_990_011_223_344u64);
        let (status, body) = send(server.router(), post_json("/api/sponsored-tx", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["kind"], "validation");
        assert!(!body.to_string().contains("7788990011223344"));
    }

    #[tokio::test]
    async fn test_oversized_body_is_413_envelope() {
        let mut config = RevokerConfig::default();
        config.listener.max_body_bytes = 64;
        let relay = Arc::new(MockRelay::accepting("0xbundle"));
        let server = server_with(MockRpc::new(1), relay.clone(), &config);

        let req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["kind"], "validation");
        assert_eq!(body["error"]["stage"], "request");
        assert!(!body.to_string().contains("ac0974bec39a17e36ba4a6b4d238ff944bacb478"));
        assert_eq!(relay.submissions(), 0);
    }

    #[tokio::test]
    async fn test_deadline_before_relay_cancels_with_envelope() {
        let relay = Arc::new(MockRelay::accepting("0xbundle"));
        let server = server_with(
            MockRpc::new(1).with_delay(Duration::from_millis(700)),
            relay.clone(),
            &one_second_deadline(),
        );
        let req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );

        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body["error"]["kind"], "cancelled");
        assert_eq!(body["error"]["retryable"], true);

        // The detached flow must not reach the relay afterwards.
        tokio::time::sleep(Duration::from_millis(2_000)).await;
        assert_eq!(relay.submissions(), 0);
    }

    #[tokio::test]
    async fn test_deadline_after_submission_waits_for_relay() {
        let relay = Arc::new(MockRelay::accepting("0xbundle").with_delay(Duration::from_millis(1_500)));
        let server = server_with(MockRpc::new(1), relay.clone(), &one_second_deadline());
        let req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );

        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["bundleHash"], "0xbundle");
        assert_eq!(relay.submissions(), 1);
    }

    #[tokio::test]
    async fn test_cancel_unknown_request_is_404() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let req = Request::post("/api/sponsored-tx/nope/cancel").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["kind"], "not_found");
    }

    #[tokio::test]
    async fn test_cancel_after_submission_reports_bundle() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let mut req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );
        req.headers_mut().insert(X_REQUEST_ID, "req-2".parse().unwrap());
        let (status, _) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);

        let req = Request::post("/api/sponsored-tx/req-2/cancel").body(Body::empty()).unwrap();
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "submitted");
        assert_eq!(body["bundleHash"], "0xbundle");
    }

    #[tokio::test]
    async fn test_cancel_while_building_returns_cancelled() {
        let server = server(
            MockRpc::new(1).with_delay(Duration::from_millis(300)),
            MockRelay::accepting("0xbundle"),
        );
        let router = server.router();

        let mut req = post_json(
            "/api/sponsored-tx",
            &revoke_body("0x1111111254EEB25477B68fb85Ed929f73A960582", "ethereum"),
        );
        req.headers_mut().insert(X_REQUEST_ID, "req-3".parse().unwrap());
        let submit = tokio::spawn(send(router.clone(), req));

        tokio::time::sleep(Duration::from_millis(50)).await;
        let req = Request::post("/api/sponsored-tx/req-3/cancel").body(Body::empty()).unwrap();
        let (status, body) = send(router, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "cancelled");

        let (status, body) = submit.await.unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["kind"], "cancelled");
    }

    #[tokio::test]
    async fn test_status_falls_back_to_chain() {
        let tx_hash = B256::repeat_byte(0x11);
        let server = server(
            MockRpc::new(1).with_mined(tx_hash, 77),
            MockRelay::accepting("0xbundle"),
        );
        let req = post_json(
            "/api/bundle-status",
            &json!({ "bundleHash": BUNDLE, "txHash": tx_hash.to_string() }),
        );
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "included");
        assert_eq!(body["blockNumber"], 77);
        assert_eq!(body["bundleHash"], BUNDLE);
        assert_eq!(body["chain"], "ethereum");
    }

    #[tokio::test]
    async fn test_status_rejects_bad_hash() {
        let server = server(MockRpc::new(1), MockRelay::accepting("0xbundle"));
        let req = post_json("/api/bundle-status", &json!({ "bundleHash": "0xabc" }));
        let (status, body) = send(server.router(), req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "bundleHash");
    }
}
