//! Flashbots-style private relay client.
//!
//! Requests are JSON-RPC 2.0 over HTTPS, authenticated with the
//! `X-Flashbots-Signature` header produced by the relay identity key.

use alloy::hex;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::blockchain::registry::{ChainContext, ChainRegistry};
use crate::blockchain::wallet::Wallet;
use crate::relay::types::{Bundle, RelayBundleStats, RelayError};

pub const SIGNATURE_HEADER: &str = "X-Flashbots-Signature";

/// Operations a private relay must support.
#[async_trait]
pub trait BundleRelay: Send + Sync {
    /// Submit a bundle; returns the relay's bundle identifier.
    async fn send_bundle(&self, bundle: &Bundle) -> Result<String, RelayError>;

    /// Relay-side statistics, or `None` when the relay does not know the bundle.
    async fn bundle_status(
        &self,
        bundle_id: &str,
        target_block: Option<u64>,
    ) -> Result<Option<RelayBundleStats>, RelayError>;
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendBundleResult {
    bundle_hash: String,
}

/// HTTP client for one relay endpoint.
#[derive(Clone)]
pub struct FlashbotsRelay {
    http: reqwest::Client,
    endpoint: Url,
    identity: Arc<Wallet>,
    timeout: Duration,
}

impl FlashbotsRelay {
    pub fn new(http: reqwest::Client, endpoint: Url, identity: Arc<Wallet>, timeout: Duration) -> Self {
        Self {
            http,
            endpoint,
            identity,
            timeout,
        }
    }

    /// Issue one signed JSON-RPC call. `Ok(None)` means a null result.
    async fn request<T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: Value,
    ) -> Result<Option<T>, RelayError> {
        let body = serde_json::to_vec(&json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        }))
        .map_err(|e| RelayError::MalformedResponse(e.to_string()))?;

        let signature = self
            .identity
            .sign_request_body(&body)
            .map_err(|e| RelayError::Auth(e.to_string()))?;

        let response = self
            .http
            .post(self.endpoint.clone())
            .timeout(self.timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature)
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    RelayError::Timeout(self.timeout)
                } else {
                    RelayError::Unavailable(e.to_string())
                }
            })?;

        let status = response.status();
        if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(RelayError::Unavailable(format!("{method}: HTTP {status}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| RelayError::Unavailable(e.to_string()))?;
        let parsed: Result<JsonRpcResponse, _> = serde_json::from_str(&text);

        match parsed {
            Ok(JsonRpcResponse { error: Some(err), .. }) => Err(RelayError::Rejected {
                code: err.code,
                message: err.message,
            }),
            Ok(_) if status.is_client_error() => Err(RelayError::Rejected {
                code: i64::from(status.as_u16()),
                message: text,
            }),
            Ok(JsonRpcResponse { result: None, .. })
            | Ok(JsonRpcResponse { result: Some(Value::Null), .. }) => Ok(None),
            Ok(JsonRpcResponse { result: Some(value), .. }) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| RelayError::MalformedResponse(format!("{method}: {e}"))),
            Err(_) if status.is_client_error() => Err(RelayError::Rejected {
                code: i64::from(status.as_u16()),
                message: text,
            }),
            Err(e) => Err(RelayError::MalformedResponse(format!("{method}: {e}"))),
        }
    }
}

#[async_trait]
impl BundleRelay for FlashbotsRelay {
    async fn send_bundle(&self, bundle: &Bundle) -> Result<String, RelayError> {
        let txs: Vec<String> = bundle
            .transactions()
            .iter()
            .map(|tx| hex::encode_prefixed(&tx.raw_bytes))
            .collect();
        let mut params = json!({ "txs": txs });
        if let Some(block) = bundle.target_block() {
            params["blockNumber"] = json!(format!("{block:#x}"));
        }

        let result: Option<SendBundleResult> = self.request("eth_sendBundle", json!([params])).await?;
        result
            .map(|r| r.bundle_hash)
            .ok_or_else(|| RelayError::MalformedResponse("eth_sendBundle: missing bundleHash".into()))
    }

    async fn bundle_status(
        &self,
        bundle_id: &str,
        target_block: Option<u64>,
    ) -> Result<Option<RelayBundleStats>, RelayError> {
        let mut params = json!({ "bundleHash": bundle_id });
        if let Some(block) = target_block {
            params["blockNumber"] = json!(format!("{block:#x}"));
        }

        match self.request("flashbots_getBundleStatsV2", json!([params])).await {
            Err(RelayError::Rejected { message, .. })
                if message.to_ascii_lowercase().contains("not found") =>
            {
                Ok(None)
            }
            other => other,
        }
    }
}

impl std::fmt::Debug for FlashbotsRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlashbotsRelay")
            .field("endpoint", &self.endpoint.as_str())
            .field("identity", &self.identity.address())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Chain key → relay client.
#[derive(Clone, Default)]
pub struct RelaySelector {
    relays: HashMap<String, Arc<dyn BundleRelay>>,
}

impl RelaySelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// One relay client per registered chain, sharing a connection pool.
    pub fn connect(
        registry: &ChainRegistry,
        identity: Arc<Wallet>,
        timeout: Duration,
    ) -> Result<Self, RelayError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::NotConfigured(e.to_string()))?;

        let mut selector = Self::new();
        for ctx in registry.chains() {
            let relay = FlashbotsRelay::new(
                http.clone(),
                ctx.relay_endpoint.clone(),
                identity.clone(),
                timeout,
            );
            selector.insert(&ctx.chain_key, Arc::new(relay));
        }

        tracing::info!(
            identity = %identity.address(),
            chains = registry.len(),
            "Relay clients initialized"
        );
        Ok(selector)
    }

    pub fn insert(&mut self, chain_key: &str, relay: Arc<dyn BundleRelay>) {
        self.relays.insert(chain_key.to_string(), relay);
    }

    pub fn for_chain(&self, ctx: &ChainContext) -> Result<Arc<dyn BundleRelay>, RelayError> {
        self.relays
            .get(&ctx.chain_key)
            .cloned()
            .ok_or_else(|| RelayError::NotConfigured(ctx.chain_key.clone()))
    }
}

impl std::fmt::Debug for RelaySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut chains: Vec<_> = self.relays.keys().collect();
        chains.sort();
        f.debug_struct("RelaySelector").field("chains", &chains).finish()
    }
}
