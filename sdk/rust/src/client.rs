use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeRequest {
    pub token_address: String,
    pub spender_address: String,
    pub signer_address: String,
    pub signer_private_key: String,
    pub chain: String,
}

impl fmt::Debug for RevokeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RevokeRequest")
            .field("token_address", &self.token_address)
            .field("spender_address", &self.spender_address)
            .field("signer_address", &self.signer_address)
            .field("signer_private_key", &"<redacted>")
            .field("chain", &self.chain)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevokeResponse {
    pub status: String,
    pub tx_hash: String,
    pub bundle_hash: String,
    pub chain: String,
    pub nonce: u64,
    pub target_block: u64,
    pub request_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusQuery {
    pub bundle_hash: String,
    pub chain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_block: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// One of pending, included, not_included, failed, unknown.
    pub status: String,
    #[serde(default)]
    pub block_number: Option<u64>,
    #[serde(default)]
    pub reason: Option<String>,
    pub bundle_hash: String,
    pub chain: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub status: String,
    #[serde(default)]
    pub bundle_hash: Option<String>,
    pub detail: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    pub kind: String,
    pub stage: String,
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
    pub retryable: bool,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("service returned {status}: {} ({})", error.message, error.kind)]
    Api { status: u16, error: ApiErrorBody },

    #[error("unexpected response {status}: {body}")]
    UnexpectedResponse { status: u16, body: String },
}

impl SdkError {
    /// The service's structured error, if it sent one.
    pub fn api_error(&self) -> Option<&ApiErrorBody> {
        match self {
            SdkError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            SdkError::Api { status, .. } | SdkError::UnexpectedResponse { status, .. } => Some(*status),
            SdkError::Transport(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

pub struct RevokerClient {
    client: Client,
    base_url: String,
}

impl RevokerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit a sponsored revocation.
    pub async fn revoke(&self, req: &RevokeRequest) -> Result<RevokeResponse, SdkError> {
        self.revoke_inner(req, None).await
    }

    /// Submit a sponsored revocation under a caller-chosen request id, so it
    /// can be cancelled with [`RevokerClient::cancel`].
    pub async fn revoke_with_id(&self, req: &RevokeRequest, request_id: &str) -> Result<RevokeResponse, SdkError> {
        self.revoke_inner(req, Some(request_id)).await
    }

    async fn revoke_inner(&self, req: &RevokeRequest, request_id: Option<&str>) -> Result<RevokeResponse, SdkError> {
        let mut builder = self
            .client
            .post(format!("{}/api/sponsored-tx", self.base_url))
            .json(req);
        if let Some(id) = request_id {
            builder = builder.header("x-request-id", id);
        }
        decode(builder.send().await?).await
    }

    pub async fn bundle_status(&self, query: &StatusQuery) -> Result<StatusResponse, SdkError> {
        let resp = self
            .client
            .post(format!("{}/api/bundle-status", self.base_url))
            .json(query)
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn cancel(&self, request_id: &str) -> Result<CancelResponse, SdkError> {
        let resp = self
            .client
            .post(format!("{}/api/sponsored-tx/{}/cancel", self.base_url, request_id))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn health(&self) -> Result<serde_json::Value, SdkError> {
        let resp = self.client.get(format!("{}/health", self.base_url)).send().await?;
        decode(resp).await
    }
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, SdkError> {
    let status = resp.status();
    let text = resp.text().await?;

    if status.is_success() {
        return serde_json::from_str(&text).map_err(|_| SdkError::UnexpectedResponse {
            status: status.as_u16(),
            body: text,
        });
    }

    match serde_json::from_str::<ErrorEnvelope>(&text) {
        Ok(envelope) => Err(SdkError::Api {
            status: status.as_u16(),
            error: envelope.error,
        }),
        Err(_) => Err(SdkError::UnexpectedResponse {
            status: status.as_u16(),
            body: text,
        }),
    }
}
