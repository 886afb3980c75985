//! Response bodies and the error envelope.
//!
//! Every failure leaves the service as
//! `{"error": {"kind", "stage", "message", "field"?, "retryable"}}`.

use alloy::primitives::B256;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::error::{Classify, ErrorKind};
use crate::relay::types::BundleStatus;
use crate::revocation::{RevocationError, RevocationReceipt};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedResponse {
    pub status: &'static str,
    pub tx_hash: B256,
    pub bundle_hash: String,
    pub chain: String,
    pub nonce: u64,
    pub target_block: u64,
    pub request_id: String,
}

impl SubmittedResponse {
    pub fn new(receipt: RevocationReceipt, request_id: String) -> Self {
        Self {
            status: "submitted",
            tx_hash: receipt.tx_hash,
            bundle_hash: receipt.handle.bundle_id,
            chain: receipt.handle.chain_key,
            nonce: receipt.nonce,
            target_block: receipt.target_block,
            request_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(flatten)]
    pub status: BundleStatus,
    pub bundle_hash: String,
    pub chain: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bundle_hash: Option<String>,
    pub detail: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    kind: String,
    stage: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    retryable: bool,
}

#[derive(Debug, Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

/// An error ready to be sent to the caller.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    pub fn bad_request(kind: ErrorKind, stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: ErrorBody {
                kind: kind.to_string(),
                stage,
                message: message.into(),
                field: None,
                retryable: false,
            },
        }
    }

    pub fn not_found(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            body: ErrorBody {
                kind: "not_found".into(),
                stage,
                message: message.into(),
                field: None,
                retryable: false,
            },
        }
    }

    pub fn conflict(stage: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            body: ErrorBody {
                kind: "conflict".into(),
                stage,
                message: message.into(),
                field: None,
                retryable: false,
            },
        }
    }

    pub fn internal(stage: &'static str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: ErrorBody {
                kind: ErrorKind::Internal.to_string(),
                stage,
                message: "internal error".into(),
                field: None,
                retryable: false,
            },
        }
    }

    /// The request deadline passed while the flow could still be stopped.
    pub fn timed_out(stage: &'static str) -> Self {
        Self {
            status: StatusCode::GATEWAY_TIMEOUT,
            body: ErrorBody {
                kind: ErrorKind::Cancelled.to_string(),
                stage,
                message: "request timed out before relay submission; nothing was sent".into(),
                field: None,
                retryable: true,
            },
        }
    }

    pub fn payload_too_large(stage: &'static str) -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            body: ErrorBody {
                kind: ErrorKind::Validation.to_string(),
                stage,
                message: "request body too large".into(),
                field: None,
                retryable: false,
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation | ErrorKind::Key => StatusCode::BAD_REQUEST,
        ErrorKind::UpstreamTransient | ErrorKind::UpstreamRejected => StatusCode::BAD_GATEWAY,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Cancelled => StatusCode::CONFLICT,
    }
}

impl From<RevocationError> for ApiError {
    fn from(err: RevocationError) -> Self {
        let kind = err.kind();
        let message = match kind {
            ErrorKind::Internal => {
                tracing::error!(stage = err.stage(), error = %err, "Internal error");
                "internal error".to_string()
            }
            _ => err.to_string(),
        };
        Self {
            status: status_for(kind),
            body: ErrorBody {
                kind: kind.to_string(),
                stage: err.stage(),
                message,
                field: err.field(),
                retryable: kind.is_retryable(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorEnvelope { error: self.body })).into_response()
    }
}
