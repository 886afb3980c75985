//! Route handlers.
//!
//! A revocation runs in its own task so a dropped client connection does not
//! abort it halfway through. Its [`CancelHandle`] stays registered under the
//! request id for a while after completion, so a late cancel call can still
//! learn the bundle hash.
//!
//! The request deadline is enforced here rather than by middleware. A flow
//! that has not reached the relay is cancelled when the deadline passes; one
//! that has is awaited, so the response always says what the relay got.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::blockchain::address::validate_hash;
use crate::error::{ErrorKind, InputField};
use crate::http::request::{BundleStatusRequest, SponsoredTxRequest, X_REQUEST_ID};
use crate::http::response::{ApiError, CancelResponse, StatusResponse, SubmittedResponse};
use crate::http::server::AppState;
use crate::relay::types::BundleHandle;
use crate::revocation::{cancel_pair, CancelHandle, CancelOutcome, RevocationError, RevocationRequest};

fn request_id(headers: &HeaderMap) -> String {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}

/// Fixed messages only: the rejection text quotes the offending input.
fn bad_body(rejection: JsonRejection) -> ApiError {
    tracing::debug!(status = %rejection.status(), "Request body rejected");
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::payload_too_large("request");
    }
    let message = match rejection {
        JsonRejection::MissingJsonContentType(_) => "expected an application/json request body",
        JsonRejection::JsonSyntaxError(_) => "request body is not valid JSON",
        JsonRejection::JsonDataError(_) => "request body is missing fields or has fields of the wrong type",
        _ => "request body could not be read",
    };
    ApiError::bad_request(ErrorKind::Validation, "request", message)
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" })))
}

pub async fn submit_revocation(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<SponsoredTxRequest>, JsonRejection>,
) -> Result<Json<SubmittedResponse>, ApiError> {
    let Json(body) = body.map_err(bad_body)?;
    let request_id = request_id(&headers);
    let request = RevocationRequest::from(body);

    let (handle, token) = cancel_pair();
    state.in_flight.insert(request_id.clone(), handle.clone());

    let orchestrator = state.orchestrator.clone();
    let mut task = tokio::spawn(async move { orchestrator.revoke_with_cancel(request, &token).await });
    let result = match tokio::time::timeout(state.request_timeout, &mut task).await {
        Ok(joined) => joined,
        Err(_) => match handle.cancel() {
            CancelOutcome::Cancelled => {
                tracing::warn!(request_id = %request_id, "Revocation timed out before relay submission");
                evict_later(state.in_flight.clone(), request_id, handle, state.cancel_retention);
                return Err(ApiError::timed_out("revocation"));
            }
            outcome => {
                tracing::info!(request_id = %request_id, outcome = ?outcome, "Request deadline passed, awaiting revocation outcome");
                task.await
            }
        },
    };

    evict_later(state.in_flight.clone(), request_id.clone(), handle, state.cancel_retention);

    match result {
        Ok(Ok(receipt)) => Ok(Json(SubmittedResponse::new(receipt, request_id))),
        Ok(Err(e)) => Err(e.into()),
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Revocation task failed");
            Err(ApiError::internal("revocation"))
        }
    }
}

fn evict_later(
    in_flight: Arc<DashMap<String, CancelHandle>>,
    request_id: String,
    handle: CancelHandle,
    retention: Duration,
) {
    tokio::spawn(async move {
        tokio::time::sleep(retention).await;
        // A reused request id may now belong to a newer flow.
        in_flight.remove_if(&request_id, |_, current| current.same_flow(&handle));
    });
}

pub async fn cancel_revocation(
    State(state): State<AppState>,
    Path(request_id): Path<String>,
) -> Result<Json<CancelResponse>, ApiError> {
    let handle = state
        .in_flight
        .get(&request_id)
        .map(|entry| entry.value().clone())
        .ok_or_else(|| ApiError::not_found("cancel", format!("no revocation with request id '{request_id}'")))?;

    let outcome = handle.cancel();
    tracing::info!(request_id = %request_id, outcome = ?outcome, "Cancel requested");

    let response = match outcome {
        CancelOutcome::Cancelled => CancelResponse {
            status: "cancelled",
            bundle_hash: None,
            detail: "revocation stopped before relay submission",
        },
        CancelOutcome::SubmissionInFlight => CancelResponse {
            status: "submitted",
            bundle_hash: None,
            detail: "bundle is being submitted to the relay and cannot be cancelled",
        },
        CancelOutcome::AlreadySubmitted { bundle_id } => CancelResponse {
            status: "submitted",
            bundle_hash: Some(bundle_id),
            detail: "bundle already submitted to the relay and cannot be cancelled",
        },
        CancelOutcome::AlreadyFinished => {
            return Err(ApiError::conflict(
                "cancel",
                "revocation already ended without reaching the relay",
            ))
        }
    };
    Ok(Json(response))
}

pub async fn bundle_status(
    State(state): State<AppState>,
    body: Result<Json<BundleStatusRequest>, JsonRejection>,
) -> Result<Json<StatusResponse>, ApiError> {
    let Json(req) = body.map_err(bad_body)?;

    let bundle_hash = validate_hash(InputField::BundleHash, &req.bundle_hash).map_err(RevocationError::from)?;
    let tx_hashes = req
        .tx_hash
        .as_deref()
        .map(|raw| validate_hash(InputField::TxHash, raw))
        .transpose()
        .map_err(RevocationError::from)?
        .into_iter()
        .collect();

    let handle = BundleHandle {
        bundle_id: bundle_hash.to_string(),
        chain_key: req.chain,
        tx_hashes,
        target_block: req.target_block,
    };

    let status = match req.wait_secs.filter(|secs| *secs > 0) {
        Some(secs) => {
            let wait = Duration::from_secs(secs.min(state.status.max_wait_secs));
            state.orchestrator.wait_for_status(&handle, wait).await?
        }
        None => state.orchestrator.check_status(&handle).await?,
    };

    Ok(Json(StatusResponse {
        status,
        bundle_hash: handle.bundle_id,
        chain: handle.chain_key,
    }))
}
