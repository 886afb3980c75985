//! Metrics collection and exposition.
//!
//! # Metrics
//! - `revoker_revocations_total` (counter): revocations by chain, outcome
//! - `revoker_revocation_duration_seconds` (histogram): end-to-end latency
//! - `revoker_stage_duration_seconds` (histogram): per-stage latency
//! - `revoker_relay_submissions_total` (counter): bundle submissions by chain, outcome
//! - `revoker_relay_submission_duration_seconds` (histogram)
//! - `revoker_bundle_status_total` (counter): status answers by chain, status
//! - `revoker_upstream_retries_total` (counter): retries by operation

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Duration;

/// Start the Prometheus scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_revocation(chain: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "revoker_revocations_total",
        "chain" => chain.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("revoker_revocation_duration_seconds", "chain" => chain.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_stage(stage: &'static str, elapsed: Duration) {
    metrics::histogram!("revoker_stage_duration_seconds", "stage" => stage).record(elapsed.as_secs_f64());
}

pub fn record_relay_submission(chain: &str, outcome: &str, elapsed: Duration) {
    metrics::counter!(
        "revoker_relay_submissions_total",
        "chain" => chain.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
    metrics::histogram!("revoker_relay_submission_duration_seconds", "chain" => chain.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_bundle_status(chain: &str, status: &'static str) {
    metrics::counter!(
        "revoker_bundle_status_total",
        "chain" => chain.to_string(),
        "status" => status
    )
    .increment(1);
}

pub fn record_retry(operation: &'static str) {
    metrics::counter!("revoker_upstream_retries_total", "operation" => operation).increment(1);
}
