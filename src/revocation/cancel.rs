//! Cooperative cancellation of an in-flight revocation.
//!
//! A revocation can be cancelled until it starts talking to the relay.
//! From then on the bundle may already be with block builders, so a cancel
//! request only reports where the flow is.

use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;

use crate::error::{Classify, ErrorKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("revocation cancelled before relay submission")]
pub struct Cancelled;

impl Classify for Cancelled {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Cancelled
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Running,
    Cancelled,
    Submitting,
    Submitted(String),
    Finished,
}

/// What a cancel request achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelOutcome {
    Cancelled,
    /// The bundle is on its way to the relay.
    SubmissionInFlight,
    AlreadySubmitted { bundle_id: String },
    /// The flow ended without reaching the relay.
    AlreadyFinished,
}

/// Requests cancellation. Held by whoever may want to stop the flow.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    phase: Arc<watch::Sender<Phase>>,
}

/// Observed by the flow at its suspension points.
#[derive(Debug, Clone)]
pub struct CancelToken {
    phase: Arc<watch::Sender<Phase>>,
    rx: watch::Receiver<Phase>,
}

pub fn cancel_pair() -> (CancelHandle, CancelToken) {
    let (tx, rx) = watch::channel(Phase::Running);
    let phase = Arc::new(tx);
    (
        CancelHandle {
            phase: phase.clone(),
        },
        CancelToken { phase, rx },
    )
}

impl CancelHandle {
    pub fn cancel(&self) -> CancelOutcome {
        let mut outcome = CancelOutcome::Cancelled;
        self.phase.send_if_modified(|phase| match phase {
            Phase::Running => {
                *phase = Phase::Cancelled;
                true
            }
            Phase::Cancelled => false,
            Phase::Submitting => {
                outcome = CancelOutcome::SubmissionInFlight;
                false
            }
            Phase::Submitted(bundle_id) => {
                outcome = CancelOutcome::AlreadySubmitted {
                    bundle_id: bundle_id.clone(),
                };
                false
            }
            Phase::Finished => {
                outcome = CancelOutcome::AlreadyFinished;
                false
            }
        });
        outcome
    }

    /// Whether both handles control the same flow.
    pub fn same_flow(&self, other: &CancelHandle) -> bool {
        Arc::ptr_eq(&self.phase, &other.phase)
    }
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn detached() -> Self {
        cancel_pair().1
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(*self.rx.borrow(), Phase::Cancelled)
    }

    pub fn checkpoint(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Resolves once cancellation is requested.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|phase| matches!(phase, Phase::Cancelled)).await.is_err() {
            // Sender gone: cancellation can no longer happen.
            std::future::pending::<()>().await;
        }
    }

    /// Run `fut` unless cancellation arrives first.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, Cancelled> {
        self.checkpoint()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(Cancelled),
            out = fut => Ok(out),
        }
    }

    /// Point of no return. Fails if cancellation won the race.
    pub fn begin_submission(&self) -> Result<(), Cancelled> {
        let mut result = Ok(());
        self.phase.send_if_modified(|phase| match phase {
            Phase::Running => {
                *phase = Phase::Submitting;
                true
            }
            Phase::Cancelled => {
                result = Err(Cancelled);
                false
            }
            _ => false,
        });
        result
    }

    pub fn mark_submitted(&self, bundle_id: &str) {
        self.phase.send_replace(Phase::Submitted(bundle_id.to_string()));
    }

    /// Flow ended without a bundle id. A cancelled flow stays cancelled.
    pub fn finish(&self) {
        self.phase.send_if_modified(|phase| match phase {
            Phase::Running | Phase::Submitting => {
                *phase = Phase::Finished;
                true
            }
            _ => false,
        });
    }
}
