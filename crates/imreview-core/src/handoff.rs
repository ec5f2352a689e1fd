//! Acceptance hand-off to downstream workflows
//!
//! Invoked once per transition into `Accepted`. Delivery is best-effort: the
//! status commit has already happened and is never undone by a failed
//! hand-off. Implementations own their own retry and de-duplication.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::actor::ActorId;
use crate::manuscript::Manuscript;

/// Failure reported by a hand-off collaborator
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    /// Downstream delivery failed (notification, fee setup, ...)
    #[error("Delivery failed: {0}")]
    Delivery(String),

    /// Collaborator is not reachable
    #[error("Hand-off unavailable: {0}")]
    Unavailable(String),
}

/// What the collaborator did with the hand-off
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandoffOutcome {
    /// Downstream effects were started
    Dispatched,
    /// Collaborator had already processed this manuscript
    AlreadyHandled,
}

/// Receives manuscripts that were newly accepted
pub trait AcceptanceHandoff: Send + Sync {
    fn on_manuscript_accepted(
        &self,
        manuscript: &Manuscript,
        triggering_actor: Option<&ActorId>,
    ) -> Result<HandoffOutcome, HandoffError>;
}

/// Hand-off that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHandoff;

impl AcceptanceHandoff for NoopHandoff {
    fn on_manuscript_accepted(
        &self,
        _manuscript: &Manuscript,
        _triggering_actor: Option<&ActorId>,
    ) -> Result<HandoffOutcome, HandoffError> {
        Ok(HandoffOutcome::Dispatched)
    }
}

/// How a hand-off attempt went, reported alongside a committed transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HandoffReport {
    Delivered(HandoffOutcome),
    /// Status stayed committed; the message is for logs and callers only
    Failed(String),
}

impl HandoffReport {
    pub fn is_failure(&self) -> bool {
        matches!(self, HandoffReport::Failed(_))
    }
}

impl From<Result<HandoffOutcome, HandoffError>> for HandoffReport {
    fn from(result: Result<HandoffOutcome, HandoffError>) -> Self {
        match result {
            Ok(outcome) => HandoffReport::Delivered(outcome),
            Err(err) => HandoffReport::Failed(err.to_string()),
        }
    }
}
