//! Decision engine
//!
//! Orchestrates tally, derivation, and role resolution over an injected
//! document store. Every status write goes through one conditional commit
//! cycle:
//!
//! ```text
//! load manuscript + completed reviews → tally → derive → commit if changed
//!        ↑                                                    │
//!        └────────────── version conflict: retry ─────────────┘
//! ```
//!
//! Write-path triggers (review completion, explicit recompute, editorial
//! override, reviewer assignment) also serialize per manuscript in-process.
//! The read path only relies on the version token.

mod decision;
mod editorial;
mod locks;
mod reconcile;

pub use decision::{ReviewCompletion, ReviewSubmission};
pub use locks::ManuscriptLocks;
pub use reconcile::ManuscriptView;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::access::{self, Capabilities};
use crate::actor::{Actor, ActorDirectory, ActorId, InMemoryActorDirectory};
use crate::config::EngineConfig;
use crate::error::{Result, ReviewError, StoreError};
use crate::handoff::{AcceptanceHandoff, HandoffReport, NoopHandoff};
use crate::manuscript::{Manuscript, ManuscriptId, ManuscriptStatus};
use crate::review::Review;
use crate::store::{DocumentStore, ReviewFilter};
use crate::tally::RecommendationTally;
use crate::timeline::StatusTransition;

/// Result of one derive-and-commit cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    /// Manuscript as stored after the cycle
    pub manuscript: Manuscript,
    pub tally: RecommendationTally,
    /// Present when the cycle committed a status change
    pub transition: Option<StatusTransition>,
    /// Present when the change moved the manuscript into `Accepted`
    pub handoff: Option<HandoffReport>,
}

impl DecisionOutcome {
    pub fn status_changed(&self) -> bool {
        self.transition.is_some()
    }

    pub fn status(&self) -> ManuscriptStatus {
        self.manuscript.status
    }
}

/// The editorial decision engine
pub struct DecisionEngine {
    store: Arc<dyn DocumentStore>,
    directory: Arc<dyn ActorDirectory>,
    handoff: Arc<dyn AcceptanceHandoff>,
    config: EngineConfig,
    locks: ManuscriptLocks,
}

impl DecisionEngine {
    /// Create an engine over `store` with default configuration, an empty
    /// actor directory, and a no-op acceptance hand-off
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            directory: Arc::new(InMemoryActorDirectory::new()),
            handoff: Arc::new(NoopHandoff),
            config: EngineConfig::default(),
            locks: ManuscriptLocks::new(),
        }
    }

    /// Use the given acceptance hand-off
    pub fn with_handoff(mut self, handoff: Arc<dyn AcceptanceHandoff>) -> Self {
        self.handoff = handoff;
        self
    }

    /// Use the given actor directory
    pub fn with_directory(mut self, directory: Arc<dyn ActorDirectory>) -> Self {
        self.directory = directory;
        self
    }

    /// Use the given configuration, after validating it
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    // ==================== Shared helpers ====================

    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Manuscript> {
        self.store
            .load_manuscript(id)?
            .ok_or_else(|| ReviewError::NotFound(format!("manuscript {}", id)))
    }

    /// Completed reviews in completion order
    fn completed_reviews(&self, id: &ManuscriptId) -> Result<Vec<Review>> {
        let mut reviews = self.store.load_reviews(id, ReviewFilter::COMPLETED)?;
        reviews.sort_by(|a, b| {
            a.completed_date
                .cmp(&b.completed_date)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(reviews)
    }

    /// Capability set of `actor` on `manuscript`, looking up review assignments
    fn capabilities(&self, actor: &Actor, manuscript: &Manuscript) -> Result<Capabilities> {
        let has_assignment = self
            .store
            .load_reviews(&manuscript.id, ReviewFilter::All)?
            .iter()
            .any(|review| review.reviewer_id == actor.id);
        Ok(access::resolve(actor, manuscript, has_assignment))
    }

    /// Resolve an actor identity through the directory.
    ///
    /// Unknown identities act with no roles.
    fn lookup_actor(&self, id: &ActorId) -> Result<Actor> {
        Ok(self
            .directory
            .lookup(id)?
            .unwrap_or_else(|| Actor::new(id.clone(), Vec::new())))
    }

    /// The error a read path reports when view access is missing
    fn read_denied(&self, id: &ManuscriptId, actor: &Actor) -> ReviewError {
        if self.config.access.conceal_forbidden_reads {
            ReviewError::NotFound(format!("manuscript {}", id))
        } else {
            ReviewError::forbidden(&actor.id, format!("view manuscript {}", id))
        }
    }

    /// Run `op` until it stops failing with a version conflict or the attempt
    /// budget is spent
    fn retry_on_conflict<T>(&self, id: &ManuscriptId, mut op: impl FnMut() -> Result<T>) -> Result<T> {
        let max_attempts = self.config.commit.max_attempts;
        for attempt in 1..=max_attempts {
            match op() {
                Err(ReviewError::Store(StoreError::Conflict { expected, actual })) => {
                    tracing::warn!(
                        manuscript = %id,
                        attempt,
                        expected,
                        actual,
                        "status commit lost to a concurrent writer; retrying"
                    );
                }
                other => return other,
            }
        }
        Err(ReviewError::ConcurrentModification {
            manuscript: id.to_string(),
            attempts: max_attempts,
        })
    }

    /// Fire the acceptance hand-off for a transition into `Accepted`.
    ///
    /// Failures are logged and reported, never propagated.
    fn hand_off(
        &self,
        previous: ManuscriptStatus,
        manuscript: &Manuscript,
        actor: Option<&ActorId>,
    ) -> Option<HandoffReport> {
        if manuscript.status != ManuscriptStatus::Accepted || previous == ManuscriptStatus::Accepted {
            return None;
        }

        let report = HandoffReport::from(self.handoff.on_manuscript_accepted(manuscript, actor));
        match &report {
            HandoffReport::Failed(reason) => tracing::warn!(
                manuscript = %manuscript.id,
                reason = %reason,
                "acceptance hand-off failed; status change stands"
            ),
            HandoffReport::Delivered(outcome) => tracing::debug!(
                manuscript = %manuscript.id,
                ?outcome,
                "acceptance hand-off delivered"
            ),
        }
        Some(report)
    }
}
