//! Read path: self-healing status reconciliation and access-checked reads

use serde::{Deserialize, Serialize};

use super::decision::Trigger;
use super::{DecisionEngine, DecisionOutcome};
use crate::access::Capabilities;
use crate::actor::{Actor, ActorId};
use crate::error::Result;
use crate::manuscript::{Manuscript, ManuscriptId};
use crate::timeline::{StatusTransition, TimelineEntry};

/// A manuscript as returned to a reader
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManuscriptView {
    pub manuscript: Manuscript,
    /// What the reader may do with it
    pub capabilities: Capabilities,
    /// Correction committed while serving this read, if any
    pub reconciled: Option<StatusTransition>,
}

impl DecisionEngine {
    /// Re-derive and, if the stored status has drifted, correct it.
    ///
    /// Does not take the per-manuscript write lock; a racing writer is
    /// detected through the version token and the cycle is retried.
    pub fn on_manuscript_read(&self, manuscript_id: &ManuscriptId, actor: &Actor) -> Result<DecisionOutcome> {
        let outcome = self.derive_and_commit(manuscript_id, Trigger::Read, Some(&actor.id))?;
        if let Some(transition) = &outcome.transition {
            tracing::warn!(
                manuscript = %manuscript_id,
                from = %transition.from,
                to = %transition.to,
                reader = %actor.id,
                "stored status had drifted; corrected on read"
            );
        }
        Ok(outcome)
    }

    /// Fetch a manuscript for `actor`, reconciling its status first when
    /// configured to.
    ///
    /// Without view access the caller gets `NotFound` or `Forbidden`,
    /// depending on `access.conceal_forbidden_reads`.
    pub fn get_manuscript_for_actor(&self, manuscript_id: &ManuscriptId, actor: &Actor) -> Result<ManuscriptView> {
        let (manuscript, reconciled) = if self.config.reconcile.on_read {
            let outcome = self.on_manuscript_read(manuscript_id, actor)?;
            (outcome.manuscript, outcome.transition)
        } else {
            (self.load_manuscript(manuscript_id)?, None)
        };

        let capabilities = self.capabilities(actor, &manuscript)?;
        if !capabilities.can_view() {
            tracing::debug!(
                manuscript = %manuscript_id,
                actor = %actor.id,
                role = %actor.active_role(),
                "read denied"
            );
            return Err(self.read_denied(manuscript_id, actor));
        }

        Ok(ManuscriptView {
            manuscript,
            capabilities,
            reconciled,
        })
    }

    /// As [`get_manuscript_for_actor`](Self::get_manuscript_for_actor),
    /// resolving the actor through the directory
    pub fn get_manuscript_for_actor_id(
        &self,
        manuscript_id: &ManuscriptId,
        actor_id: &ActorId,
    ) -> Result<ManuscriptView> {
        let actor = self.lookup_actor(actor_id)?;
        self.get_manuscript_for_actor(manuscript_id, &actor)
    }

    /// Audit timeline of a manuscript, oldest first
    pub fn timeline(&self, manuscript_id: &ManuscriptId, actor: &Actor) -> Result<Vec<TimelineEntry>> {
        let manuscript = self.load_manuscript(manuscript_id)?;
        if !self.capabilities(actor, &manuscript)?.can_view() {
            return Err(self.read_denied(manuscript_id, actor));
        }
        Ok(self.store.load_timeline(manuscript_id)?)
    }
}
