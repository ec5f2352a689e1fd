//! Editorial operations: reviewer assignment, overrides, explicit recompute,
//! and deletion

use chrono::{DateTime, Utc};

use super::decision::{counted_recommendations, Trigger};
use super::{DecisionEngine, DecisionOutcome};
use crate::access::Capabilities;
use crate::actor::{Actor, ActorId};
use crate::error::{Result, ReviewError};
use crate::manuscript::{ManuscriptId, ManuscriptStatus, StatusOverride};
use crate::review::{Review, ReviewStatus};
use crate::store::{ReviewFilter, StatusCommit};
use crate::tally::RecommendationTally;
use crate::timeline::{StatusTransition, TimelineEntry, TimelineEvent};

impl DecisionEngine {
    /// Assign `reviewer` to a manuscript.
    ///
    /// The first assignment on a submitted manuscript also moves it into
    /// review, recorded by the same timeline entry.
    pub fn assign_reviewer(
        &self,
        manuscript_id: &ManuscriptId,
        actor: &Actor,
        reviewer: ActorId,
        due_date: Option<DateTime<Utc>>,
    ) -> Result<Review> {
        self.locks.with_lock(manuscript_id, || {
            let manuscript = self.load_manuscript(manuscript_id)?;
            self.capabilities(actor, &manuscript)?
                .require(Capabilities::ASSIGN, actor, "assign reviewers")?;

            if !manuscript.status.is_review_governed() {
                return Err(ReviewError::InvalidOperation(format!(
                    "manuscript {} is {} and no longer takes reviewers",
                    manuscript_id, manuscript.status
                )));
            }
            if manuscript.is_submitted_by(&reviewer) {
                return Err(ReviewError::Validation(format!(
                    "{} cannot review their own manuscript",
                    reviewer
                )));
            }
            let existing = self.store.load_reviews(manuscript_id, ReviewFilter::All)?;
            if existing
                .iter()
                .any(|r| r.reviewer_id == reviewer && r.status != ReviewStatus::Declined)
            {
                return Err(ReviewError::InvalidOperation(format!(
                    "{} is already reviewing manuscript {}",
                    reviewer, manuscript_id
                )));
            }

            let mut review = Review::new(*manuscript_id, reviewer.clone());
            if let Some(due) = due_date {
                review = review.with_due_date(due);
            }

            let entry = TimelineEntry::new(
                *manuscript_id,
                TimelineEvent::ReviewerAssigned,
                format!("Reviewer {} assigned", reviewer),
            )
            .with_actor(Some(actor.id.clone()))
            .with_metadata("reviewer", reviewer.as_str())
            .with_metadata("review", review.id.to_string());

            self.retry_on_conflict(manuscript_id, || {
                let current = self.load_manuscript(manuscript_id)?;
                if current.status != ManuscriptStatus::Submitted {
                    self.store.append_timeline(entry.clone())?;
                    return Ok(());
                }

                let completed = self.completed_reviews(manuscript_id)?;
                let transition = StatusTransition {
                    from: ManuscriptStatus::Submitted,
                    to: ManuscriptStatus::UnderReview,
                    review_count: RecommendationTally::from_reviews(&completed).total,
                    recommendations: counted_recommendations(&completed),
                };
                self.store.commit_status(StatusCommit {
                    manuscript_id: *manuscript_id,
                    expected_version: current.version,
                    status: ManuscriptStatus::UnderReview,
                    status_override: current.status_override.clone(),
                    entry: entry.clone().with_transition(transition),
                })?;
                tracing::info!(manuscript = %manuscript_id, "manuscript moved into review");
                Ok(())
            })?;
            // Stored only once the assignment is on the timeline, so a failed
            // commit leaves nothing behind to block a retry
            self.store.insert_review(&review)?;

            tracing::info!(
                manuscript = %manuscript_id,
                reviewer = %reviewer,
                review = %review.id,
                assigned_by = %actor.id,
                "reviewer assigned"
            );
            Ok(review)
        })
    }

    /// Set a manuscript's status by editorial decision.
    ///
    /// The status is pinned against the current completed-review count: reads
    /// and repeated completion events leave it alone until another review
    /// completes or a recompute is asked for.
    pub fn apply_editorial_override(
        &self,
        manuscript_id: &ManuscriptId,
        actor: &Actor,
        status: ManuscriptStatus,
        reason: &str,
    ) -> Result<DecisionOutcome> {
        self.locks.with_lock(manuscript_id, || {
            self.retry_on_conflict(manuscript_id, || {
                let manuscript = self.load_manuscript(manuscript_id)?;
                self.capabilities(actor, &manuscript)?.require(
                    Capabilities::MUTATE_STATUS,
                    actor,
                    "override manuscript status",
                )?;

                let reviews = self.completed_reviews(manuscript_id)?;
                let tally = RecommendationTally::from_reviews(&reviews);
                let previous = manuscript.status;
                let transition = StatusTransition {
                    from: previous,
                    to: status,
                    review_count: tally.total,
                    recommendations: counted_recommendations(&reviews),
                };
                let pin = StatusOverride {
                    status,
                    completed_reviews: reviews.len(),
                    set_by: actor.id.clone(),
                    set_at: Utc::now(),
                };
                let entry = TimelineEntry::new(
                    *manuscript_id,
                    TimelineEvent::EditorialOverride,
                    format!("Status set from {} to {} by {}: {}", previous, status, actor.id, reason),
                )
                .with_actor(Some(actor.id.clone()))
                .with_transition(transition.clone())
                .with_metadata("reason", reason);

                let updated = self.store.commit_status(StatusCommit {
                    manuscript_id: *manuscript_id,
                    expected_version: manuscript.version,
                    status,
                    status_override: Some(pin),
                    entry,
                })?;
                tracing::info!(
                    manuscript = %manuscript_id,
                    from = %previous,
                    to = %status,
                    editor = %actor.id,
                    "editorial override applied"
                );

                let handoff = self.hand_off(previous, &updated, Some(&actor.id));
                Ok(DecisionOutcome {
                    manuscript: updated,
                    tally,
                    transition: Some(transition),
                    handoff,
                })
            })
        })
    }

    /// Re-derive on request, discarding any editorial override pin even when
    /// the derived status matches the stored one
    pub fn recompute(&self, manuscript_id: &ManuscriptId, actor: &Actor) -> Result<DecisionOutcome> {
        self.locks.with_lock(manuscript_id, || {
            let manuscript = self.load_manuscript(manuscript_id)?;
            self.capabilities(actor, &manuscript)?.require(
                Capabilities::MUTATE_STATUS,
                actor,
                "recompute manuscript status",
            )?;
            self.derive_and_commit(manuscript_id, Trigger::Recompute, Some(&actor.id))
        })
    }

    /// Delete a manuscript together with its reviews and timeline
    pub fn delete_manuscript(&self, manuscript_id: &ManuscriptId, actor: &Actor) -> Result<()> {
        self.locks.with_lock(manuscript_id, || {
            let manuscript = self.load_manuscript(manuscript_id)?;
            self.capabilities(actor, &manuscript)?
                .require(Capabilities::DELETE, actor, "delete manuscripts")?;
            self.store.delete_manuscript(manuscript_id)?;
            tracing::info!(manuscript = %manuscript_id, deleted_by = %actor.id, "manuscript deleted");
            Ok(())
        })
    }
}
