//! Review-completion path and the shared derive-and-commit cycle

use serde::{Deserialize, Serialize};

use super::{DecisionEngine, DecisionOutcome};
use crate::actor::ActorId;
use crate::derivation::derive_status;
use crate::error::{Result, ReviewError};
use crate::manuscript::{Manuscript, ManuscriptId, ManuscriptStatus};
use crate::review::{Recommendation, Review, ReviewId, ReviewRatings};
use crate::store::StatusCommit;
use crate::tally::RecommendationTally;
use crate::timeline::{StatusTransition, TimelineEntry, TimelineEvent};

/// What asked for a derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    ReviewCompleted,
    Read,
    Recompute,
}

impl Trigger {
    fn event(self) -> TimelineEvent {
        match self {
            Trigger::ReviewCompleted => TimelineEvent::StatusDerived,
            Trigger::Read => TimelineEvent::StatusReconciled,
            Trigger::Recompute => TimelineEvent::StatusRecomputed,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Trigger::ReviewCompleted => "review-completed",
            Trigger::Read => "read",
            Trigger::Recompute => "recompute",
        }
    }
}

/// A reviewer's final submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSubmission {
    /// Who is submitting; must be the assigned reviewer
    pub reviewer: ActorId,
    pub recommendation: Recommendation,
    pub ratings: ReviewRatings,
    pub comments: Option<String>,
}

impl ReviewSubmission {
    pub fn new(reviewer: ActorId, recommendation: Recommendation) -> Self {
        Self {
            reviewer,
            recommendation,
            ratings: ReviewRatings::default(),
            comments: None,
        }
    }

    pub fn with_ratings(mut self, ratings: ReviewRatings) -> Self {
        self.ratings = ratings;
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = Some(comments.into());
        self
    }
}

/// Result of recording a review.
///
/// The review save is the operation's success; the status decision that
/// follows is informational and may have failed independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewCompletion {
    pub review: Review,
    pub status_changed: bool,
    /// Manuscript status after the decision, if the decision ran
    pub new_status: Option<ManuscriptStatus>,
    pub decision: Option<DecisionOutcome>,
    /// Why the decision did not complete; the read path will catch up
    pub decision_error: Option<String>,
}

impl ReviewCompletion {
    fn new(review: Review, decision: Result<DecisionOutcome>) -> Self {
        match decision {
            Ok(outcome) => Self {
                review,
                status_changed: outcome.status_changed(),
                new_status: Some(outcome.status()),
                decision: Some(outcome),
                decision_error: None,
            },
            Err(err) => {
                tracing::warn!(
                    review = %review.id,
                    manuscript = %review.manuscript_id,
                    error = %err,
                    "review saved but status decision failed"
                );
                Self {
                    review,
                    status_changed: false,
                    new_status: None,
                    decision: None,
                    decision_error: Some(err.to_string()),
                }
            }
        }
    }
}

impl DecisionEngine {
    /// Re-derive a manuscript's status after its set of completed reviews
    /// changed, committing and auditing the result if it differs.
    pub fn on_review_completed(
        &self,
        manuscript_id: &ManuscriptId,
        actor: Option<&ActorId>,
    ) -> Result<DecisionOutcome> {
        self.locks.with_lock(manuscript_id, || {
            self.derive_and_commit(manuscript_id, Trigger::ReviewCompleted, actor)
        })
    }

    /// Complete a review and run the decision for its manuscript
    pub fn record_review_completion(
        &self,
        review_id: &ReviewId,
        submission: ReviewSubmission,
    ) -> Result<ReviewCompletion> {
        let manuscript_id = self
            .store
            .load_review(review_id)?
            .ok_or_else(|| ReviewError::NotFound(format!("review {}", review_id)))?
            .manuscript_id;

        self.locks.with_lock(&manuscript_id, || {
            let mut review = self
                .store
                .load_review(review_id)?
                .ok_or_else(|| ReviewError::NotFound(format!("review {}", review_id)))?;

            if review.reviewer_id != submission.reviewer {
                return Err(ReviewError::forbidden(
                    &submission.reviewer,
                    format!("submit review {}", review_id),
                ));
            }

            review.complete(
                submission.recommendation,
                submission.ratings,
                submission.comments,
            )?;
            self.store.save_review(&review)?;
            tracing::info!(
                review = %review.id,
                manuscript = %manuscript_id,
                recommendation = %submission.recommendation,
                "review completed"
            );

            let decision = self.derive_and_commit(
                &manuscript_id,
                Trigger::ReviewCompleted,
                Some(&review.reviewer_id),
            );
            Ok(ReviewCompletion::new(review, decision))
        })
    }

    pub(crate) fn derive_and_commit(
        &self,
        id: &ManuscriptId,
        trigger: Trigger,
        actor: Option<&ActorId>,
    ) -> Result<DecisionOutcome> {
        self.retry_on_conflict(id, || self.derive_once(id, trigger, actor))
    }

    fn derive_once(
        &self,
        id: &ManuscriptId,
        trigger: Trigger,
        actor: Option<&ActorId>,
    ) -> Result<DecisionOutcome> {
        let manuscript = self.load_manuscript(id)?;
        let reviews = self.completed_reviews(id)?;
        let tally = RecommendationTally::from_reviews(&reviews);

        if !manuscript.status.is_review_governed() {
            tracing::debug!(
                manuscript = %id,
                status = %manuscript.status,
                "status is past review; not derived"
            );
            return Ok(unchanged(manuscript, tally));
        }

        if trigger != Trigger::Recompute {
            if let Some(pin) = &manuscript.status_override {
                if pin.completed_reviews == reviews.len() {
                    tracing::debug!(
                        manuscript = %id,
                        status = %manuscript.status,
                        set_by = %pin.set_by,
                        trigger = trigger.label(),
                        "editorial override in force and no review completed since; status left alone"
                    );
                    return Ok(unchanged(manuscript, tally));
                }
            }
        }

        let previous = manuscript.status;
        let derived = derive_status(previous, &tally);
        if derived == previous && trigger == Trigger::Recompute {
            if let Some(pin) = &manuscript.status_override {
                let entry = TimelineEntry::new(
                    *id,
                    trigger.event(),
                    format!(
                        "Editorial override by {} released; derived status is still {}",
                        pin.set_by, previous
                    ),
                )
                .with_actor(actor.cloned())
                .with_metadata("trigger", trigger.label());
                let updated = self.store.commit_status(StatusCommit {
                    manuscript_id: *id,
                    expected_version: manuscript.version,
                    status: previous,
                    status_override: None,
                    entry,
                })?;
                tracing::info!(
                    manuscript = %id,
                    status = %previous,
                    version = updated.version,
                    "editorial override released by recompute"
                );
                return Ok(unchanged(updated, tally));
            }
        }
        if derived == previous {
            tracing::debug!(
                manuscript = %id,
                status = %previous,
                reviews = tally.total,
                trigger = trigger.label(),
                "derived status matches stored status"
            );
            return Ok(unchanged(manuscript, tally));
        }

        let transition = StatusTransition {
            from: previous,
            to: derived,
            review_count: tally.total,
            recommendations: counted_recommendations(&reviews),
        };

        let mut entry = TimelineEntry::new(
            *id,
            trigger.event(),
            format!(
                "Status changed from {} to {} after {} completed review(s)",
                previous, derived, tally.total
            ),
        )
        .with_transition(transition.clone())
        .with_metadata("trigger", trigger.label());
        entry = match trigger {
            Trigger::Read => match actor {
                Some(reader) => entry.with_metadata("read_by", reader.as_str()),
                None => entry,
            },
            _ => entry.with_actor(actor.cloned()),
        };
        if tally.has_anomalies() {
            let ids: Vec<String> = tally.anomalies.iter().map(ToString::to_string).collect();
            entry = entry.with_metadata("excluded_reviews", ids.join(","));
        }

        let updated = self.store.commit_status(StatusCommit {
            manuscript_id: *id,
            expected_version: manuscript.version,
            status: derived,
            status_override: None,
            entry,
        })?;

        tracing::info!(
            manuscript = %id,
            from = %previous,
            to = %derived,
            reviews = tally.total,
            trigger = trigger.label(),
            version = updated.version,
            "manuscript status committed"
        );

        let handoff_actor = if trigger == Trigger::Read { None } else { actor };
        let handoff = self.hand_off(previous, &updated, handoff_actor);

        Ok(DecisionOutcome {
            manuscript: updated,
            tally,
            transition: Some(transition),
            handoff,
        })
    }
}

fn unchanged(manuscript: Manuscript, tally: RecommendationTally) -> DecisionOutcome {
    DecisionOutcome {
        manuscript,
        tally,
        transition: None,
        handoff: None,
    }
}

/// Recognized recommendations in review order
pub(crate) fn counted_recommendations(reviews: &[Review]) -> Vec<Recommendation> {
    reviews
        .iter()
        .filter_map(|review| review.recommendation)
        .filter(Recommendation::is_recognized)
        .collect()
}
