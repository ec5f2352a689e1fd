//! Recommendation tally over completed reviews

use serde::{Deserialize, Serialize};

use crate::review::{Recommendation, Review, ReviewId};

/// Counts of completed-review recommendations for one manuscript
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationTally {
    pub accept: usize,
    pub reject: usize,
    pub major_revision: usize,
    pub minor_revision: usize,
    /// Completed reviews carrying a recognized recommendation
    pub total: usize,
    /// Completed reviews with a missing or unrecognized recommendation
    pub anomalies: Vec<ReviewId>,
}

impl RecommendationTally {
    /// Tally the completed reviews in `reviews`; every other review is ignored.
    ///
    /// Completed reviews without a recognized recommendation are logged and
    /// listed in `anomalies` but never counted.
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a Review>) -> Self {
        let mut tally = Self::default();

        for review in reviews.into_iter().filter(|r| r.is_completed()) {
            match review.recommendation {
                Some(Recommendation::Accept) => tally.accept += 1,
                Some(Recommendation::Reject) => tally.reject += 1,
                Some(Recommendation::MajorRevision) => tally.major_revision += 1,
                Some(Recommendation::MinorRevision) => tally.minor_revision += 1,
                Some(Recommendation::Unrecognized) | None => {
                    tracing::warn!(
                        review = %review.id,
                        manuscript = %review.manuscript_id,
                        recommendation = ?review.recommendation,
                        "completed review has no recognized recommendation; excluded from tally"
                    );
                    tally.anomalies.push(review.id);
                    continue;
                }
            }
            tally.total += 1;
        }

        tally.anomalies.sort();
        tally
    }

    /// Count for a single recommendation category
    pub fn count(&self, recommendation: Recommendation) -> usize {
        match recommendation {
            Recommendation::Accept => self.accept,
            Recommendation::Reject => self.reject,
            Recommendation::MajorRevision => self.major_revision,
            Recommendation::MinorRevision => self.minor_revision,
            Recommendation::Unrecognized => self.anomalies.len(),
        }
    }

    /// Votes needed for a majority: `ceil(total / 2)`
    pub fn majority_threshold(&self) -> usize {
        self.total.div_ceil(2)
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    pub fn has_anomalies(&self) -> bool {
        !self.anomalies.is_empty()
    }
}
