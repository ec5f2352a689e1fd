//! Status derivation from peer-review recommendations
//!
//! The single policy shared by the review-submission path and the read path.
//! Rules are evaluated in order and the first match wins:
//!
//! 1. no counted reviews: keep the current status
//! 2. one review: map its recommendation directly
//! 3. two or more: accept majority, then reject majority, then any
//!    major-revision vote, then any minor-revision vote, else the split goes
//!    to an editor (`UnderEditorialReview`)
//!
//! A majority is `ceil(total / 2)` votes, so an even accept/reject split
//! resolves to `Accepted`.

use crate::manuscript::ManuscriptStatus;
use crate::tally::RecommendationTally;

/// Derive the next status from the current status and a tally.
///
/// Pure and order-independent: the tally carries only counts.
pub fn derive_status(current: ManuscriptStatus, tally: &RecommendationTally) -> ManuscriptStatus {
    match tally.total {
        0 => current,
        1 => single_recommendation(current, tally),
        _ => majority(tally),
    }
}

fn single_recommendation(current: ManuscriptStatus, tally: &RecommendationTally) -> ManuscriptStatus {
    match (
        tally.accept,
        tally.reject,
        tally.major_revision,
        tally.minor_revision,
    ) {
        (1, 0, 0, 0) => ManuscriptStatus::Accepted,
        (0, 1, 0, 0) => ManuscriptStatus::Rejected,
        (0, 0, 1, 0) => ManuscriptStatus::MajorRevisionRequested,
        (0, 0, 0, 1) => ManuscriptStatus::MinorRevisionRequested,
        _ => current,
    }
}

fn majority(tally: &RecommendationTally) -> ManuscriptStatus {
    let threshold = tally.majority_threshold();

    if tally.accept >= threshold {
        ManuscriptStatus::Accepted
    } else if tally.reject >= threshold {
        ManuscriptStatus::Rejected
    } else if tally.major_revision > 0 {
        ManuscriptStatus::MajorRevisionRequested
    } else if tally.minor_revision > 0 {
        ManuscriptStatus::MinorRevisionRequested
    } else {
        ManuscriptStatus::UnderEditorialReview
    }
}
