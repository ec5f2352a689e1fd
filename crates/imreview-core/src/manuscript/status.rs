//! Manuscript status enumeration
//!
//! Review-governed statuses are the ones the decision engine may derive:
//! ```text
//! Submitted → UnderReview → {MinorRevisionRequested, MajorRevisionRequested,
//!                            UnderEditorialReview, Reviewed, Accepted, Rejected}
//! ```
//! Everything after acceptance (copy-editing, payment, production, publication)
//! belongs to the production pipeline and is never rewritten by derivation.

use serde::{Deserialize, Serialize};

use crate::error::ReviewError;

/// Authoritative status of a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManuscriptStatus {
    Submitted,
    UnderReview,
    MajorRevisionRequested,
    MinorRevisionRequested,
    UnderEditorialReview,
    Reviewed,
    Accepted,
    AcceptedAwaitingCopyEdit,
    InCopyEditing,
    CopyEditingComplete,
    Rejected,
    PaymentRequired,
    InProduction,
    Published,
}

impl ManuscriptStatus {
    /// All statuses in workflow order
    pub const ALL: [ManuscriptStatus; 14] = [
        ManuscriptStatus::Submitted,
        ManuscriptStatus::UnderReview,
        ManuscriptStatus::MajorRevisionRequested,
        ManuscriptStatus::MinorRevisionRequested,
        ManuscriptStatus::UnderEditorialReview,
        ManuscriptStatus::Reviewed,
        ManuscriptStatus::Accepted,
        ManuscriptStatus::AcceptedAwaitingCopyEdit,
        ManuscriptStatus::InCopyEditing,
        ManuscriptStatus::CopyEditingComplete,
        ManuscriptStatus::Rejected,
        ManuscriptStatus::PaymentRequired,
        ManuscriptStatus::InProduction,
        ManuscriptStatus::Published,
    ];

    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            ManuscriptStatus::Submitted => "submitted",
            ManuscriptStatus::UnderReview => "under-review",
            ManuscriptStatus::MajorRevisionRequested => "major-revision-requested",
            ManuscriptStatus::MinorRevisionRequested => "minor-revision-requested",
            ManuscriptStatus::UnderEditorialReview => "under-editorial-review",
            ManuscriptStatus::Reviewed => "reviewed",
            ManuscriptStatus::Accepted => "accepted",
            ManuscriptStatus::AcceptedAwaitingCopyEdit => "accepted-awaiting-copy-edit",
            ManuscriptStatus::InCopyEditing => "in-copy-editing",
            ManuscriptStatus::CopyEditingComplete => "copy-editing-complete",
            ManuscriptStatus::Rejected => "rejected",
            ManuscriptStatus::PaymentRequired => "payment-required",
            ManuscriptStatus::InProduction => "in-production",
            ManuscriptStatus::Published => "published",
        }
    }

    /// Whether the status may be derived from peer-review recommendations
    pub fn is_review_governed(&self) -> bool {
        matches!(
            self,
            ManuscriptStatus::Submitted
                | ManuscriptStatus::UnderReview
                | ManuscriptStatus::MajorRevisionRequested
                | ManuscriptStatus::MinorRevisionRequested
                | ManuscriptStatus::UnderEditorialReview
                | ManuscriptStatus::Reviewed
                | ManuscriptStatus::Accepted
                | ManuscriptStatus::Rejected
        )
    }

    /// Whether the manuscript is readable by anyone
    pub fn is_public(&self) -> bool {
        matches!(self, ManuscriptStatus::Published)
    }

    /// Get a human-readable description of the status
    pub fn description(&self) -> &'static str {
        match self {
            ManuscriptStatus::Submitted => "Submitted, awaiting reviewer assignment",
            ManuscriptStatus::UnderReview => "Out for peer review",
            ManuscriptStatus::MajorRevisionRequested => "Major revisions requested",
            ManuscriptStatus::MinorRevisionRequested => "Minor revisions requested",
            ManuscriptStatus::UnderEditorialReview => "Split recommendations, awaiting an editor",
            ManuscriptStatus::Reviewed => "Review complete",
            ManuscriptStatus::Accepted => "Accepted for publication",
            ManuscriptStatus::AcceptedAwaitingCopyEdit => "Accepted, waiting for a copy editor",
            ManuscriptStatus::InCopyEditing => "In copy editing",
            ManuscriptStatus::CopyEditingComplete => "Copy editing complete",
            ManuscriptStatus::Rejected => "Rejected",
            ManuscriptStatus::PaymentRequired => "Awaiting publication fee",
            ManuscriptStatus::InProduction => "In production",
            ManuscriptStatus::Published => "Published",
        }
    }
}

impl Default for ManuscriptStatus {
    fn default() -> Self {
        ManuscriptStatus::Submitted
    }
}

impl std::fmt::Display for ManuscriptStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ManuscriptStatus {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ManuscriptStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ReviewError::Validation(format!("unknown manuscript status: {}", s)))
    }
}
