//! Peer reviews and their lifecycle
//!
//! ```text
//! Pending → InProgress → Completed
//!    ↓          ↓
//!  Declined   Declined
//! ```
//! A review is completed exactly once; its recommendation is fixed thereafter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::ActorId;
use crate::error::{Result, ReviewError};
use crate::manuscript::ManuscriptId;

/// Unique identifier for a review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

impl ReviewId {
    /// Create a new random review ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a review ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ReviewError::Validation(format!("invalid review id: {}", s)))
    }
}

impl Default for ReviewId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Progress of a single review assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewStatus {
    Pending,
    InProgress,
    Completed,
    Declined,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Pending => "pending",
            ReviewStatus::InProgress => "in-progress",
            ReviewStatus::Completed => "completed",
            ReviewStatus::Declined => "declined",
        }
    }

    /// Whether the reviewer can still submit
    pub fn is_open(&self) -> bool {
        matches!(self, ReviewStatus::Pending | ReviewStatus::InProgress)
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ReviewStatus {
    type Err = ReviewError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ReviewStatus::Pending),
            "in-progress" => Ok(ReviewStatus::InProgress),
            "completed" => Ok(ReviewStatus::Completed),
            "declined" => Ok(ReviewStatus::Declined),
            other => Err(ReviewError::Validation(format!("unknown review status: {}", other))),
        }
    }
}

/// A reviewer's final recommendation.
///
/// Stored values the engine does not recognise deserialize to `Unrecognized`
/// so a corrupt record can be reported instead of failing the load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Recommendation {
    Accept,
    MinorRevision,
    MajorRevision,
    Reject,
    #[serde(other)]
    Unrecognized,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::Accept => "accept",
            Recommendation::MinorRevision => "minor-revision",
            Recommendation::MajorRevision => "major-revision",
            Recommendation::Reject => "reject",
            Recommendation::Unrecognized => "unrecognized",
        }
    }

    /// Parse a stored value, mapping anything unknown to `Unrecognized`
    pub fn from_stored(s: &str) -> Self {
        match s {
            "accept" => Recommendation::Accept,
            "minor-revision" => Recommendation::MinorRevision,
            "major-revision" => Recommendation::MajorRevision,
            "reject" => Recommendation::Reject,
            _ => Recommendation::Unrecognized,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Recommendation::Unrecognized)
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reviewer scores, each on a 1-5 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReviewRatings {
    pub originality: Option<u8>,
    pub methodology: Option<u8>,
    pub clarity: Option<u8>,
    pub significance: Option<u8>,
}

impl ReviewRatings {
    fn scores(&self) -> [(&'static str, Option<u8>); 4] {
        [
            ("originality", self.originality),
            ("methodology", self.methodology),
            ("clarity", self.clarity),
            ("significance", self.significance),
        ]
    }

    /// Check every given score is within 1-5
    pub fn validate(&self) -> Result<()> {
        for (name, score) in self.scores() {
            if let Some(score) = score {
                if !(1..=5).contains(&score) {
                    return Err(ReviewError::Validation(format!(
                        "{} rating must be between 1 and 5, got {}",
                        name, score
                    )));
                }
            }
        }
        Ok(())
    }

    /// Mean of the given scores
    pub fn average(&self) -> Option<f64> {
        let given: Vec<u8> = self.scores().iter().filter_map(|(_, s)| *s).collect();
        if given.is_empty() {
            return None;
        }
        Some(given.iter().map(|&s| f64::from(s)).sum::<f64>() / given.len() as f64)
    }
}

/// A peer review of one manuscript by one reviewer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub manuscript_id: ManuscriptId,
    pub reviewer_id: ActorId,
    pub status: ReviewStatus,
    /// Present once completed
    pub recommendation: Option<Recommendation>,
    pub ratings: ReviewRatings,
    pub comments: Option<String>,
    pub assigned_date: DateTime<Utc>,
    pub due_date: Option<DateTime<Utc>>,
    /// Set exactly once, on completion
    pub completed_date: Option<DateTime<Utc>>,
}

impl Review {
    /// Create a pending review assignment
    pub fn new(manuscript_id: ManuscriptId, reviewer_id: ActorId) -> Self {
        Self {
            id: ReviewId::new(),
            manuscript_id,
            reviewer_id,
            status: ReviewStatus::Pending,
            recommendation: None,
            ratings: ReviewRatings::default(),
            comments: None,
            assigned_date: Utc::now(),
            due_date: None,
            completed_date: None,
        }
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.status == ReviewStatus::Completed
    }

    /// Reviewer has started work
    pub fn start(&mut self) -> Result<()> {
        if self.status != ReviewStatus::Pending {
            return Err(self.invalid_transition(ReviewStatus::InProgress));
        }
        self.status = ReviewStatus::InProgress;
        Ok(())
    }

    /// Reviewer has declined the assignment
    pub fn decline(&mut self) -> Result<()> {
        if !self.status.is_open() {
            return Err(self.invalid_transition(ReviewStatus::Declined));
        }
        self.status = ReviewStatus::Declined;
        Ok(())
    }

    /// Submit the final recommendation
    pub fn complete(
        &mut self,
        recommendation: Recommendation,
        ratings: ReviewRatings,
        comments: Option<String>,
    ) -> Result<()> {
        if !self.status.is_open() {
            return Err(self.invalid_transition(ReviewStatus::Completed));
        }
        if !recommendation.is_recognized() {
            return Err(ReviewError::Validation(format!(
                "review {} submitted without a recognized recommendation",
                self.id
            )));
        }
        ratings.validate()?;

        self.status = ReviewStatus::Completed;
        self.recommendation = Some(recommendation);
        self.ratings = ratings;
        self.comments = comments;
        self.completed_date = Some(Utc::now());
        Ok(())
    }

    fn invalid_transition(&self, to: ReviewStatus) -> ReviewError {
        ReviewError::InvalidOperation(format!(
            "review {} cannot move from {} to {}",
            self.id, self.status, to
        ))
    }
}
