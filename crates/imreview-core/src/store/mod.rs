//! Document store contract and backends
//!
//! The engine only reaches storage through [`DocumentStore`]; a store handle is
//! injected into the engine rather than looked up globally.

mod memory;
#[cfg(feature = "sqlite")]
mod schema;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use memory::InMemoryDocumentStore;
#[cfg(feature = "sqlite")]
pub use schema::{Schema, SCHEMA_VERSION};
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDocumentStore;

use crate::error::StoreError;
use crate::manuscript::{Manuscript, ManuscriptId, ManuscriptStatus, StatusOverride};
use crate::review::{Review, ReviewId, ReviewStatus};
use crate::timeline::TimelineEntry;

/// Which reviews to load for a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewFilter {
    All,
    Status(ReviewStatus),
}

impl ReviewFilter {
    /// Completed reviews only
    pub const COMPLETED: ReviewFilter = ReviewFilter::Status(ReviewStatus::Completed);

    pub fn matches(&self, review: &Review) -> bool {
        match self {
            ReviewFilter::All => true,
            ReviewFilter::Status(status) => review.status == *status,
        }
    }
}

/// A conditional status write: applied only if the manuscript is still at
/// `expected_version`, together with its timeline entry.
#[derive(Debug, Clone)]
pub struct StatusCommit {
    pub manuscript_id: ManuscriptId,
    pub expected_version: u64,
    pub status: ManuscriptStatus,
    /// Override pin to store alongside the status (`None` clears it)
    pub status_override: Option<StatusOverride>,
    pub entry: TimelineEntry,
}

/// Storage backend for manuscripts, reviews, and timelines
pub trait DocumentStore: Send + Sync {
    /// Insert a new manuscript
    fn insert_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError>;

    /// Get a manuscript by ID
    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError>;

    /// Atomically set status and override pin, bump the version, and append
    /// the timeline entry. Fails with `Conflict` if the stored version differs
    /// from `expected_version`. Returns the updated manuscript.
    fn commit_status(&self, commit: StatusCommit) -> Result<Manuscript, StoreError>;

    /// Delete a manuscript with its reviews and timeline
    fn delete_manuscript(&self, id: &ManuscriptId) -> Result<(), StoreError>;

    /// Insert a new review, advancing its manuscript's version in the same write
    fn insert_review(&self, review: &Review) -> Result<(), StoreError>;

    /// Get a review by ID
    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError>;

    /// Replace an existing review, advancing its manuscript's version in the
    /// same write
    fn save_review(&self, review: &Review) -> Result<(), StoreError>;

    /// Get the reviews of a manuscript matching `filter`
    fn load_reviews(
        &self,
        manuscript_id: &ManuscriptId,
        filter: ReviewFilter,
    ) -> Result<Vec<Review>, StoreError>;

    /// Append a timeline entry that carries no status change
    fn append_timeline(&self, entry: TimelineEntry) -> Result<TimelineEntry, StoreError>;

    /// Get a manuscript's timeline in sequence order
    fn load_timeline(&self, manuscript_id: &ManuscriptId) -> Result<Vec<TimelineEntry>, StoreError>;
}
