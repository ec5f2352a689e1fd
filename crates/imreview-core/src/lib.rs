//! Imreview Core - Editorial decision engine for the impress suite
//!
//! This crate decides what a manuscript's status should be from the reviews it
//! has received, and who may see or change it:
//!
//! - **Tally**: Counts of accept/reject/major/minor over completed reviews
//! - **Derivation**: One pure function mapping (current status, tally) to a status
//! - **Engine**: Write-path decision on review completion, editorial overrides,
//!   reviewer assignment, explicit recompute
//! - **Reconcile**: Read-path self-healing of drifted stored statuses
//! - **Access**: Role resolution into a capability set per (actor, manuscript)
//! - **Timeline**: Append-only audit of every status change
//! - **Store**: Document store trait with in-memory and SQLite backends
//! - **Handoff**: Best-effort notification when a manuscript is accepted
//! - **Config**: Retry budget, read disclosure policy, reconcile switch
//!
//! # Architecture
//!
//! Both the write path and the read path call the same derivation function.
//! Status commits are conditional on the manuscript's version token, which
//! every review write also advances, so a commit computed from a stale review
//! set fails and is recomputed:
//!
//! ```text
//! review completed ──┐
//! recompute ─────────┼─→ tally → derive → commit_status(expected_version)
//! manuscript read ───┘                          │
//!                                               ├─→ timeline entry
//!                                               └─→ acceptance hand-off
//! ```

pub mod access;
pub mod actor;
pub mod config;
pub mod derivation;
pub mod engine;
pub mod error;
pub mod handoff;
pub mod manuscript;
pub mod review;
pub mod store;
pub mod tally;
pub mod timeline;

pub use access::Capabilities;
pub use actor::{Actor, ActorDirectory, ActorId, InMemoryActorDirectory, Role};
pub use config::{AccessConfig, CommitConfig, ConfigError, EngineConfig, ReconcileConfig};
pub use derivation::derive_status;
pub use engine::{
    DecisionEngine, DecisionOutcome, ManuscriptLocks, ManuscriptView, ReviewCompletion,
    ReviewSubmission,
};
pub use error::{Result, ReviewError, StoreError};
pub use handoff::{AcceptanceHandoff, HandoffError, HandoffOutcome, HandoffReport, NoopHandoff};
pub use manuscript::{AuthorRecord, Manuscript, ManuscriptId, ManuscriptStatus, StatusOverride};
pub use review::{Recommendation, Review, ReviewId, ReviewRatings, ReviewStatus};
pub use store::{DocumentStore, InMemoryDocumentStore, ReviewFilter, StatusCommit};
#[cfg(feature = "sqlite")]
pub use store::SqliteDocumentStore;
pub use tally::RecommendationTally;
pub use timeline::{StatusTransition, TimelineEntry, TimelineEntryId, TimelineEvent};
