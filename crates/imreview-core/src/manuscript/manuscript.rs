//! Manuscript struct and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ManuscriptStatus;
use crate::actor::ActorId;
use crate::error::{Result, ReviewError};

/// Unique identifier for a manuscript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ManuscriptId(pub Uuid);

impl ManuscriptId {
    /// Create a new random manuscript ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a manuscript ID from a string
    pub fn parse(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ReviewError::Validation(format!("invalid manuscript id: {}", s)))
    }
}

impl Default for ManuscriptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ManuscriptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An author listed on a manuscript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorRecord {
    pub name: String,
    pub email: String,
    pub affiliation: Option<String>,
    /// Whether this author handles correspondence
    pub corresponding: bool,
}

impl AuthorRecord {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            affiliation: None,
            corresponding: false,
        }
    }

    pub fn with_affiliation(mut self, affiliation: impl Into<String>) -> Self {
        self.affiliation = Some(affiliation.into());
        self
    }

    pub fn corresponding(mut self) -> Self {
        self.corresponding = true;
        self
    }
}

/// A deliberate editorial status decision the engine must not silently undo.
///
/// The pin remembers how many completed reviews existed when the editor
/// decided; the read path leaves the status alone until that number changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusOverride {
    pub status: ManuscriptStatus,
    pub completed_reviews: usize,
    pub set_by: ActorId,
    pub set_at: DateTime<Utc>,
}

/// A manuscript moving through editorial review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manuscript {
    /// Unique identifier
    pub id: ManuscriptId,
    pub title: String,
    /// Owning author
    pub submitted_by: ActorId,
    /// Author list in byline order
    pub authors: Vec<AuthorRecord>,
    /// Authoritative status
    pub status: ManuscriptStatus,
    /// Copy editor assigned for the production stage
    pub assigned_copy_editor: Option<ActorId>,
    /// Active editorial override, if any
    pub status_override: Option<StatusOverride>,
    /// Optimistic concurrency token, bumped on every committed status change
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Manuscript {
    /// Create a newly submitted manuscript
    pub fn new(title: impl Into<String>, submitted_by: ActorId, authors: Vec<AuthorRecord>) -> Self {
        let now = Utc::now();
        Self {
            id: ManuscriptId::new(),
            title: title.into(),
            submitted_by,
            authors,
            status: ManuscriptStatus::Submitted,
            assigned_copy_editor: None,
            status_override: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the initial status
    pub fn with_status(mut self, status: ManuscriptStatus) -> Self {
        self.status = status;
        self
    }

    /// Assign a copy editor
    pub fn with_copy_editor(mut self, copy_editor: ActorId) -> Self {
        self.assigned_copy_editor = Some(copy_editor);
        self
    }

    /// Whether `actor` is the owning author
    pub fn is_submitted_by(&self, actor: &ActorId) -> bool {
        &self.submitted_by == actor
    }

    /// Whether `actor` is the assigned copy editor
    pub fn is_copy_editor(&self, actor: &ActorId) -> bool {
        self.assigned_copy_editor.as_ref() == Some(actor)
    }

    /// The corresponding authors
    pub fn corresponding_authors(&self) -> impl Iterator<Item = &AuthorRecord> {
        self.authors.iter().filter(|a| a.corresponding)
    }

    /// Check the authorship invariants
    pub fn validate(&self) -> Result<()> {
        if self.authors.is_empty() {
            return Err(ReviewError::Validation(format!(
                "manuscript {} has no authors",
                self.id
            )));
        }
        if self.corresponding_authors().next().is_none() {
            return Err(ReviewError::Validation(format!(
                "manuscript {} has no corresponding author",
                self.id
            )));
        }
        Ok(())
    }
}
