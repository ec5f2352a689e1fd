//! Append-only audit timeline of manuscript events
//!
//! Entries are kept per manuscript, ordered by a store-assigned sequence, and
//! never mutated or removed except when the manuscript itself is deleted.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::actor::ActorId;
use crate::manuscript::{ManuscriptId, ManuscriptStatus};
use crate::review::Recommendation;

/// Unique identifier for a timeline entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimelineEntryId(pub Uuid);

impl TimelineEntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TimelineEntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TimelineEntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What happened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TimelineEvent {
    /// Status derived after a review was completed
    StatusDerived,
    /// Stored status corrected on read
    StatusReconciled,
    /// Status set by an editor
    EditorialOverride,
    /// Status re-derived on explicit request
    StatusRecomputed,
    /// Reviewer assigned; also moves a submitted manuscript into review
    ReviewerAssigned,
}

impl TimelineEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimelineEvent::StatusDerived => "status-derived",
            TimelineEvent::StatusReconciled => "status-reconciled",
            TimelineEvent::EditorialOverride => "editorial-override",
            TimelineEvent::StatusRecomputed => "status-recomputed",
            TimelineEvent::ReviewerAssigned => "reviewer-assigned",
        }
    }
}

impl std::fmt::Display for TimelineEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TimelineEvent {
    type Err = crate::error::ReviewError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "status-derived" => Ok(TimelineEvent::StatusDerived),
            "status-reconciled" => Ok(TimelineEvent::StatusReconciled),
            "editorial-override" => Ok(TimelineEvent::EditorialOverride),
            "status-recomputed" => Ok(TimelineEvent::StatusRecomputed),
            "reviewer-assigned" => Ok(TimelineEvent::ReviewerAssigned),
            other => Err(crate::error::ReviewError::Validation(format!(
                "unknown timeline event: {}",
                other
            ))),
        }
    }
}

/// Status change details carried by a timeline entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    pub from: ManuscriptStatus,
    pub to: ManuscriptStatus,
    /// Completed reviews counted by the derivation
    pub review_count: usize,
    /// Every counted recommendation, ordered by review completion
    pub recommendations: Vec<Recommendation>,
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub id: TimelineEntryId,
    pub manuscript_id: ManuscriptId,
    /// Position in the manuscript's timeline, set by the store
    pub sequence: u64,
    pub event: TimelineEvent,
    pub description: String,
    pub date: DateTime<Utc>,
    /// `None` for engine-initiated entries
    pub performed_by: Option<ActorId>,
    pub transition: Option<StatusTransition>,
    pub metadata: BTreeMap<String, String>,
}

impl TimelineEntry {
    /// Create a new entry
    pub fn new(manuscript_id: ManuscriptId, event: TimelineEvent, description: impl Into<String>) -> Self {
        Self {
            id: TimelineEntryId::new(),
            manuscript_id,
            sequence: 0, // Set by DocumentStore
            event,
            description: description.into(),
            date: Utc::now(),
            performed_by: None,
            transition: None,
            metadata: BTreeMap::new(),
        }
    }

    /// Set the acting user
    pub fn with_actor(mut self, actor: Option<ActorId>) -> Self {
        self.performed_by = actor;
        self
    }

    /// Attach status change details
    pub fn with_transition(mut self, transition: StatusTransition) -> Self {
        self.transition = Some(transition);
        self
    }

    /// Whether this entry records a status change
    pub fn is_status_change(&self) -> bool {
        self.transition.is_some()
    }

    /// Add a metadata key
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_builder() {
        let m = ManuscriptId::new();
        let entry = TimelineEntry::new(m, TimelineEvent::StatusDerived, "Accepted by reviewers")
            .with_actor(Some(ActorId::from("rev")))
            .with_transition(StatusTransition {
                from: ManuscriptStatus::UnderReview,
                to: ManuscriptStatus::Accepted,
                review_count: 1,
                recommendations: vec![Recommendation::Accept],
            })
            .with_metadata("trigger", "review");

        assert_eq!(entry.sequence, 0);
        assert!(entry.is_status_change());
        assert_eq!(entry.performed_by, Some(ActorId::from("rev")));
        assert_eq!(entry.transition.as_ref().unwrap().to, ManuscriptStatus::Accepted);
        assert_eq!(entry.metadata.get("trigger").map(String::as_str), Some("review"));
    }

    #[test]
    fn test_event_wire_names() {
        for event in [
            TimelineEvent::StatusDerived,
            TimelineEvent::StatusReconciled,
            TimelineEvent::EditorialOverride,
            TimelineEvent::StatusRecomputed,
            TimelineEvent::ReviewerAssigned,
        ] {
            assert_eq!(
                serde_json::to_string(&event).unwrap(),
                format!("\"{}\"", event.as_str())
            );
            assert_eq!(event.as_str().parse::<TimelineEvent>().unwrap(), event);
        }
    }
}
