//! SQLite-backed document store (requires "sqlite" feature)

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::schema::{Schema, SCHEMA_VERSION};
use super::{DocumentStore, ReviewFilter, StatusCommit};
use crate::actor::ActorId;
use crate::error::StoreError;
use crate::manuscript::{Manuscript, ManuscriptId, ManuscriptStatus};
use crate::review::{Recommendation, Review, ReviewId, ReviewStatus};
use crate::timeline::{TimelineEntry, TimelineEntryId, TimelineEvent};

const MANUSCRIPT_COLUMNS: &str = "id, title, submitted_by, authors, status, assigned_copy_editor, status_override, version, created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, manuscript_id, reviewer_id, status, recommendation, ratings, comments, assigned_date, due_date, completed_date";
const TIMELINE_COLUMNS: &str = "id, manuscript_id, sequence, event, description, date, performed_by, transition, metadata";

/// Document store persisted in a SQLite database
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (or create) a store at the given database path
    pub fn new(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::initialize(Connection::open(path)?)
    }

    /// Create an in-memory store (for testing)
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(conn: Connection) -> Result<Self, StoreError> {
        let current_version: u32 = conn
            .query_row(
                "SELECT version FROM schema_version ORDER BY applied_at DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .unwrap_or(0);

        if current_version == 0 {
            conn.execute_batch(Schema::create_tables())?;
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION])?;
        } else if current_version < SCHEMA_VERSION {
            for version in current_version..SCHEMA_VERSION {
                if let Some(migration) = Schema::migration(version, version + 1) {
                    conn.execute_batch(migration)?;
                }
            }
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [SCHEMA_VERSION])?;
        }

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Database("connection lock poisoned".to_string()))
    }

    fn query_manuscript(conn: &Connection, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        let sql = format!("SELECT {} FROM manuscripts WHERE id = ?1", MANUSCRIPT_COLUMNS);
        conn.query_row(&sql, [id.to_string()], ManuscriptRow::read)
            .optional()?
            .map(ManuscriptRow::into_manuscript)
            .transpose()
    }

    fn next_sequence(conn: &Connection, manuscript_id: &ManuscriptId) -> Result<i64, StoreError> {
        Ok(conn.query_row(
            "SELECT COALESCE(MAX(sequence), 0) + 1 FROM timeline WHERE manuscript_id = ?1",
            [manuscript_id.to_string()],
            |row| row.get(0),
        )?)
    }

    fn insert_entry(conn: &Connection, entry: &TimelineEntry) -> Result<(), StoreError> {
        let transition = entry
            .transition
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            r#"
            INSERT INTO timeline (id, manuscript_id, sequence, event, description, date, performed_by, transition, metadata)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                entry.id.to_string(),
                entry.manuscript_id.to_string(),
                entry.sequence as i64,
                entry.event.as_str(),
                entry.description,
                entry.date.to_rfc3339(),
                entry.performed_by.as_ref().map(ActorId::as_str),
                transition,
                serde_json::to_string(&entry.metadata)?,
            ],
        )?;
        Ok(())
    }

    /// Advance a manuscript's version after its review set changed
    fn touch(conn: &Connection, id: &ManuscriptId) -> Result<(), StoreError> {
        let updated = conn.execute(
            "UPDATE manuscripts SET version = version + 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(id.to_string()));
        }
        Ok(())
    }

    fn manuscript_exists(conn: &Connection, id: &ManuscriptId) -> Result<bool, StoreError> {
        Ok(conn
            .query_row(
                "SELECT 1 FROM manuscripts WHERE id = ?1",
                [id.to_string()],
                |_| Ok(()),
            )
            .optional()?
            .is_some())
    }
}

impl DocumentStore for SqliteDocumentStore {
    fn insert_manuscript(&self, manuscript: &Manuscript) -> Result<(), StoreError> {
        let conn = self.lock()?;
        if Self::manuscript_exists(&conn, &manuscript.id)? {
            return Err(StoreError::AlreadyExists(manuscript.id.to_string()));
        }
        let status_override = manuscript
            .status_override
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        conn.execute(
            r#"
            INSERT INTO manuscripts
            (id, title, submitted_by, authors, status, assigned_copy_editor, status_override, version, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                manuscript.id.to_string(),
                manuscript.title,
                manuscript.submitted_by.as_str(),
                serde_json::to_string(&manuscript.authors)?,
                manuscript.status.as_str(),
                manuscript.assigned_copy_editor.as_ref().map(ActorId::as_str),
                status_override,
                manuscript.version as i64,
                manuscript.created_at.to_rfc3339(),
                manuscript.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn load_manuscript(&self, id: &ManuscriptId) -> Result<Option<Manuscript>, StoreError> {
        let conn = self.lock()?;
        Self::query_manuscript(&conn, id)
    }

    fn commit_status(&self, commit: StatusCommit) -> Result<Manuscript, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let current: Option<i64> = tx
            .query_row(
                "SELECT version FROM manuscripts WHERE id = ?1",
                [commit.manuscript_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let current = current.ok_or_else(|| StoreError::NotFound(commit.manuscript_id.to_string()))?;
        if current as u64 != commit.expected_version {
            return Err(StoreError::Conflict {
                expected: commit.expected_version,
                actual: current as u64,
            });
        }

        let status_override = commit
            .status_override
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let updated = tx.execute(
            r#"
            UPDATE manuscripts
            SET status = ?1, status_override = ?2, version = version + 1, updated_at = ?3
            WHERE id = ?4 AND version = ?5
            "#,
            params![
                commit.status.as_str(),
                status_override,
                commit.entry.date.to_rfc3339(),
                commit.manuscript_id.to_string(),
                commit.expected_version as i64,
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::Conflict {
                expected: commit.expected_version,
                actual: current as u64 + 1,
            });
        }

        let mut entry = commit.entry;
        entry.sequence = Self::next_sequence(&tx, &commit.manuscript_id)? as u64;
        Self::insert_entry(&tx, &entry)?;
        tx.commit()?;

        Self::query_manuscript(&conn, &commit.manuscript_id)?
            .ok_or_else(|| StoreError::NotFound(commit.manuscript_id.to_string()))
    }

    fn delete_manuscript(&self, id: &ManuscriptId) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let key = id.to_string();
        tx.execute("DELETE FROM timeline WHERE manuscript_id = ?1", [&key])?;
        tx.execute("DELETE FROM reviews WHERE manuscript_id = ?1", [&key])?;
        let removed = tx.execute("DELETE FROM manuscripts WHERE id = ?1", [&key])?;
        if removed == 0 {
            return Err(StoreError::NotFound(key));
        }
        tx.commit()?;
        Ok(())
    }

    fn insert_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !Self::manuscript_exists(&tx, &review.manuscript_id)? {
            return Err(StoreError::NotFound(review.manuscript_id.to_string()));
        }
        let exists = tx
            .query_row(
                "SELECT 1 FROM reviews WHERE id = ?1",
                [review.id.to_string()],
                |_| Ok(()),
            )
            .optional()?
            .is_some();
        if exists {
            return Err(StoreError::AlreadyExists(review.id.to_string()));
        }
        tx.execute(
            r#"
            INSERT INTO reviews
            (id, manuscript_id, reviewer_id, status, recommendation, ratings, comments, assigned_date, due_date, completed_date)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                review.id.to_string(),
                review.manuscript_id.to_string(),
                review.reviewer_id.as_str(),
                review.status.as_str(),
                review.recommendation.map(|r| r.as_str()),
                serde_json::to_string(&review.ratings)?,
                review.comments,
                review.assigned_date.to_rfc3339(),
                review.due_date.map(|d| d.to_rfc3339()),
                review.completed_date.map(|d| d.to_rfc3339()),
            ],
        )?;
        Self::touch(&tx, &review.manuscript_id)?;
        tx.commit()?;
        Ok(())
    }

    fn load_review(&self, id: &ReviewId) -> Result<Option<Review>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("SELECT {} FROM reviews WHERE id = ?1", REVIEW_COLUMNS);
        conn.query_row(&sql, [id.to_string()], ReviewRow::read)
            .optional()?
            .map(ReviewRow::into_review)
            .transpose()
    }

    fn save_review(&self, review: &Review) -> Result<(), StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let updated = tx.execute(
            r#"
            UPDATE reviews
            SET status = ?1, recommendation = ?2, ratings = ?3, comments = ?4, due_date = ?5, completed_date = ?6
            WHERE id = ?7
            "#,
            params![
                review.status.as_str(),
                review.recommendation.map(|r| r.as_str()),
                serde_json::to_string(&review.ratings)?,
                review.comments,
                review.due_date.map(|d| d.to_rfc3339()),
                review.completed_date.map(|d| d.to_rfc3339()),
                review.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound(review.id.to_string()));
        }
        Self::touch(&tx, &review.manuscript_id)?;
        tx.commit()?;
        Ok(())
    }

    fn load_reviews(
        &self,
        manuscript_id: &ManuscriptId,
        filter: ReviewFilter,
    ) -> Result<Vec<Review>, StoreError> {
        let conn = self.lock()?;
        let rows = match filter {
            ReviewFilter::All => {
                let sql = format!(
                    "SELECT {} FROM reviews WHERE manuscript_id = ?1 ORDER BY assigned_date",
                    REVIEW_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([manuscript_id.to_string()], ReviewRow::read)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
            ReviewFilter::Status(status) => {
                let sql = format!(
                    "SELECT {} FROM reviews WHERE manuscript_id = ?1 AND status = ?2 ORDER BY assigned_date",
                    REVIEW_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(
                        params![manuscript_id.to_string(), status.as_str()],
                        ReviewRow::read,
                    )?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                rows
            }
        };
        rows.into_iter().map(ReviewRow::into_review).collect()
    }

    fn append_timeline(&self, mut entry: TimelineEntry) -> Result<TimelineEntry, StoreError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        if !Self::manuscript_exists(&tx, &entry.manuscript_id)? {
            return Err(StoreError::NotFound(entry.manuscript_id.to_string()));
        }
        entry.sequence = Self::next_sequence(&tx, &entry.manuscript_id)? as u64;
        Self::insert_entry(&tx, &entry)?;
        tx.commit()?;
        Ok(entry)
    }

    fn load_timeline(&self, manuscript_id: &ManuscriptId) -> Result<Vec<TimelineEntry>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM timeline WHERE manuscript_id = ?1 ORDER BY sequence",
            TIMELINE_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map([manuscript_id.to_string()], TimelineRow::read)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        rows.into_iter().map(TimelineRow::into_entry).collect()
    }
}

// Rows are read as raw columns first and decoded afterwards, so malformed
// stored values surface as `StoreError::Serialization` instead of panics.

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Serialization(format!("bad id {}: {}", s, e)))
}

fn parse_date(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("bad date {}: {}", s, e)))
}

fn parse_wire<T: std::str::FromStr>(s: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| StoreError::Serialization(e.to_string()))
}

struct ManuscriptRow {
    id: String,
    title: String,
    submitted_by: String,
    authors: String,
    status: String,
    assigned_copy_editor: Option<String>,
    status_override: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl ManuscriptRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            title: row.get(1)?,
            submitted_by: row.get(2)?,
            authors: row.get(3)?,
            status: row.get(4)?,
            assigned_copy_editor: row.get(5)?,
            status_override: row.get(6)?,
            version: row.get(7)?,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }

    fn into_manuscript(self) -> Result<Manuscript, StoreError> {
        Ok(Manuscript {
            id: ManuscriptId(parse_uuid(&self.id)?),
            title: self.title,
            submitted_by: ActorId(self.submitted_by),
            authors: serde_json::from_str(&self.authors)?,
            status: parse_wire::<ManuscriptStatus>(&self.status)?,
            assigned_copy_editor: self.assigned_copy_editor.map(ActorId),
            status_override: self
                .status_override
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            version: self.version as u64,
            created_at: parse_date(&self.created_at)?,
            updated_at: parse_date(&self.updated_at)?,
        })
    }
}

struct ReviewRow {
    id: String,
    manuscript_id: String,
    reviewer_id: String,
    status: String,
    recommendation: Option<String>,
    ratings: String,
    comments: Option<String>,
    assigned_date: String,
    due_date: Option<String>,
    completed_date: Option<String>,
}

impl ReviewRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            manuscript_id: row.get(1)?,
            reviewer_id: row.get(2)?,
            status: row.get(3)?,
            recommendation: row.get(4)?,
            ratings: row.get(5)?,
            comments: row.get(6)?,
            assigned_date: row.get(7)?,
            due_date: row.get(8)?,
            completed_date: row.get(9)?,
        })
    }

    fn into_review(self) -> Result<Review, StoreError> {
        Ok(Review {
            id: ReviewId(parse_uuid(&self.id)?),
            manuscript_id: ManuscriptId(parse_uuid(&self.manuscript_id)?),
            reviewer_id: ActorId(self.reviewer_id),
            status: parse_wire::<ReviewStatus>(&self.status)?,
            recommendation: self.recommendation.as_deref().map(Recommendation::from_stored),
            ratings: serde_json::from_str(&self.ratings)?,
            comments: self.comments,
            assigned_date: parse_date(&self.assigned_date)?,
            due_date: self.due_date.as_deref().map(parse_date).transpose()?,
            completed_date: self.completed_date.as_deref().map(parse_date).transpose()?,
        })
    }
}

struct TimelineRow {
    id: String,
    manuscript_id: String,
    sequence: i64,
    event: String,
    description: String,
    date: String,
    performed_by: Option<String>,
    transition: Option<String>,
    metadata: String,
}

impl TimelineRow {
    fn read(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            manuscript_id: row.get(1)?,
            sequence: row.get(2)?,
            event: row.get(3)?,
            description: row.get(4)?,
            date: row.get(5)?,
            performed_by: row.get(6)?,
            transition: row.get(7)?,
            metadata: row.get(8)?,
        })
    }

    fn into_entry(self) -> Result<TimelineEntry, StoreError> {
        Ok(TimelineEntry {
            id: TimelineEntryId(parse_uuid(&self.id)?),
            manuscript_id: ManuscriptId(parse_uuid(&self.manuscript_id)?),
            sequence: self.sequence as u64,
            event: parse_wire::<TimelineEvent>(&self.event)?,
            description: self.description,
            date: parse_date(&self.date)?,
            performed_by: self.performed_by.map(ActorId),
            transition: self
                .transition
                .as_deref()
                .map(serde_json::from_str)
                .transpose()?,
            metadata: serde_json::from_str(&self.metadata)?,
        })
    }
}
