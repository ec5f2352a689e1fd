//! SQLite schema for editorial state storage

/// Schema version for migrations
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Manuscripts (status is the authoritative field, version the concurrency token)
CREATE TABLE IF NOT EXISTS manuscripts (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    submitted_by TEXT NOT NULL,
    authors TEXT NOT NULL,
    status TEXT NOT NULL,
    assigned_copy_editor TEXT,
    status_override TEXT,
    version INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_manuscripts_status ON manuscripts(status);
CREATE INDEX IF NOT EXISTS idx_manuscripts_submitted_by ON manuscripts(submitted_by);

-- Reviews
CREATE TABLE IF NOT EXISTS reviews (
    id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL,
    reviewer_id TEXT NOT NULL,
    status TEXT NOT NULL,
    recommendation TEXT,
    ratings TEXT NOT NULL,
    comments TEXT,
    assigned_date TEXT NOT NULL,
    due_date TEXT,
    completed_date TEXT,
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id)
);

CREATE INDEX IF NOT EXISTS idx_reviews_manuscript ON reviews(manuscript_id, status);
CREATE INDEX IF NOT EXISTS idx_reviews_reviewer ON reviews(reviewer_id);

-- Timeline (append-only, ordered per manuscript)
CREATE TABLE IF NOT EXISTS timeline (
    id TEXT PRIMARY KEY,
    manuscript_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    event TEXT NOT NULL,
    description TEXT NOT NULL,
    date TEXT NOT NULL,
    performed_by TEXT,
    transition TEXT,
    metadata TEXT NOT NULL,
    UNIQUE (manuscript_id, sequence),
    FOREIGN KEY (manuscript_id) REFERENCES manuscripts(id)
);

CREATE INDEX IF NOT EXISTS idx_timeline_manuscript ON timeline(manuscript_id, sequence);
"#
    }

    /// Get migration SQL from one version to another
    pub fn migration(from: u32, to: u32) -> Option<&'static str> {
        match (from, to) {
            // No migrations yet (version 1 is initial)
            _ => None,
        }
    }
}
