//! Database schema definitions.
//!
//! This module contains the complete SQLite schema for the qna store.

use rusqlite::{Connection, Result};

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the qna database.
///
/// Note: Timestamps are stored as INTEGER (Unix milliseconds). Questions are
/// stored as a JSON array in a TEXT column so display order survives.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Core Tables
-- ====================

-- Entries: question/answer units
CREATE TABLE IF NOT EXISTS qna_entries (
    id TEXT PRIMARY KEY,
    questions TEXT NOT NULL DEFAULT '[]',
    action TEXT NOT NULL,
    answer_text TEXT,
    redirect_flow TEXT,
    redirect_node TEXT,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_qna_entries_created ON qna_entries(created_at, id);
CREATE INDEX IF NOT EXISTS idx_qna_entries_enabled ON qna_entries(enabled);

-- ====================
-- Audit
-- ====================

-- One row per entry mutation; snapshots are entry JSON
CREATE TABLE IF NOT EXISTS entry_events (
    seq INTEGER PRIMARY KEY AUTOINCREMENT,
    entry_id TEXT NOT NULL,
    kind TEXT NOT NULL,
    actor TEXT NOT NULL,
    before_json TEXT,
    after_json TEXT,
    recorded_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entry_events_entry ON entry_events(entry_id, recorded_at DESC);
";

/// Apply the schema to a connection.
///
/// Safe to call on every open: all statements are `IF NOT EXISTS`.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    // Set pragmas before schema creation
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    // Record schema version
    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).expect("Failed to apply schema");

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"qna_entries".to_string()));
        assert!(tables.contains(&"entry_events".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Apply twice - should not fail
        apply_schema(&conn).expect("First apply failed");
        apply_schema(&conn).expect("Second apply failed");

        let versions: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(versions, 1);
    }
}
