//! Entry audit log.
//!
//! Every create, update and delete writes one row to `entry_events` inside
//! the mutation's transaction, carrying JSON snapshots of the entry before
//! and after the change.

use rusqlite::{Connection, Result};

/// Kind of change recorded for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventType {
    EntryCreated,
    EntryUpdated,
    EntryDeleted,
}

impl EventType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::EntryCreated => "entry_created",
            Self::EntryUpdated => "entry_updated",
            Self::EntryDeleted => "entry_deleted",
        }
    }

    const ALL: [Self; 3] = [Self::EntryCreated, Self::EntryUpdated, Self::EntryDeleted];

    fn from_stored(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }
}

/// One audit row.
#[derive(Debug, Clone)]
pub struct Event {
    pub entry_id: String,
    pub event_type: EventType,
    pub actor: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub created_at: i64,
}

impl Event {
    /// An event stamped with the current time.
    #[must_use]
    pub fn new(
        entry_id: &str,
        event_type: EventType,
        actor: &str,
        old_value: Option<String>,
        new_value: Option<String>,
    ) -> Self {
        Self {
            entry_id: entry_id.to_string(),
            event_type,
            actor: actor.to_string(),
            old_value,
            new_value,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Append an event.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub fn insert_event(conn: &Connection, event: &Event) -> Result<()> {
    conn.execute(
        "INSERT INTO entry_events (entry_id, kind, actor, before_json, after_json, recorded_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            event.entry_id,
            event.event_type.as_str(),
            event.actor,
            event.old_value,
            event.new_value,
            event.created_at,
        ],
    )?;
    Ok(())
}

/// Events for one entry, newest first. Defaults to the last 100.
///
/// Rows of an unknown kind are skipped.
///
/// # Errors
///
/// Returns an error if the query fails.
pub fn entry_history(conn: &Connection, entry_id: &str, limit: Option<u32>) -> Result<Vec<Event>> {
    let mut stmt = conn.prepare(
        "SELECT entry_id, kind, actor, before_json, after_json, recorded_at
         FROM entry_events
         WHERE entry_id = ?1
         ORDER BY recorded_at DESC, seq DESC
         LIMIT ?2",
    )?;

    let rows = stmt.query_map(rusqlite::params![entry_id, limit.unwrap_or(100)], |row| {
        let kind: String = row.get(1)?;
        let Some(event_type) = EventType::from_stored(&kind) else {
            return Ok(None);
        };
        Ok(Some(Event {
            entry_id: row.get(0)?,
            event_type,
            actor: row.get(2)?,
            old_value: row.get(3)?,
            new_value: row.get(4)?,
            created_at: row.get(5)?,
        }))
    })?;

    rows.filter_map(Result::transpose).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::apply_schema;

    #[test]
    fn test_history_is_newest_first() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let mut created = Event::new(
            "qna_1",
            EventType::EntryCreated,
            "alice",
            None,
            Some(r#"{"questions":["hi"]}"#.to_string()),
        );
        created.created_at = 1;
        let mut updated = Event::new("qna_1", EventType::EntryUpdated, "bob", None, None);
        updated.created_at = 2;
        insert_event(&conn, &created).unwrap();
        insert_event(&conn, &updated).unwrap();
        insert_event(&conn, &Event::new("qna_2", EventType::EntryCreated, "x", None, None))
            .unwrap();

        let events = entry_history(&conn, "qna_1", None).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event_type, EventType::EntryUpdated);
        assert_eq!(events[1].actor, "alice");
        assert!(events[1].new_value.as_deref().unwrap().contains("hi"));

        assert_eq!(entry_history(&conn, "qna_1", Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_kinds_are_skipped() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO entry_events (entry_id, kind, actor, recorded_at) VALUES ('qna_1', 'entry_merged', 'x', 0)",
            [],
        )
        .unwrap();

        assert!(entry_history(&conn, "qna_1", None).unwrap().is_empty());
    }
}
