//! SQLite storage implementation.
//!
//! This module provides the main storage backend for qna using SQLite.
//! It follows the MutationContext pattern for transaction discipline and audit logging.

use crate::error::{Error, Result};
use crate::model::{Action, Answer, Entry, EntryData};
use crate::storage::events::{insert_event, Event, EventType};
use crate::storage::schema::apply_schema;
use crate::storage::{EntryStore, Page};
use rusqlite::{Connection, OptionalExtension, Transaction};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};

/// Actor recorded on audit events when none is set.
pub const DEFAULT_ACTOR: &str = "qna";

/// SQLite-based storage backend.
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
    actor: String,
}

/// Context for a mutation operation, tracking side effects.
///
/// This struct is passed to mutation closures to record audit events,
/// which are written just before the transaction commits.
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: String,
    /// Actor performing the operation (agent ID, user, etc.).
    pub actor: String,
    /// Events to write at the end of the transaction.
    pub events: Vec<Event>,
}

impl MutationContext {
    /// Create a new mutation context.
    #[must_use]
    pub fn new(op_name: &str, actor: &str) -> Self {
        Self {
            op_name: op_name.to_string(),
            actor: actor.to_string(),
            events: Vec::new(),
        }
    }

    /// Record an event with old/new values for field tracking.
    pub fn record_change(
        &mut self,
        entity_id: &str,
        event_type: EventType,
        old_value: Option<String>,
        new_value: Option<String>,
    ) {
        self.events
            .push(Event::new(entity_id, event_type, &self.actor, old_value, new_value));
    }
}

/// A raw `qna_entries` row, exactly as stored.
///
/// Rows written by this crate always convert cleanly with [`EntryRow::into_entry`].
/// Rows written by older tools or edited by hand may not, so readers that
/// must never fail (export) work from the raw columns instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryRow {
    pub id: String,
    /// JSON array text.
    pub questions: String,
    pub action: String,
    pub answer_text: Option<String>,
    pub redirect_flow: Option<String>,
    pub redirect_node: Option<String>,
    pub enabled: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl EntryRow {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            questions: row.get(1)?,
            action: row.get(2)?,
            answer_text: row.get(3)?,
            redirect_flow: row.get(4)?,
            redirect_node: row.get(5)?,
            enabled: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }

    /// Questions decoded leniently.
    ///
    /// A column that is not a JSON string array is treated as a single
    /// question holding the raw text.
    #[must_use]
    pub fn questions_lossy(&self) -> Vec<String> {
        match serde_json::from_str::<Vec<String>>(&self.questions) {
            Ok(questions) => questions,
            Err(_) if self.questions.trim().is_empty() => Vec::new(),
            Err(_) => vec![self.questions.clone()],
        }
    }

    /// Convert into a typed entry, checking every invariant.
    ///
    /// # Errors
    ///
    /// Returns an error describing why the row is malformed.
    pub fn into_entry(self) -> Result<Entry> {
        let corrupt = |msg: String| Error::Other(format!("Malformed entry {}: {msg}", self.id));

        let questions: Vec<String> = serde_json::from_str(&self.questions)
            .map_err(|e| corrupt(format!("questions column: {e}")))?;
        let action: Action = self.action.parse().map_err(corrupt)?;
        let answer = Answer::from_parts(
            action,
            self.answer_text.as_deref(),
            self.redirect_flow.as_deref(),
            self.redirect_node.as_deref(),
        )
        .map_err(corrupt)?;

        let data = EntryData {
            questions,
            answer,
            enabled: self.enabled,
        };
        data.validate().map_err(corrupt)?;

        Ok(Entry {
            id: self.id,
            data,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const ENTRY_COLUMNS: &str = "id, questions, action, answer_text, redirect_flow, redirect_node, enabled, created_at, updated_at";

/// Column values for an entry, in `qna_entries` order after `id`.
struct EntryColumns<'a> {
    questions: String,
    action: &'static str,
    answer_text: Option<&'a str>,
    redirect_flow: Option<&'a str>,
    redirect_node: Option<&'a str>,
}

impl<'a> EntryColumns<'a> {
    fn from_data(data: &'a EntryData) -> Result<Self> {
        let redirect = data.answer.redirect();
        Ok(Self {
            questions: serde_json::to_string(&data.questions)?,
            action: data.answer.action().as_str(),
            answer_text: data.answer.answer_text(),
            redirect_flow: redirect.map(|(flow, _)| flow),
            redirect_node: redirect.and_then(|(_, node)| node),
        })
    }
}

impl SqliteStorage {
    /// Open a database at the given path.
    ///
    /// Creates the database and applies schema if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_timeout(path, None)
    }

    /// Open a database with an optional busy timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_timeout(path: &Path, timeout_ms: Option<u64>) -> Result<Self> {
        let conn = Connection::open(path)?;

        if let Some(timeout) = timeout_ms {
            conn.busy_timeout(Duration::from_millis(timeout))?;
        } else {
            // Default 5 second timeout
            conn.busy_timeout(Duration::from_secs(5))?;
        }

        apply_schema(&conn)?;
        Ok(Self {
            conn,
            actor: DEFAULT_ACTOR.to_string(),
        })
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self {
            conn,
            actor: DEFAULT_ACTOR.to_string(),
        })
    }

    /// Set the actor recorded on audit events for subsequent mutations.
    #[must_use]
    pub fn with_actor(mut self, actor: &str) -> Self {
        self.actor = actor.to_string();
        self
    }

    /// Get a reference to the underlying connection (for read operations).
    #[must_use]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Writes audit events
    /// 4. Commits (or rolls back on error)
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&mut self, op: &str, f: F) -> Result<R>
    where
        F: FnOnce(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(rusqlite::TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op, &self.actor);

        let result = f(&tx, &mut ctx)?;

        for event in &ctx.events {
            insert_event(&tx, event)?;
        }

        tx.commit()?;
        debug!(op = %ctx.op_name, actor = %ctx.actor, events = ctx.events.len(), "Mutation committed");

        Ok(result)
    }

    // ================
    // Entry Operations
    // ================

    /// Insert a new entry under a freshly generated ID.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `data` breaks an entry invariant, or an error
    /// if the insert fails.
    pub fn create_entry(&mut self, data: &EntryData) -> Result<String> {
        data.validate().map_err(|e| Error::validation(0, e))?;
        let id = Entry::new_id();
        let cols = EntryColumns::from_data(data)?;
        let snapshot = serde_json::to_string(data)?;
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("create_entry", |tx, ctx| {
            tx.execute(
                "INSERT INTO qna_entries (id, questions, action, answer_text, redirect_flow, redirect_node, enabled, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    id,
                    cols.questions,
                    cols.action,
                    cols.answer_text,
                    cols.redirect_flow,
                    cols.redirect_node,
                    data.enabled,
                    now
                ],
            )?;

            ctx.record_change(&id, EventType::EntryCreated, None, Some(snapshot));
            Ok(())
        })?;

        Ok(id)
    }

    /// Replace every field of an existing entry.
    ///
    /// `created_at` is kept; `updated_at` is bumped.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if `data` breaks an entry invariant, or
    /// `EntryNotFound` if no entry has this ID.
    pub fn replace_entry(&mut self, id: &str, data: &EntryData) -> Result<()> {
        data.validate().map_err(|e| Error::validation(0, e))?;
        let cols = EntryColumns::from_data(data)?;
        let snapshot = serde_json::to_string(data)?;
        let now = chrono::Utc::now().timestamp_millis();

        self.mutate("replace_entry", |tx, ctx| {
            let old = entry_snapshot(tx, id)?;

            let rows = tx.execute(
                "UPDATE qna_entries
                 SET questions = ?2, action = ?3, answer_text = ?4, redirect_flow = ?5,
                     redirect_node = ?6, enabled = ?7, updated_at = ?8
                 WHERE id = ?1",
                rusqlite::params![
                    id,
                    cols.questions,
                    cols.action,
                    cols.answer_text,
                    cols.redirect_flow,
                    cols.redirect_node,
                    data.enabled,
                    now
                ],
            )?;

            if rows == 0 {
                return Err(Error::EntryNotFound { id: id.to_string() });
            }

            ctx.record_change(id, EventType::EntryUpdated, old, Some(snapshot));
            Ok(())
        })
    }

    /// Delete an entry.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` if no entry has this ID.
    pub fn delete_entry(&mut self, id: &str) -> Result<()> {
        self.mutate("delete_entry", |tx, ctx| {
            let old = entry_snapshot(tx, id)?;

            let rows = tx.execute("DELETE FROM qna_entries WHERE id = ?1", [id])?;
            if rows == 0 {
                return Err(Error::EntryNotFound { id: id.to_string() });
            }

            ctx.record_change(id, EventType::EntryDeleted, old, None);
            Ok(())
        })
    }

    /// Get a raw entry row by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_entry_row(&self, id: &str) -> Result<Option<EntryRow>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {ENTRY_COLUMNS} FROM qna_entries WHERE id = ?1"))?;

        let row = stmt.query_row([id], EntryRow::from_row).optional()?;
        Ok(row)
    }

    /// List raw entry rows in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_entry_rows(&self, page: Page) -> Result<Vec<EntryRow>> {
        // SQLite treats a negative LIMIT as "no limit"
        let limit = page.limit.map_or(-1, i64::from);
        let offset = i64::from(page.offset.unwrap_or(0));

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM qna_entries
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?1 OFFSET ?2"
        ))?;

        let rows = stmt
            .query_map(rusqlite::params![limit, offset], EntryRow::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count all entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn count_entries(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM qna_entries", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

/// Current JSON snapshot of an entry for audit `old_value`.
fn entry_snapshot(tx: &Transaction, id: &str) -> Result<Option<String>> {
    let row = tx
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM qna_entries WHERE id = ?1"),
            [id],
            EntryRow::from_row,
        )
        .optional()?;

    Ok(row.and_then(|r| r.into_entry().ok()).and_then(|entry| serde_json::to_string(&entry.data).ok()))
}

impl EntryStore for SqliteStorage {
    fn list(&self, page: Page) -> Result<Vec<Entry>> {
        let mut entries = Vec::new();
        for row in self.list_entry_rows(page)? {
            match row.into_entry() {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(error = %e, "Skipping malformed entry"),
            }
        }
        Ok(entries)
    }

    fn list_rows(&self) -> Result<Vec<EntryRow>> {
        self.list_entry_rows(Page::all())
    }

    fn count(&self) -> Result<usize> {
        self.count_entries()
    }

    fn get(&self, id: &str) -> Result<Entry> {
        self.get_entry_row(id)?
            .ok_or_else(|| Error::EntryNotFound { id: id.to_string() })?
            .into_entry()
    }

    fn save(&mut self, data: &EntryData, id: Option<&str>) -> Result<String> {
        match id {
            Some(id) => {
                self.replace_entry(id, data)?;
                Ok(id.to_string())
            }
            None => self.create_entry(data),
        }
    }

    fn delete(&mut self, id: &str) -> Result<()> {
        self.delete_entry(id)
    }
}
