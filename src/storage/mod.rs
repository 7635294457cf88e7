//! SQLite storage layer for qna.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Audit events for history
//!
//! # Submodules
//!
//! - [`events`] - Audit event storage
//! - [`schema`] - Database schema definitions
//! - [`sqlite`] - Main SQLite storage implementation

pub mod events;
pub mod schema;
pub mod sqlite;

use crate::error::Result;
use crate::model::{Entry, EntryData};

pub use sqlite::{EntryRow, MutationContext, SqliteStorage, DEFAULT_ACTOR};

/// Limit/offset window for listing entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

impl Page {
    #[must_use]
    pub const fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self { limit, offset }
    }

    /// Every entry, no window.
    #[must_use]
    pub const fn all() -> Self {
        Self {
            limit: None,
            offset: None,
        }
    }
}

/// Durable keyed collection of entries.
///
/// The import and export engines only talk to the store through this trait.
pub trait EntryStore {
    /// List well-formed entries in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list(&self, page: Page) -> Result<Vec<Entry>>;

    /// Every stored row, including ones that no longer satisfy the entry
    /// invariants.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn list_rows(&self) -> Result<Vec<EntryRow>>;

    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn count(&self) -> Result<usize>;

    /// # Errors
    ///
    /// Returns `EntryNotFound` for an unknown ID.
    fn get(&self, id: &str) -> Result<Entry>;

    /// Create (`id` absent) or fully replace (`id` present) an entry.
    /// Returns the entry's ID.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` when replacing an unknown ID.
    fn save(&mut self, data: &EntryData, id: Option<&str>) -> Result<String>;

    /// # Errors
    ///
    /// Returns `EntryNotFound` for an unknown ID.
    fn delete(&mut self, id: &str) -> Result<()>;
}
