//! Command implementations.

pub mod completions;
pub mod entry;
pub mod export;
pub mod gate;
pub mod import;
pub mod init;
pub mod version;

use std::path::PathBuf;

use crate::config::{default_actor, resolve_db_path};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;

/// Open the existing database for a command.
///
/// Commands never create the database implicitly; `qna init` does that.
fn open_storage(db_path: Option<&PathBuf>, actor: Option<&str>) -> Result<SqliteStorage> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path())).ok_or(Error::NotInitialized)?;

    if !db_path.exists() {
        return Err(Error::NotInitialized);
    }

    let actor = actor.map(ToString::to_string).unwrap_or_else(default_actor);
    Ok(SqliteStorage::open(&db_path)?.with_actor(&actor))
}
