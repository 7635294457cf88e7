//! Create the qna database.
//!
//! The database goes wherever [`resolve_db_path`] points: `--db`, the test
//! database under `QNA_TEST_DB`, `QNA_DB`, or `~/.qna/data/qna.db`. A default
//! `~/.qna/config.json` is written alongside when none exists yet.

use crate::config::{config_path, resolve_db_path, save_settings_to, Settings};
use crate::error::{Error, Result};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Serialize)]
struct InitOutput {
    database: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    config: Option<PathBuf>,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if the database exists and `force` is not
/// set, or an error if the database cannot be created.
pub fn execute(db_path: Option<&PathBuf>, force: bool, json: bool) -> Result<()> {
    let db_path = resolve_db_path(db_path.map(|p| p.as_path()))
        .ok_or_else(|| Error::Config("Could not determine the qna directory".to_string()))?;

    if db_path.exists() {
        if !force {
            return Err(Error::AlreadyInitialized { path: db_path });
        }
        fs::remove_file(&db_path)?;
        // WAL side files belong to the old database
        for suffix in ["-wal", "-shm"] {
            let mut side = db_path.clone().into_os_string();
            side.push(suffix);
            let _ = fs::remove_file(PathBuf::from(side));
        }
    }

    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    // Opening applies the schema
    SqliteStorage::open(&db_path)?;
    debug!(path = %db_path.display(), "Database created");

    let config = write_default_settings();

    if json {
        let output = InitOutput {
            database: db_path,
            config,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else {
        println!("Initialized qna database");
        println!("  Database: {}", db_path.display());
        if let Some(config) = config {
            println!("  Settings: {}", config.display());
        }
        println!();
        println!("Next: `qna entry add` or `qna import <file>`.");
    }

    Ok(())
}

/// Write default settings if none exist. Returns the path when written.
fn write_default_settings() -> Option<PathBuf> {
    let path = config_path().ok()?;
    if path.exists() {
        return None;
    }

    match save_settings_to(&path, &Settings::default()) {
        Ok(()) => Some(path),
        Err(e) => {
            warn!(error = %e, "Could not write default settings");
            None
        }
    }
}
