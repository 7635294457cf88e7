//! Configuration management.
//!
//! This module resolves where the qna database lives, who is acting, and
//! loads user settings.
//!
//! # Layout
//!
//! Everything lives under a single global directory, `~/.qna/`:
//! - **Database**: `~/.qna/data/qna.db`
//! - **Settings**: `~/.qna/config.json`
//! - **Test database**: `~/.qna/test/qna.db` (when `QNA_TEST_DB` is set)

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::gate::InterceptRules;
use crate::transfer::Charset;

/// Get the global qna directory location (`~/.qna/`).
#[must_use]
pub fn global_qna_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".qna"))
}

fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0" && value.to_lowercase() != "false"
}

/// Check if test mode is enabled.
///
/// Test mode is enabled by setting `QNA_TEST_DB=1` (or any non-empty value).
/// This redirects all database operations to an isolated test database.
#[must_use]
pub fn is_test_mode() -> bool {
    std::env::var("QNA_TEST_DB")
        .map(|v| is_truthy(&v))
        .unwrap_or(false)
}

/// Get the test database path (`~/.qna/test/qna.db`).
#[must_use]
pub fn test_db_path() -> Option<PathBuf> {
    global_qna_dir().map(|dir| dir.join("test").join("qna.db"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `QNA_TEST_DB` environment variable → uses test database
/// 3. `QNA_DB` environment variable
/// 4. Global location: `~/.qna/data/qna.db`
///
/// Returns `None` if no home directory can be found.
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Explicit path from CLI flag
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    // Priority 2: Test mode - use isolated test database
    if is_test_mode() {
        return test_db_path();
    }

    // Priority 3: QNA_DB environment variable
    if let Ok(db_path) = std::env::var("QNA_DB") {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    // Priority 4: Global database location
    global_qna_dir().map(|dir| dir.join("data").join("qna.db"))
}

/// Get the default actor name recorded on audit events.
///
/// Priority:
/// 1. `QNA_ACTOR` environment variable
/// 2. Git user name
/// 3. System username
/// 4. "unknown"
#[must_use]
pub fn default_actor() -> String {
    if let Ok(actor) = std::env::var("QNA_ACTOR") {
        if !actor.is_empty() {
            return actor;
        }
    }

    if let Ok(output) = std::process::Command::new("git")
        .args(["config", "user.name"])
        .output()
    {
        if output.status.success() {
            let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
            if !name.is_empty() {
                return name;
            }
        }
    }

    if let Ok(user) = std::env::var("USER") {
        return user;
    }

    "unknown".to_string()
}

// ── Settings ──────────────────────────────────────────────────

/// User settings from `~/.qna/config.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Charset for CSV exports.
    pub csv_charset: Charset,
    /// Export flat JSON records unless told otherwise.
    pub export_flat: bool,
    /// Rules for `qna gate check`.
    pub intercept: InterceptRules,
}

impl Settings {
    /// Apply `QNA_CSV_CHARSET` and `QNA_EXPORT_FLAT` overrides.
    ///
    /// `lookup` reads a variable; pass `|k| std::env::var(k).ok()` for the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if an override has an invalid value.
    pub fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(charset) = lookup("QNA_CSV_CHARSET").filter(|v| !v.trim().is_empty()) {
            self.csv_charset = charset
                .parse()
                .map_err(|e| Error::Config(format!("QNA_CSV_CHARSET: {e}")))?;
        }
        if let Some(flat) = lookup("QNA_EXPORT_FLAT") {
            self.export_flat = is_truthy(flat.trim());
        }
        Ok(self)
    }
}

/// Get the settings file path.
///
/// # Errors
///
/// Returns `Error::Config` if the home directory cannot be determined.
pub fn config_path() -> Result<PathBuf> {
    global_qna_dir()
        .map(|dir| dir.join("config.json"))
        .ok_or_else(|| Error::Config("Could not determine home directory".into()))
}

/// Load settings from a specific file. A missing file yields defaults.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be read or parsed.
pub fn load_settings_from(path: &Path) -> Result<Settings> {
    if !path.exists() {
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read config file: {e}")))?;

    serde_json::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse config file: {e}")))
}

/// Load settings from `~/.qna/config.json` with environment overrides.
///
/// # Errors
///
/// Returns `Error::Config` if the file or an override is invalid.
pub fn load_settings() -> Result<Settings> {
    load_settings_from(&config_path()?)?.with_env_overrides(|key| std::env::var(key).ok())
}

/// Save settings to a specific file, creating parent directories.
///
/// # Errors
///
/// Returns `Error::Config` if the file cannot be written.
pub fn save_settings_to(path: &Path, settings: &Settings) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| Error::Config(format!("Failed to create config directory: {e}")))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {e}")))?;

    fs::write(path, content)
        .map_err(|e| Error::Config(format!("Failed to write config file: {e}")))
}
