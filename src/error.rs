//! Error types for the qna CLI.
//!
//! Every failure in the crate is an [`Error`]. Each variant maps to an
//! [`ErrorCode`], which fixes the process exit code (2 storage, 3 missing
//! entry, 4 bad input, 7 settings, 8 file or encoding) and whether a caller
//! can retry after fixing its input. Non-TTY consumers get the same
//! information as JSON on stderr.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for qna operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Code ────────────────────────────────────────────────

/// Stable error identifiers.
///
/// Scripts branch on the exit code, agents on the string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Database (exit 2)
    NotInitialized,
    AlreadyInitialized,
    DatabaseError,

    // Not Found (exit 3)
    EntryNotFound,

    // Validation (exit 4)
    ValidationFailed,
    UnsupportedFormat,
    InvalidArgument,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
    CsvError,
    EncodingError,

    // Internal (exit 1)
    InternalError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::NotInitialized => "NOT_INITIALIZED",
            Self::AlreadyInitialized => "ALREADY_INITIALIZED",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::EntryNotFound => "ENTRY_NOT_FOUND",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::UnsupportedFormat => "UNSUPPORTED_FORMAT",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::CsvError => "CSV_ERROR",
            Self::EncodingError => "ENCODING_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Category-based exit code (1-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::InternalError => 1,
            Self::NotInitialized | Self::AlreadyInitialized | Self::DatabaseError => 2,
            Self::EntryNotFound => 3,
            Self::ValidationFailed | Self::UnsupportedFormat | Self::InvalidArgument => 4,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError | Self::CsvError | Self::EncodingError => 8,
        }
    }

    /// Whether an agent should retry with corrected input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed
                | Self::UnsupportedFormat
                | Self::InvalidArgument
                | Self::EncodingError
                | Self::DatabaseError
        )
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in qna operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Not initialized: run `qna init` first")]
    NotInitialized,

    #[error("Already initialized at {path}")]
    AlreadyInitialized { path: PathBuf },

    #[error("Entry not found: {id}")]
    EntryNotFound { id: String },

    /// A candidate record is missing required fields or carries bad values.
    ///
    /// `index` is the 0-based position of the record in its payload.
    #[error("Invalid record #{index}: {message}")]
    Validation { index: usize, message: String },

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Shorthand for a validation failure on the record at `index`.
    pub fn validation(index: usize, message: impl Into<String>) -> Self {
        Self::Validation {
            index,
            message: message.into(),
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::NotInitialized => ErrorCode::NotInitialized,
            Self::AlreadyInitialized { .. } => ErrorCode::AlreadyInitialized,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::EntryNotFound { .. } => ErrorCode::EntryNotFound,
            Self::Validation { .. } => ErrorCode::ValidationFailed,
            Self::UnsupportedFormat(_) => ErrorCode::UnsupportedFormat,
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
            Self::Csv(_) => ErrorCode::CsvError,
            Self::Encoding(_) => ErrorCode::EncodingError,
            Self::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// Context-aware recovery hint for agents and humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::NotInitialized => Some("Run `qna init` to create the database".to_string()),

            Self::AlreadyInitialized { path } => Some(format!(
                "Database already exists at {}. Use `--force` to reinitialize.",
                path.display()
            )),

            Self::EntryNotFound { id } => Some(format!(
                "No entry with ID '{id}'. Use `qna entry list` to see available entries."
            )),

            Self::Validation { message, .. } => {
                if message.contains("action") {
                    Some("Valid actions: text, redirect, text_redirect".to_string())
                } else if message.contains("question") {
                    Some(
                        "Each record needs a non-empty `question` string or `questions` array"
                            .to_string(),
                    )
                } else {
                    None
                }
            }

            Self::UnsupportedFormat(_) => {
                Some("Supported formats: json, csv. Pass `--format` explicitly.".to_string())
            }

            Self::Encoding(_) => Some(
                "Use `--charset utf-8` (or `utf-8-bom`) for text outside Latin-1".to_string(),
            ),

            Self::Database(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Csv(_)
            | Self::InvalidArgument(_)
            | Self::Config(_)
            | Self::Other(_) => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    ///
    /// Includes error code, message, retryability, exit code, and
    /// optional recovery hint. Agents parse this instead of stderr text.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_by_category() {
        assert_eq!(Error::NotInitialized.exit_code(), 2);
        assert_eq!(
            Error::EntryNotFound {
                id: "qna_1".into()
            }
            .exit_code(),
            3
        );
        assert_eq!(Error::validation(0, "missing answer").exit_code(), 4);
        assert_eq!(Error::UnsupportedFormat("xml".into()).exit_code(), 4);
        assert_eq!(Error::Encoding("bad".into()).exit_code(), 8);
    }

    #[test]
    fn test_structured_json_includes_hint() {
        let err = Error::validation(3, "unknown action 'email'");
        let json = err.to_structured_json();

        assert_eq!(json["error"]["code"], "VALIDATION_FAILED");
        assert_eq!(json["error"]["retryable"], true);
        assert!(json["error"]["message"]
            .as_str()
            .unwrap()
            .contains("record #3"));
        assert!(json["error"]["hint"].as_str().unwrap().contains("text_redirect"));
    }

    #[test]
    fn test_not_found_hint_mentions_list() {
        let err = Error::EntryNotFound {
            id: "qna_missing".into(),
        };
        assert!(err.hint().unwrap().contains("qna entry list"));
    }
}
