//! qna - question/answer knowledge store for conversational agents
//!
//! This crate provides the core functionality for the `qna` CLI tool.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface using clap
//! - [`model`] - Data types (Entry, Answer, Action)
//! - [`storage`] - SQLite database layer and the `EntryStore` trait
//! - [`transfer`] - JSON/CSV import and export with deduplication
//! - [`gate`] - Interception gate consulted before question matching
//! - [`config`] - Paths and settings
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gate;
pub mod model;
pub mod storage;
pub mod transfer;

pub use error::{Error, Result};

/// Global silent mode flag for `--silent` output.
///
/// When set, create/mutate commands print only the ID
/// instead of full output. Avoids threading a `silent` bool
/// through every handler signature.
pub static SILENT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Global dry-run flag for `--dry-run`.
///
/// When set, mutate commands preview what would happen without writing.
pub static DRY_RUN: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Global CSV output flag (set when `--format csv`).
pub static CSV_OUTPUT: std::sync::atomic::AtomicBool = std::sync::atomic::AtomicBool::new(false);

/// Check if silent mode is active.
#[inline]
pub fn is_silent() -> bool {
    SILENT.load(std::sync::atomic::Ordering::Relaxed)
}

/// Check if dry-run mode is active.
#[inline]
pub fn is_dry_run() -> bool {
    DRY_RUN.load(std::sync::atomic::Ordering::Relaxed)
}

/// Check if CSV output is requested.
#[inline]
pub fn is_csv() -> bool {
    CSV_OUTPUT.load(std::sync::atomic::Ordering::Relaxed)
}
