//! Import command implementation.

use crate::cli::ImportArgs;
use crate::error::Result;
use crate::transfer::{Charset, Format, ImportOptions, ImportOutcome, ImportPayload, Importer};
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

use super::open_storage;

/// Execute the import command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or decoded, any record is
/// invalid, or a save fails.
pub fn execute(
    args: &ImportArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let format = match args.from {
        Some(format) => format,
        None => Format::from_path(&args.file)?,
    };
    let charset = args.charset.unwrap_or_default();
    let text = charset.decode(&fs::read(&args.file)?)?;

    let mut storage = open_storage(db_path, actor)?;
    let options = ImportOptions {
        replace: args.replace,
        dry_run: crate::is_dry_run(),
    };

    let outcome = Importer::new(&mut storage)
        .with_options(options)
        .import(ImportPayload::Text { format, text })?;

    if crate::is_silent() {
        for id in &outcome.ids {
            println!("{id}");
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string(&outcome)?);
    } else {
        print_summary(&outcome, format, charset);
    }

    Ok(())
}

fn print_summary(outcome: &ImportOutcome, format: Format, charset: Charset) {
    if let Some(pending) = outcome.pending {
        println!("{}", "Dry run: nothing written".yellow());
        if outcome.deleted > 0 {
            println!("  Would delete: {}", outcome.deleted);
        }
        println!("  Would create: {pending}");
        println!("  Duplicates:   {}", outcome.skipped);
        return;
    }

    println!("Imported {format} ({charset})");
    if outcome.deleted > 0 {
        println!("  Deleted: {}", outcome.deleted);
    }
    println!("  Created: {}", outcome.created().to_string().green());
    println!("  Skipped: {} (already present)", outcome.skipped);
}
