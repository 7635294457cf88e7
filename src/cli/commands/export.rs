//! Export command implementation.

use crate::cli::ExportArgs;
use crate::config::load_settings;
use crate::error::Result;
use crate::transfer::{ExportOptions, Exporter, Format};
use std::io::Write;
use std::path::PathBuf;

use super::open_storage;

/// Execute the export command.
///
/// Without a file the export is written to stdout and `--json` has no
/// effect on it.
///
/// # Errors
///
/// Returns an error if settings are invalid, the charset cannot represent
/// the data, or the file cannot be written.
pub fn execute(args: &ExportArgs, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let settings = load_settings()?;

    let format = match (args.to, args.file.as_deref()) {
        (Some(format), _) => format,
        (None, Some(path)) => Format::from_path(path)?,
        (None, None) => Format::Json,
    };
    let options = ExportOptions {
        format,
        flat: args.flat || (settings.export_flat && !args.grouped),
        charset: args.charset.unwrap_or(settings.csv_charset),
    };

    let storage = open_storage(db_path, None)?;
    let exporter = Exporter::new(&storage);

    let Some(path) = args.file.as_deref() else {
        let (bytes, _) = exporter.render(options)?;
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(&bytes)?;
        stdout.flush()?;
        return Ok(());
    };

    if crate::is_dry_run() {
        let (_, stats) = exporter.render(options)?;
        println!(
            "Would write {} record(s) ({} bytes) to {}",
            stats.records,
            stats.bytes,
            path.display()
        );
        return Ok(());
    }

    let stats = exporter.export_to_file(path, options)?;

    if crate::is_silent() {
        println!("{}", path.display());
    } else if json {
        let output = serde_json::json!({
            "path": path,
            "stats": stats,
        });
        println!("{output}");
    } else {
        println!(
            "Exported {} entries ({} records, {}) to {}",
            stats.entries,
            stats.records,
            stats.format,
            path.display()
        );
    }

    Ok(())
}
