//! qna CLI entry point.

use clap::Parser;
use qna::cli::commands;
use qna::cli::{Cli, Commands, OutputFormat};
use qna::error::Error;
use std::process::ExitCode;

/// Rewrite named flags to positional args for agent ergonomics.
///
/// Agents naturally generate `--id qna_123` instead of a positional
/// `qna_123`. This preprocessor transparently converts known flag
/// patterns so both forms work.
fn preprocess_args(args: impl Iterator<Item = String>) -> Vec<String> {
    // Only flags that shadow positional args belong here; named flags
    // like --answer already work via clap.
    const POSITIONAL_ALIASES: &[&str] = &[
        "--id",   // entry get/update/delete/enable/disable/history
        "--file", // import, export
    ];

    let mut result = Vec::new();
    let mut iter = args.peekable();

    while let Some(arg) = iter.next() {
        if POSITIONAL_ALIASES.contains(&arg.as_str()) {
            // Strip the flag, keep the value
            if let Some(value) = iter.next() {
                result.push(value);
            }
        } else if let Some(flag) = POSITIONAL_ALIASES
            .iter()
            .find(|f| arg.starts_with(&format!("{f}=")))
        {
            // Handle --flag=value form
            result.push(arg[flag.len() + 1..].to_string());
        } else {
            result.push(arg);
        }
    }

    result
}

fn main() -> ExitCode {
    let args = preprocess_args(std::env::args());
    let cli = Cli::parse_from(args);

    if cli.silent {
        qna::SILENT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.dry_run {
        qna::DRY_RUN.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.format == OutputFormat::Csv {
        qna::CSV_OUTPUT.store(true, std::sync::atomic::Ordering::Relaxed);
    }
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Set up tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    // Resolve effective JSON mode: --json OR --format json OR non-TTY stdout
    let json = cli.json
        || cli.format == OutputFormat::Json
        || !std::io::IsTerminal::is_terminal(&std::io::stdout());

    match run(&cli, json) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if json {
                eprintln!("{}", e.to_structured_json());
            } else if !cli.quiet {
                if let Some(hint) = e.hint() {
                    eprintln!("Error: {e}\n  Hint: {hint}");
                } else {
                    eprintln!("Error: {e}");
                }
            }
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    if quiet {
        return;
    }

    // Honor RUST_LOG if set, otherwise use verbosity flag
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug,rusqlite=info"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: &Cli, json: bool) -> Result<(), Error> {
    let db = cli.db.as_ref();
    let actor = cli.actor.as_deref();

    match &cli.command {
        Commands::Init { force } => commands::init::execute(db, *force, json),
        Commands::Version => commands::version::execute(json),
        Commands::Entry { command } => commands::entry::execute(command, db, actor, json),
        Commands::Import(args) => commands::import::execute(args, db, actor, json),
        Commands::Export(args) => commands::export::execute(args, db, json),
        Commands::Gate { command } => commands::gate::execute(command, json),
        Commands::Completions { shell } => commands::completions::execute(shell),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        preprocess_args(list.iter().map(ToString::to_string))
    }

    #[test]
    fn test_preprocess_strips_positional_aliases() {
        assert_eq!(
            args(&["qna", "entry", "get", "--id", "qna_1"]),
            vec!["qna", "entry", "get", "qna_1"]
        );
        assert_eq!(
            args(&["qna", "import", "--file=faq.csv", "--replace"]),
            vec!["qna", "import", "faq.csv", "--replace"]
        );
        assert_eq!(
            args(&["qna", "entry", "add", "hi", "--answer", "hello"]),
            vec!["qna", "entry", "add", "hi", "--answer", "hello"]
        );
    }
}
