//! CLI definitions using clap.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::model::Action;
use crate::transfer::{Charset, Format};

/// Output format for list/query commands.
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table (default)
    #[default]
    Table,
    /// JSON (same as --json)
    Json,
    /// Comma-separated values
    Csv,
}

pub mod commands;

/// qna - question/answer knowledge store for conversational agents
#[derive(Parser, Debug)]
#[command(name = "qna", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.qna/data/qna.db)
    #[arg(long, global = true, env = "QNA_DB")]
    pub db: Option<PathBuf>,

    /// Actor name for audit trail
    #[arg(long, global = true, env = "QNA_ACTOR")]
    pub actor: Option<String>,

    /// Output as JSON (for agent integration)
    #[arg(long, alias = "robot", global = true)]
    pub json: bool,

    /// Output format (table, json, csv)
    #[arg(long, value_enum, global = true, default_value_t)]
    pub format: OutputFormat,

    /// Output only the ID (for scripting)
    #[arg(long, global = true)]
    pub silent: bool,

    /// Preview changes without writing to the database
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the qna database
    Init {
        /// Overwrite existing database
        #[arg(long)]
        force: bool,
    },

    /// Show version information
    Version,

    /// Create, inspect, and edit entries
    Entry {
        #[command(subcommand)]
        command: EntryCommands,
    },

    /// Import entries from a JSON or CSV file
    Import(ImportArgs),

    /// Export every entry to JSON or CSV
    Export(ExportArgs),

    /// Evaluate the interception gate
    Gate {
        #[command(subcommand)]
        command: GateCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Supported shells for completions.
#[derive(clap::ValueEnum, Clone, Debug)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

// ============================================================================
// Entry Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum EntryCommands {
    /// Add an entry
    Add(EntryAddArgs),

    /// Show one entry
    Get {
        /// Entry ID
        id: String,
    },

    /// List entries
    List {
        /// Maximum entries to show
        #[arg(short, long)]
        limit: Option<u32>,

        /// Entries to skip
        #[arg(long)]
        offset: Option<u32>,
    },

    /// Replace fields of an entry
    Update(EntryUpdateArgs),

    /// Delete an entry
    Delete {
        /// Entry ID
        id: String,
    },

    /// Enable an entry for matching
    Enable {
        /// Entry ID
        id: String,
    },

    /// Disable an entry without deleting it
    Disable {
        /// Entry ID
        id: String,
    },

    /// Show the audit history of an entry
    History {
        /// Entry ID
        id: String,

        /// Maximum events to show
        #[arg(short, long, default_value_t = 20)]
        limit: u32,
    },
}

#[derive(Args, Debug)]
pub struct EntryAddArgs {
    /// Question phrasings (at least one)
    #[arg(required = true, num_args = 1..)]
    pub questions: Vec<String>,

    /// Answer action: text, redirect, text_redirect
    #[arg(long, default_value = "text")]
    pub action: Action,

    /// Answer text (text and text_redirect)
    #[arg(short, long)]
    pub answer: Option<String>,

    /// Redirect flow (redirect and text_redirect)
    #[arg(long)]
    pub flow: Option<String>,

    /// Redirect node within the flow
    #[arg(long)]
    pub node: Option<String>,

    /// Store the entry disabled
    #[arg(long)]
    pub disabled: bool,
}

#[derive(Args, Debug)]
pub struct EntryUpdateArgs {
    /// Entry ID
    pub id: String,

    /// Replace all questions (repeat for several)
    #[arg(long = "question", short = 'Q')]
    pub questions: Vec<String>,

    /// New answer action
    #[arg(long)]
    pub action: Option<Action>,

    /// New answer text
    #[arg(short, long)]
    pub answer: Option<String>,

    /// New redirect flow
    #[arg(long)]
    pub flow: Option<String>,

    /// New redirect node
    #[arg(long, conflicts_with = "clear_node")]
    pub node: Option<String>,

    /// Remove the redirect node
    #[arg(long)]
    pub clear_node: bool,
}

// ============================================================================
// Import / Export
// ============================================================================

#[derive(Args, Debug)]
pub struct ImportArgs {
    /// File to import
    pub file: PathBuf,

    /// Input format (default: from file extension)
    #[arg(long = "from")]
    pub from: Option<Format>,

    /// Input text encoding (default: utf-8)
    #[arg(long)]
    pub charset: Option<Charset>,

    /// Delete all existing entries before importing
    #[arg(long)]
    pub replace: bool,
}

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output file (default: stdout)
    pub file: Option<PathBuf>,

    /// Output format (default: from file extension, else json)
    #[arg(long = "to")]
    pub to: Option<Format>,

    /// One record per question (CSV is always flat)
    #[arg(long, conflicts_with = "grouped")]
    pub flat: bool,

    /// One record per entry, overriding `exportFlat` in settings
    #[arg(long)]
    pub grouped: bool,

    /// CSV text encoding: utf-8, utf-8-bom, latin1
    #[arg(long)]
    pub charset: Option<Charset>,
}

// ============================================================================
// Gate Commands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum GateCommands {
    /// Decide whether an event would reach matching under the configured rules
    Check {
        /// Event as JSON: {"channel","type","sessionId","userId","text"}
        #[arg(long)]
        event: String,

        /// Conversation state as a JSON object
        #[arg(long)]
        state: Option<String>,
    },

    /// Show the configured intercept rules
    Rules,
}
