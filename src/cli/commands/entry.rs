//! Entry command implementations.

use crate::cli::{EntryAddArgs, EntryCommands, EntryUpdateArgs};
use crate::error::{Error, Result};
use crate::model::{Answer, Entry, EntryData};
use crate::storage::events::entry_history;
use crate::storage::{EntryStore, Page, SqliteStorage};
use crate::transfer::to_export_record;
use colored::Colorize;
use serde::Serialize;
use std::path::PathBuf;

use super::open_storage;

/// Output for entry list.
#[derive(Serialize)]
struct EntryListOutput {
    entries: Vec<Entry>,
    count: usize,
    total: usize,
}

/// Output for mutations that only report an ID.
#[derive(Serialize)]
struct EntryIdOutput<'a> {
    id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    enabled: Option<bool>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    deleted: bool,
}

#[derive(Serialize)]
struct HistoryItem {
    event: &'static str,
    actor: String,
    created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_value: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_value: Option<serde_json::Value>,
}

/// Execute entry commands.
pub fn execute(
    command: &EntryCommands,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    match command {
        EntryCommands::Add(args) => add(args, db_path, actor, json),
        EntryCommands::Get { id } => get(id, db_path, json),
        EntryCommands::List { limit, offset } => list(Page::new(*limit, *offset), db_path, json),
        EntryCommands::Update(args) => update(args, db_path, actor, json),
        EntryCommands::Delete { id } => delete(id, db_path, actor, json),
        EntryCommands::Enable { id } => set_enabled(id, true, db_path, actor, json),
        EntryCommands::Disable { id } => set_enabled(id, false, db_path, actor, json),
        EntryCommands::History { id, limit } => history(id, *limit, db_path, json),
    }
}

fn add(args: &EntryAddArgs, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let answer = Answer::from_parts(
        args.action,
        args.answer.as_deref().map(str::trim),
        args.flow.as_deref().map(str::trim),
        args.node.as_deref().map(str::trim),
    )
    .map_err(Error::InvalidArgument)?;

    let mut data = EntryData::new(
        args.questions.iter().map(|q| q.trim().to_string()).collect(),
        answer,
    );
    data.enabled = !args.disabled;
    data.validate().map_err(Error::InvalidArgument)?;

    let mut storage = open_storage(db_path, actor)?;

    if crate::is_dry_run() {
        println!(
            "Would add {} entry with {} question(s)",
            data.answer.action(),
            data.questions.len()
        );
        return Ok(());
    }

    let id = storage.save(&data, None)?;

    if crate::is_silent() {
        println!("{id}");
        return Ok(());
    }

    if json {
        let entry = storage.get(&id)?;
        println!("{}", serde_json::to_string(&entry)?);
    } else {
        println!("{} {id}", "Added entry".green());
    }

    Ok(())
}

fn get(id: &str, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path, None)?;
    let entry = storage.get(id)?;

    if json {
        println!("{}", serde_json::to_string(&entry)?);
    } else {
        print_entry(&entry);
    }

    Ok(())
}

fn list(page: Page, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage = open_storage(db_path, None)?;
    let entries = storage.list(page)?;
    let total = storage.count()?;

    if crate::is_csv() {
        let mut writer = csv::Writer::from_writer(std::io::stdout().lock());
        writer.write_record(["id", "action", "enabled", "questions", "answer", "answer2"])?;
        for entry in &entries {
            let record = to_export_record(entry);
            let questions = entry.data.questions.join(" | ");
            writer.write_record([
                entry.id.as_str(),
                record.action.as_str(),
                if entry.data.enabled { "true" } else { "false" },
                questions.as_str(),
                record.answer.as_deref().unwrap_or_default(),
                record.answer2.as_deref().unwrap_or_default(),
            ])?;
        }
        writer.flush()?;
    } else if json {
        let output = EntryListOutput {
            count: entries.len(),
            entries,
            total,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if entries.is_empty() {
        println!("No entries found.");
    } else {
        println!("Entries ({} of {total}):", entries.len());
        println!();
        for entry in &entries {
            print_entry(entry);
            println!();
        }
    }

    Ok(())
}

fn update(
    args: &EntryUpdateArgs,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path, actor)?;
    let current = storage.get(&args.id)?.data;

    let (flow, node) = match current.answer.redirect() {
        Some((flow, node)) => (Some(flow), node),
        None => (None, None),
    };
    let node = if args.clear_node {
        None
    } else {
        args.node.as_deref().map(str::trim).or(node)
    };

    let answer = Answer::from_parts(
        args.action.unwrap_or_else(|| current.answer.action()),
        args.answer
            .as_deref()
            .map(str::trim)
            .or_else(|| current.answer.answer_text()),
        args.flow.as_deref().map(str::trim).or(flow),
        node,
    )
    .map_err(Error::InvalidArgument)?;

    let questions = if args.questions.is_empty() {
        current.questions.clone()
    } else {
        args.questions.iter().map(|q| q.trim().to_string()).collect()
    };

    let data = EntryData {
        questions,
        answer,
        enabled: current.enabled,
    };
    data.validate().map_err(Error::InvalidArgument)?;

    if crate::is_dry_run() {
        println!("Would update entry {}", args.id);
        return Ok(());
    }

    storage.save(&data, Some(&args.id))?;

    if crate::is_silent() {
        println!("{}", args.id);
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string(&storage.get(&args.id)?)?);
    } else {
        println!("{} {}", "Updated entry".green(), args.id);
    }

    Ok(())
}

fn delete(id: &str, db_path: Option<&PathBuf>, actor: Option<&str>, json: bool) -> Result<()> {
    let mut storage = open_storage(db_path, actor)?;

    if crate::is_dry_run() {
        // Surface NotFound even when previewing
        storage.get(id)?;
        println!("Would delete entry {id}");
        return Ok(());
    }

    storage.delete(id)?;

    if json {
        let output = EntryIdOutput {
            id,
            enabled: None,
            deleted: true,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if crate::is_silent() {
        println!("{id}");
    } else {
        println!("{} {id}", "Deleted entry".red());
    }

    Ok(())
}

fn set_enabled(
    id: &str,
    enabled: bool,
    db_path: Option<&PathBuf>,
    actor: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut storage = open_storage(db_path, actor)?;
    let mut data = storage.get(id)?.data;
    let verb = if enabled { "enable" } else { "disable" };

    if crate::is_dry_run() {
        println!("Would {verb} entry {id}");
        return Ok(());
    }

    if data.enabled != enabled {
        data.enabled = enabled;
        storage.save(&data, Some(id))?;
    }

    if json {
        let output = EntryIdOutput {
            id,
            enabled: Some(enabled),
            deleted: false,
        };
        println!("{}", serde_json::to_string(&output)?);
    } else if crate::is_silent() {
        println!("{id}");
    } else {
        println!("Entry {id} {verb}d");
    }

    Ok(())
}

fn history(id: &str, limit: u32, db_path: Option<&PathBuf>, json: bool) -> Result<()> {
    let storage: SqliteStorage = open_storage(db_path, None)?;
    let events = entry_history(storage.conn(), id, Some(limit))?;

    let parse = |value: Option<String>| value.and_then(|v| serde_json::from_str(&v).ok());

    if json {
        let items: Vec<HistoryItem> = events
            .into_iter()
            .map(|e| HistoryItem {
                event: e.event_type.as_str(),
                actor: e.actor,
                created_at: e.created_at,
                old_value: parse(e.old_value),
                new_value: parse(e.new_value),
            })
            .collect();
        println!("{}", serde_json::to_string(&items)?);
    } else if events.is_empty() {
        println!("No history for {id}.");
    } else {
        for event in &events {
            println!(
                "{}  {:<14} {}",
                format_timestamp(event.created_at).dimmed(),
                event.event_type.as_str(),
                event.actor
            );
        }
    }

    Ok(())
}

fn format_timestamp(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map_or_else(|| millis.to_string(), |t| t.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn print_entry(entry: &Entry) {
    let status = if entry.data.enabled {
        "enabled".green()
    } else {
        "disabled".yellow()
    };
    println!(
        "{}  {} {}",
        entry.id.bold(),
        format!("[{}]", entry.data.answer.action()).dimmed(),
        status
    );

    for question in &entry.data.questions {
        println!("  Q: {question}");
    }
    if let Some(text) = entry.data.answer.answer_text() {
        println!("  A: {text}");
    }
    if let Some((flow, node)) = entry.data.answer.redirect() {
        match node {
            Some(node) => println!("  → {flow} ({node})"),
            None => println!("  → {flow}"),
        }
    }
}
