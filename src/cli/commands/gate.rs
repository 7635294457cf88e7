//! Gate command implementations.

use crate::cli::GateCommands;
use crate::config::load_settings;
use crate::error::{Error, Result};
use crate::gate::{
    ConversationEvent, ConversationState, GateDecision, InterceptRules, InterceptionGate,
    RulePredicate,
};
use colored::Colorize;
use serde::Serialize;

#[derive(Serialize)]
struct CheckOutput {
    decision: GateDecision,
    #[serde(skip_serializing_if = "Option::is_none")]
    rule: Option<String>,
}

/// Execute gate commands.
pub fn execute(command: &GateCommands, json: bool) -> Result<()> {
    let rules = load_settings()?.intercept;

    match command {
        GateCommands::Check { event, state } => check(rules, event, state.as_deref(), json),
        GateCommands::Rules => show_rules(&rules, json),
    }
}

fn check(rules: InterceptRules, event: &str, state: Option<&str>, json: bool) -> Result<()> {
    let event: ConversationEvent = serde_json::from_str(event)
        .map_err(|e| Error::InvalidArgument(format!("--event: {e}")))?;
    let state: ConversationState = match state {
        Some(raw) => serde_json::from_str(raw)
            .map_err(|e| Error::InvalidArgument(format!("--state: {e}")))?,
        None => ConversationState::default(),
    };

    let predicate = RulePredicate::new(rules);
    let rule = predicate.matching_rule(&event, &state);

    let gate = InterceptionGate::new();
    gate.register(predicate)?;

    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| Error::Other(format!("Failed to create async runtime: {e}")))?;
    let decision = rt.block_on(gate.evaluate(&event, &state));

    if json {
        println!("{}", serde_json::to_string(&CheckOutput { decision, rule })?);
    } else {
        match (decision, rule) {
            (GateDecision::Skip, Some(rule)) => {
                println!("{} (rule {rule})", "skip".yellow());
            }
            (GateDecision::Skip, None) => println!("{}", "skip".yellow()),
            (GateDecision::Process, _) => println!("{}", "process".green()),
        }
    }

    Ok(())
}

fn show_rules(rules: &InterceptRules, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(rules)?);
        return Ok(());
    }

    if rules.is_empty() {
        println!("No intercept rules configured; every event is processed.");
        return Ok(());
    }

    let list = |items: &[String]| {
        if items.is_empty() {
            "-".to_string()
        } else {
            items.join(", ")
        }
    };
    println!("Skip channels:    {}", list(&rules.skip_channels));
    println!("Skip event types: {}", list(&rules.skip_event_types));
    println!(
        "Skip when flag:   {}",
        rules.skip_when_flag.as_deref().unwrap_or("-")
    );
    Ok(())
}
