//! Rule-based predicate configured from settings.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::predicate::InterceptPredicate;
use super::state::{ConversationEvent, ConversationState};
use crate::error::Result;

/// Conditions under which matching is skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InterceptRules {
    /// Channels whose events never reach matching.
    pub skip_channels: Vec<String>,
    /// Event types (`quick_reply`, `postback`, ...) that never reach matching.
    pub skip_event_types: Vec<String>,
    /// Dotted state path; when it holds `true` matching is skipped.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skip_when_flag: Option<String>,
}

impl InterceptRules {
    /// No rules configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skip_channels.is_empty()
            && self.skip_event_types.is_empty()
            && self.skip_when_flag.is_none()
    }
}

/// Predicate that answers from [`InterceptRules`].
///
/// Returns `Some(false)` when a rule matches and `None` otherwise, so it
/// never forces processing on its own.
#[derive(Debug, Clone)]
pub struct RulePredicate {
    rules: InterceptRules,
}

impl RulePredicate {
    #[must_use]
    pub fn new(rules: InterceptRules) -> Self {
        Self { rules }
    }

    /// Name of the first rule that matches, if any.
    #[must_use]
    pub fn matching_rule(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> Option<String> {
        let eq = |a: &String, b: &str| a.eq_ignore_ascii_case(b);

        if self.rules.skip_channels.iter().any(|c| eq(c, &event.channel)) {
            return Some(format!("channel:{}", event.channel));
        }
        if self
            .rules
            .skip_event_types
            .iter()
            .any(|t| eq(t, &event.event_type))
        {
            return Some(format!("event_type:{}", event.event_type));
        }
        if let Some(flag) = self.rules.skip_when_flag.as_deref() {
            if state.flag(flag) {
                return Some(format!("flag:{flag}"));
            }
        }
        None
    }
}

impl InterceptPredicate for RulePredicate {
    async fn should_process(
        &self,
        event: &ConversationEvent,
        state: &ConversationState,
    ) -> Result<Option<bool>> {
        Ok(self.matching_rule(event, state).map(|rule| {
            debug!(%rule, session = %event.session_id, "Intercept rule matched");
            false
        }))
    }
}
