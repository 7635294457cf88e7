//! Conversation events and per-conversation state.

use std::collections::HashMap;
use std::future::Future;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

fn default_event_type() -> String {
    "text".to_string()
}

/// An incoming conversational event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEvent {
    /// Messaging channel (`web`, `slack`, ...).
    #[serde(default)]
    pub channel: String,
    #[serde(default = "default_event_type", alias = "type")]
    pub event_type: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default, alias = "target")]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ConversationEvent {
    /// A text message event.
    #[must_use]
    pub fn text(channel: &str, session_id: &str, user_id: &str, text: &str) -> Self {
        Self {
            channel: channel.to_string(),
            event_type: default_event_type(),
            session_id: session_id.to_string(),
            user_id: user_id.to_string(),
            text: Some(text.to_string()),
        }
    }
}

/// Free-form state attached to a conversation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationState(pub Map<String, Value>);

impl ConversationState {
    /// Look up a value by dotted path (`session.handoff`).
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = self.0.get(parts.next()?)?;
        parts.try_fold(first, |value, key| value.get(key))
    }

    /// Whether the value at `path` is boolean `true`.
    #[must_use]
    pub fn flag(&self, path: &str) -> bool {
        matches!(self.get(path), Some(Value::Bool(true)))
    }

    /// Set a top-level key.
    pub fn set(&mut self, key: &str, value: Value) {
        self.0.insert(key.to_string(), value);
    }
}

/// Source of conversation state for the interception stage.
pub trait StateManager: Send + Sync {
    /// State for a session/user pair. Unknown pairs get an empty state.
    fn get_state(
        &self,
        session_id: &str,
        user_id: &str,
    ) -> impl Future<Output = Result<ConversationState>> + Send;
}

/// In-process state manager.
#[derive(Debug, Default)]
pub struct MemoryStateManager {
    states: RwLock<HashMap<(String, String), ConversationState>>,
}

impl MemoryStateManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the state for a session/user pair, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the lock is poisoned.
    pub fn set_state(&self, session_id: &str, user_id: &str, state: ConversationState) -> Result<()> {
        self.states
            .write()
            .map_err(|_| Error::Other("state lock poisoned".to_string()))?
            .insert((session_id.to_string(), user_id.to_string()), state);
        Ok(())
    }
}

impl StateManager for MemoryStateManager {
    async fn get_state(&self, session_id: &str, user_id: &str) -> Result<ConversationState> {
        let states = self
            .states
            .read()
            .map_err(|_| Error::Other("state lock poisoned".to_string()))?;
        Ok(states
            .get(&(session_id.to_string(), user_id.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}
