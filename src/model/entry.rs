//! Q&A entry model.
//!
//! An entry pairs one or more surface-form questions with an answer. How the
//! answer is delivered is selected by its [`Action`]; the payload for each
//! action lives in the matching [`Answer`] variant so that a text answer and
//! a redirect target can never be confused.

use serde::{Deserialize, Serialize};

/// How an entry's answer is delivered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Reply with free text.
    Text,
    /// Jump to another conversational flow (and optionally a node in it).
    Redirect,
    /// Reply with text, then jump.
    TextRedirect,
}

impl Action {
    /// Get the string representation for storage and interchange.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Redirect => "redirect",
            Self::TextRedirect => "text_redirect",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "redirect" => Ok(Self::Redirect),
            "text_redirect" => Ok(Self::TextRedirect),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// Answer payload, discriminated by action.
///
/// Serialized with an `action` tag and camelCase fields:
/// `{"action":"text_redirect","answerText":"Hi","redirectFlow":"main.flow.json","redirectNode":"entry"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Answer {
    Text {
        answer_text: String,
    },
    Redirect {
        redirect_flow: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        redirect_node: Option<String>,
    },
    TextRedirect {
        answer_text: String,
        redirect_flow: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        redirect_node: Option<String>,
    },
}

impl Answer {
    /// Build an answer from loose parts, checking that the fields the action
    /// needs are present and non-blank.
    ///
    /// Fields the action does not use are ignored.
    ///
    /// # Errors
    ///
    /// Returns a message naming the missing field.
    pub fn from_parts(
        action: Action,
        answer_text: Option<&str>,
        redirect_flow: Option<&str>,
        redirect_node: Option<&str>,
    ) -> Result<Self, String> {
        let text = || {
            non_blank(answer_text)
                .ok_or_else(|| format!("action '{action}' requires a non-empty answer"))
        };
        let flow = || {
            non_blank(redirect_flow)
                .ok_or_else(|| format!("action '{action}' requires a redirect flow"))
        };
        let node = non_blank(redirect_node);

        Ok(match action {
            Action::Text => Self::Text { answer_text: text()? },
            Action::Redirect => Self::Redirect {
                redirect_flow: flow()?,
                redirect_node: node,
            },
            Action::TextRedirect => Self::TextRedirect {
                answer_text: text()?,
                redirect_flow: flow()?,
                redirect_node: node,
            },
        })
    }

    /// The action this payload belongs to.
    #[must_use]
    pub const fn action(&self) -> Action {
        match self {
            Self::Text { .. } => Action::Text,
            Self::Redirect { .. } => Action::Redirect,
            Self::TextRedirect { .. } => Action::TextRedirect,
        }
    }

    /// Text answer, if the action carries one.
    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        match self {
            Self::Text { answer_text } | Self::TextRedirect { answer_text, .. } => {
                Some(answer_text)
            }
            Self::Redirect { .. } => None,
        }
    }

    /// Redirect target `(flow, node)`, if the action carries one.
    #[must_use]
    pub fn redirect(&self) -> Option<(&str, Option<&str>)> {
        match self {
            Self::Redirect {
                redirect_flow,
                redirect_node,
            }
            | Self::TextRedirect {
                redirect_flow,
                redirect_node,
                ..
            } => Some((redirect_flow, redirect_node.as_deref())),
            Self::Text { .. } => None,
        }
    }

    fn validate(&self) -> Result<(), String> {
        let (text, flow, node) = match self.redirect() {
            Some((flow, node)) => (self.answer_text(), Some(flow), node),
            None => (self.answer_text(), None, None),
        };
        Self::from_parts(self.action(), text, flow, node).map(|_| ())
    }
}

/// The value unchanged, unless it is missing or only whitespace.
fn non_blank(value: Option<&str>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty()).map(String::from)
}

/// Everything about an entry except its identity and timestamps.
///
/// This is what callers hand to the store on save, and what import
/// candidates are converted into.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryData {
    /// Surface-form triggers, in display order.
    pub questions: Vec<String>,

    #[serde(flatten)]
    pub answer: Answer,

    /// Disabled entries are kept but not offered for matching.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

impl EntryData {
    /// Create enabled entry data.
    #[must_use]
    pub fn new(questions: Vec<String>, answer: Answer) -> Self {
        Self {
            questions,
            answer,
            enabled: true,
        }
    }

    /// Check the structural invariants: at least one question, no blank
    /// questions, and a complete answer payload.
    ///
    /// # Errors
    ///
    /// Returns a human-readable description of the first violation.
    pub fn validate(&self) -> Result<(), String> {
        if self.questions.is_empty() {
            return Err("at least one question is required".to_string());
        }
        if self.questions.iter().any(|q| q.trim().is_empty()) {
            return Err("questions must not be blank".to_string());
        }
        self.answer.validate()
    }
}

/// A persisted entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Store-assigned identifier (`qna_` prefix).
    pub id: String,

    #[serde(flatten)]
    pub data: EntryData,

    /// Creation timestamp (Unix milliseconds)
    pub created_at: i64,

    /// Last update timestamp (Unix milliseconds)
    pub updated_at: i64,
}

impl Entry {
    /// Generate a fresh entry ID.
    #[must_use]
    pub fn new_id() -> String {
        format!("qna_{}", &uuid::Uuid::new_v4().simple().to_string()[..12])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_round_trip() {
        for action in [Action::Text, Action::Redirect, Action::TextRedirect] {
            assert_eq!(action.as_str().parse::<Action>().unwrap(), action);
        }
        assert_eq!(" TEXT ".parse::<Action>().unwrap(), Action::Text);
        assert!("email".parse::<Action>().is_err());
    }

    #[test]
    fn test_answer_from_parts_ignores_unused_fields() {
        let answer = Answer::from_parts(Action::Text, Some("Hello"), Some("main"), None).unwrap();
        assert_eq!(
            answer,
            Answer::Text {
                answer_text: "Hello".to_string()
            }
        );
        assert!(answer.redirect().is_none());
    }

    #[test]
    fn test_answer_from_parts_requires_flow() {
        let err = Answer::from_parts(Action::TextRedirect, Some("Hi"), Some("  "), None)
            .unwrap_err();
        assert!(err.contains("redirect flow"));
    }

    #[test]
    fn test_entry_data_serializes_with_action_tag() {
        let data = EntryData::new(
            vec!["where is my order".to_string()],
            Answer::TextRedirect {
                answer_text: "Let me check".to_string(),
                redirect_flow: "orders.flow.json".to_string(),
                redirect_node: Some("lookup".to_string()),
            },
        );

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["action"], "text_redirect");
        assert_eq!(json["answerText"], "Let me check");
        assert_eq!(json["redirectFlow"], "orders.flow.json");
        assert_eq!(json["redirectNode"], "lookup");
        assert_eq!(json["enabled"], true);

        let back: EntryData = serde_json::from_value(json).unwrap();
        assert_eq!(back, data);
    }

    #[test]
    fn test_validate_rejects_blank_question() {
        let data = EntryData::new(
            vec!["ok".to_string(), " ".to_string()],
            Answer::Text {
                answer_text: "x".to_string(),
            },
        );
        assert!(data.validate().is_err());

        let empty = EntryData::new(
            vec![],
            Answer::Text {
                answer_text: "x".to_string(),
            },
        );
        assert!(empty.validate().unwrap_err().contains("at least one"));
    }

    #[test]
    fn test_new_id_prefix() {
        let id = Entry::new_id();
        assert!(id.starts_with("qna_"));
        assert_eq!(id.len(), 16);
    }
}
