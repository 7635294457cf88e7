//! Mapping between stored entries and their interchange shapes.
//!
//! Interchange records carry the answer in two generic columns:
//!
//! | action          | `answer`            | `answer2`           |
//! |-----------------|---------------------|---------------------|
//! | `text`          | text                | empty               |
//! | `redirect`      | `flow` or `flow#node` | empty             |
//! | `text_redirect` | text                | `flow` or `flow#node` |
//!
//! The `#` join is not escaped, so a flow name containing `#` does not
//! survive a round trip.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::model::{Action, Answer, Entry, EntryData};
use crate::storage::EntryRow;

/// Grouped interchange record: one per entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub questions: Vec<String>,
    pub action: String,
    pub answer: Option<String>,
    pub answer2: Option<String>,
}

/// Flat interchange record: one per question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatRecord {
    pub question: String,
    pub action: String,
    pub answer: Option<String>,
    pub answer2: Option<String>,
}

/// `questions` given either as an array or as a single string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(s) => vec![s],
            Self::Many(v) => v,
        }
    }
}

/// An import candidate as it arrives, before validation.
///
/// Accepts both interchange columns (`answer`/`answer2`) and explicit
/// redirect fields. Unknown keys such as `id` or `enabled` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, alias = "answerText", skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer2: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_flow: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_node: Option<String>,
}

impl From<FlatRecord> for RawRecord {
    fn from(flat: FlatRecord) -> Self {
        Self {
            question: Some(flat.question),
            action: Some(flat.action),
            answer: flat.answer,
            answer2: flat.answer2,
            ..Self::default()
        }
    }
}

impl From<ExportRecord> for RawRecord {
    fn from(record: ExportRecord) -> Self {
        Self {
            questions: Some(OneOrMany::Many(record.questions)),
            action: Some(record.action),
            answer: record.answer,
            answer2: record.answer2,
            ..Self::default()
        }
    }
}

/// Join a redirect target into its `flow#node` interchange form.
#[must_use]
pub fn encode_redirect(flow: &str, node: Option<&str>) -> String {
    if flow.contains('#') {
        warn!(flow, "Redirect flow contains '#'; it will not decode back unchanged");
    }
    match node.filter(|n| !n.is_empty()) {
        Some(node) => format!("{flow}#{node}"),
        None => flow.to_string(),
    }
}

/// Split a `flow#node` string on its first `#`.
///
/// An empty node after the `#` is treated as absent.
#[must_use]
pub fn decode_redirect(encoded: &str) -> (String, Option<String>) {
    match encoded.split_once('#') {
        Some((flow, node)) => {
            let node = node.trim();
            (
                flow.trim().to_string(),
                (!node.is_empty()).then(|| node.to_string()),
            )
        }
        None => (encoded.trim().to_string(), None),
    }
}

/// Grouped interchange record for a well-formed entry.
#[must_use]
pub fn to_export_record(entry: &Entry) -> ExportRecord {
    let answer = &entry.data.answer;
    let redirect = answer
        .redirect()
        .map(|(flow, node)| encode_redirect(flow, node));

    let (first, second) = match answer {
        Answer::Text { answer_text } => (Some(answer_text.clone()), None),
        Answer::Redirect { .. } => (redirect, None),
        Answer::TextRedirect { answer_text, .. } => (Some(answer_text.clone()), redirect),
    };

    ExportRecord {
        questions: entry.data.questions.clone(),
        action: answer.action().to_string(),
        answer: first,
        answer2: second,
    }
}

/// Grouped interchange record for any stored row.
///
/// Rows that no longer form a valid entry are exported field by field with
/// a warning instead of failing the export.
#[must_use]
pub fn export_row(row: &EntryRow) -> ExportRecord {
    match row.clone().into_entry() {
        Ok(entry) => to_export_record(&entry),
        Err(e) => {
            warn!(id = %row.id, error = %e, "Exporting malformed entry as stored");

            let redirect = row
                .redirect_flow
                .as_deref()
                .filter(|f| !f.trim().is_empty())
                .map(|flow| encode_redirect(flow, row.redirect_node.as_deref()));

            let (answer, answer2) = match row.answer_text.clone() {
                Some(text) => (Some(text), redirect),
                None => (redirect, None),
            };

            ExportRecord {
                questions: row.questions_lossy(),
                action: row.action.clone(),
                answer,
                answer2,
            }
        }
    }
}

/// One flat record per question, all other fields copied.
#[must_use]
pub fn flatten(record: &ExportRecord) -> Vec<FlatRecord> {
    record
        .questions
        .iter()
        .map(|question| FlatRecord {
            question: question.clone(),
            action: record.action.clone(),
            answer: record.answer.clone(),
            answer2: record.answer2.clone(),
        })
        .collect()
}

/// Validate a raw candidate and convert it to entry content.
///
/// `index` is the candidate's position in its payload and is reported in
/// validation errors. The result is always enabled.
///
/// # Errors
///
/// Returns `Error::Validation` naming the first problem found.
pub fn to_persisted_entry(index: usize, raw: RawRecord) -> Result<EntryData> {
    let questions = match (raw.questions, raw.question) {
        (Some(many), _) => many.into_vec(),
        (None, Some(one)) => vec![one],
        (None, None) => {
            return Err(Error::validation(index, "missing `question` or `questions`"));
        }
    };
    let questions: Vec<String> = questions.iter().map(|q| q.trim().to_string()).collect();

    let action: Action = raw
        .action
        .as_deref()
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| Error::validation(index, "missing action"))?
        .parse()
        .map_err(|e: String| Error::validation(index, e))?;

    let explicit_flow = raw
        .redirect_flow
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty());

    // Imported values are normalised the same way CSV cells are
    let answer = raw.answer.as_deref().map(str::trim);
    let (text, target) = match action {
        Action::Text => (answer, None),
        Action::Redirect => (None, answer),
        Action::TextRedirect => (answer, raw.answer2.as_deref()),
    };

    let (flow, node) = match explicit_flow {
        Some(flow) => (
            Some(flow.to_string()),
            raw.redirect_node.as_deref().map(|n| n.trim().to_string()),
        ),
        None => match target.filter(|t| !t.trim().is_empty()) {
            Some(encoded) => {
                let (flow, node) = decode_redirect(encoded);
                (Some(flow), node)
            }
            None => (None, None),
        },
    };

    let answer = Answer::from_parts(action, text, flow.as_deref(), node.as_deref())
        .map_err(|e| Error::validation(index, e))?;

    let data = EntryData::new(questions, answer);
    data.validate().map_err(|e| Error::validation(index, e))?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(questions: &[&str], answer: Answer) -> Entry {
        Entry {
            id: "qna_test".to_string(),
            data: EntryData::new(questions.iter().map(ToString::to_string).collect(), answer),
            created_at: 0,
            updated_at: 0,
        }
    }

    #[test]
    fn test_redirect_encoding() {
        let with_node = stored(
            &["q"],
            Answer::Redirect {
                redirect_flow: "F".to_string(),
                redirect_node: Some("N".to_string()),
            },
        );
        let record = to_export_record(&with_node);
        assert_eq!(record.action, "redirect");
        assert_eq!(record.answer.as_deref(), Some("F#N"));
        assert_eq!(record.answer2, None);

        let without_node = stored(
            &["q"],
            Answer::Redirect {
                redirect_flow: "F".to_string(),
                redirect_node: None,
            },
        );
        assert_eq!(to_export_record(&without_node).answer.as_deref(), Some("F"));
    }

    #[test]
    fn test_text_redirect_encoding() {
        let entry = stored(
            &["q"],
            Answer::TextRedirect {
                answer_text: "A".to_string(),
                redirect_flow: "F".to_string(),
                redirect_node: Some("N".to_string()),
            },
        );
        let record = to_export_record(&entry);
        assert_eq!(record.action, "text_redirect");
        assert_eq!(record.answer.as_deref(), Some("A"));
        assert_eq!(record.answer2.as_deref(), Some("F#N"));
    }

    #[test]
    fn test_encode_decode_are_inverse() {
        for (flow, node) in [("main.flow.json", Some("start")), ("main", None)] {
            let encoded = encode_redirect(flow, node);
            let (f, n) = decode_redirect(&encoded);
            assert_eq!(f, flow);
            assert_eq!(n.as_deref(), node);
        }

        // Splits on the first '#'
        assert_eq!(
            decode_redirect("a#b#c"),
            ("a".to_string(), Some("b#c".to_string()))
        );
        assert_eq!(decode_redirect("flow#"), ("flow".to_string(), None));
    }

    #[test]
    fn test_flatten_fans_out() {
        let entry = stored(
            &["one", "two", "three"],
            Answer::TextRedirect {
                answer_text: "A".to_string(),
                redirect_flow: "F".to_string(),
                redirect_node: None,
            },
        );
        let flat = flatten(&to_export_record(&entry));

        assert_eq!(flat.len(), 3);
        assert_eq!(
            flat.iter().map(|r| r.question.as_str()).collect::<Vec<_>>(),
            vec!["one", "two", "three"]
        );
        assert!(flat
            .iter()
            .all(|r| r.action == "text_redirect"
                && r.answer.as_deref() == Some("A")
                && r.answer2.as_deref() == Some("F")));
    }

    #[test]
    fn test_to_persisted_entry_wraps_single_question() {
        let raw: RawRecord =
            serde_json::from_str(r#"{"question":" hi ","action":"text","answer":" hello "}"#)
                .unwrap();
        let data = to_persisted_entry(0, raw).unwrap();
        assert_eq!(data.questions, vec!["hi"]);
        assert!(data.enabled);
        assert_eq!(data.answer.answer_text(), Some("hello"));
    }

    #[test]
    fn test_to_persisted_entry_decodes_interchange_redirect() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"questions":["a"],"action":"text_redirect","answer":"A","answer2":"F#N"}"#,
        )
        .unwrap();
        let data = to_persisted_entry(0, raw).unwrap();
        assert_eq!(
            data.answer,
            Answer::TextRedirect {
                answer_text: "A".to_string(),
                redirect_flow: "F".to_string(),
                redirect_node: Some("N".to_string()),
            }
        );
    }

    #[test]
    fn test_to_persisted_entry_prefers_explicit_redirect_fields() {
        let raw: RawRecord = serde_json::from_str(
            r#"{"question":"a","action":"redirect","answer":"ignored#x","redirectFlow":"F","redirectNode":"N"}"#,
        )
        .unwrap();
        let data = to_persisted_entry(0, raw).unwrap();
        assert_eq!(data.answer.redirect(), Some(("F", Some("N"))));
    }

    #[test]
    fn test_to_persisted_entry_reports_index() {
        let missing_answer = RawRecord {
            question: Some("q".to_string()),
            action: Some("text".to_string()),
            ..RawRecord::default()
        };
        let err = to_persisted_entry(7, missing_answer).unwrap_err();
        assert!(matches!(err, Error::Validation { index: 7, .. }));

        let bad_action = RawRecord {
            question: Some("q".to_string()),
            action: Some("email".to_string()),
            answer: Some("x".to_string()),
            ..RawRecord::default()
        };
        let err = to_persisted_entry(2, bad_action).unwrap_err();
        assert!(err.to_string().contains("unknown action"));

        let no_question = RawRecord {
            action: Some("text".to_string()),
            answer: Some("x".to_string()),
            ..RawRecord::default()
        };
        assert!(to_persisted_entry(0, no_question).is_err());
    }

    #[test]
    fn test_export_row_degrades_for_malformed_rows() {
        let row = EntryRow {
            id: "qna_legacy".to_string(),
            questions: "not json".to_string(),
            action: "email".to_string(),
            answer_text: Some("hello".to_string()),
            redirect_flow: Some("F".to_string()),
            redirect_node: None,
            enabled: false,
            created_at: 0,
            updated_at: 0,
        };
        let record = export_row(&row);
        assert_eq!(record.questions, vec!["not json"]);
        assert_eq!(record.action, "email");
        assert_eq!(record.answer.as_deref(), Some("hello"));
        assert_eq!(record.answer2.as_deref(), Some("F"));
    }
}
