//! Content fingerprints for import deduplication.
//!
//! A fingerprint is the SHA256 of an entry's canonical JSON. Only content
//! takes part: the ID, the enabled flag, and timestamps are left out, and
//! questions are sorted and de-duplicated so that reordering them does not
//! produce a new fingerprint.

use std::collections::BTreeSet;

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::Result;
use crate::model::{Answer, EntryData};

/// The fields of an entry that identify its content.
#[derive(Serialize)]
struct Canonical<'a> {
    questions: BTreeSet<&'a str>,
    #[serde(flatten)]
    answer: &'a Answer,
}

/// Compute a SHA256 hash of a serializable value.
///
/// The value is first serialized to JSON, then hashed.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn content_hash<T: Serialize>(value: &T) -> Result<String> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Fingerprint of an entry's content.
///
/// # Errors
///
/// Returns an error if the entry cannot be serialized.
pub fn fingerprint(data: &EntryData) -> Result<String> {
    content_hash(&Canonical {
        questions: data.questions.iter().map(String::as_str).collect(),
        answer: &data.answer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(questions: &[&str], answer: &str) -> EntryData {
        EntryData::new(
            questions.iter().map(ToString::to_string).collect(),
            Answer::Text {
                answer_text: answer.to_string(),
            },
        )
    }

    #[test]
    fn test_content_hash_deterministic() {
        let hash1 = content_hash(&entry(&["q"], "a")).unwrap();
        let hash2 = content_hash(&entry(&["q"], "a")).unwrap();

        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA256 produces 64 hex chars
    }

    #[test]
    fn test_fingerprint_ignores_enabled() {
        let enabled = entry(&["hours?"], "9 to 5");
        let mut disabled = enabled.clone();
        disabled.enabled = false;

        assert_eq!(fingerprint(&enabled).unwrap(), fingerprint(&disabled).unwrap());
    }

    #[test]
    fn test_fingerprint_ignores_question_order_and_repeats() {
        let a = entry(&["a", "b", "c"], "x");
        let b = entry(&["c", "a", "b", "a"], "x");

        assert_eq!(fingerprint(&a).unwrap(), fingerprint(&b).unwrap());
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let base = fingerprint(&entry(&["a"], "x")).unwrap();

        assert_ne!(base, fingerprint(&entry(&["a"], "y")).unwrap());
        assert_ne!(base, fingerprint(&entry(&["a", "b"], "x")).unwrap());

        let redirect = EntryData::new(
            vec!["a".to_string()],
            Answer::Redirect {
                redirect_flow: "x".to_string(),
                redirect_node: None,
            },
        );
        assert_ne!(base, fingerprint(&redirect).unwrap());
    }
}
