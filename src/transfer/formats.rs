//! Interchange formats.
//!
//! Each [`Format`] maps to one parser and one writer. Names are resolved
//! explicitly and anything unknown is rejected with
//! [`Error::UnsupportedFormat`].

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::transfer::codec::{FlatRecord, OneOrMany, RawRecord};

/// Header row written to every CSV export.
pub const CSV_HEADER: [&str; 4] = ["question", "action", "answer", "answer2"];

/// Supported interchange formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Format {
    /// JSON array of records (a single object is also accepted on import).
    #[default]
    Json,
    /// Delimited text with a header row, one question per row.
    Csv,
}

impl Format {
    /// Returns the file extension for this format.
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Csv => "csv",
        }
    }

    /// Detects format from file extension.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedFormat` if the extension is missing or unknown.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase);

        match ext.as_deref() {
            Some("json") => Ok(Self::Json),
            Some("csv") => Ok(Self::Csv),
            Some(ext) => Err(Error::UnsupportedFormat(format!(".{ext}"))),
            None => Err(Error::UnsupportedFormat(format!(
                "cannot infer format of {}: file has no extension",
                path.display()
            ))),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for Format {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            other => Err(Error::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Parse text in `format` into raw candidates.
///
/// # Errors
///
/// Returns an error if the text is structurally invalid for the format.
pub fn parse(format: Format, text: &str) -> Result<Vec<RawRecord>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    match format {
        Format::Json => parse_json(text),
        Format::Csv => parse_csv(text),
    }
}

fn parse_json(text: &str) -> Result<Vec<RawRecord>> {
    let value: serde_json::Value = serde_json::from_str(text)?;
    let items = match value {
        serde_json::Value::Array(items) => items,
        obj @ serde_json::Value::Object(_) => vec![obj],
        _ => {
            return Err(Error::validation(
                0,
                "expected a JSON array of records or a single record object",
            ));
        }
    };

    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value(item).map_err(|e| Error::validation(i, e.to_string()))
        })
        .collect()
}

/// Maps CSV column indices to record fields.
#[derive(Debug, Default)]
struct ColumnMap {
    question: Option<usize>,
    action: Option<usize>,
    answer: Option<usize>,
    answer2: Option<usize>,
    redirect_flow: Option<usize>,
    redirect_node: Option<usize>,
}

impl ColumnMap {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let mut map = Self::default();

        for (i, header) in headers.iter().enumerate() {
            match header.to_lowercase().as_str() {
                "question" | "questions" => map.question = Some(i),
                "action" => map.action = Some(i),
                "answer" | "answertext" | "answer_text" => map.answer = Some(i),
                "answer2" => map.answer2 = Some(i),
                "redirectflow" | "redirect_flow" => map.redirect_flow = Some(i),
                "redirectnode" | "redirect_node" => map.redirect_node = Some(i),
                _ => {} // Ignore unknown columns
            }
        }

        if map.question.is_none() {
            return Err(Error::InvalidArgument(
                "CSV must have a 'question' column".to_string(),
            ));
        }

        Ok(map)
    }

    fn record(&self, row: &csv::StringRecord) -> RawRecord {
        let get = |idx: Option<usize>| -> Option<String> {
            idx.and_then(|i| row.get(i))
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        RawRecord {
            question: get(self.question),
            questions: None,
            action: get(self.action),
            answer: get(self.answer),
            answer2: get(self.answer2),
            redirect_flow: get(self.redirect_flow),
            redirect_node: get(self.redirect_node),
        }
    }
}

/// Parse CSV rows.
///
/// Adjacent rows that differ only in their question are regrouped into one
/// record, so a flat export of a multi-question entry imports as that same
/// entry.
fn parse_csv(text: &str) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let columns = ColumnMap::from_headers(reader.headers()?)?;

    let mut records: Vec<RawRecord> = Vec::new();
    for row in reader.records() {
        let mut record = columns.record(&row?);

        if let Some(prev) = records.last_mut() {
            if same_answer(prev, &record) {
                if let Some(question) = record.question.take() {
                    push_question(prev, question);
                    continue;
                }
            }
        }

        records.push(record);
    }

    Ok(records)
}

fn same_answer(prev: &RawRecord, next: &RawRecord) -> bool {
    let prev_has_question = prev.question.is_some() || prev.questions.is_some();

    prev_has_question
        && next.question.is_some()
        && prev.action == next.action
        && prev.answer == next.answer
        && prev.answer2 == next.answer2
        && prev.redirect_flow == next.redirect_flow
        && prev.redirect_node == next.redirect_node
}

fn push_question(record: &mut RawRecord, question: String) {
    match record.questions.as_mut() {
        Some(OneOrMany::Many(questions)) => questions.push(question),
        _ => {
            let mut questions: Vec<String> = record.question.take().into_iter().collect();
            questions.push(question);
            record.questions = Some(OneOrMany::Many(questions));
        }
    }
}

/// Serialize records as a pretty-printed JSON array.
///
/// # Errors
///
/// Returns an error if serialization fails.
pub fn write_json<T: Serialize + ?Sized>(records: &T) -> Result<String> {
    let mut json = serde_json::to_string_pretty(records)?;
    json.push('\n');
    Ok(json)
}

/// Serialize flat records as CSV with a header row.
///
/// # Errors
///
/// Returns an error if a row cannot be written.
pub fn write_csv(records: &[FlatRecord]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false) // Header is written even for an empty export
        .from_writer(Vec::new());

    writer.write_record(CSV_HEADER)?;
    for record in records {
        writer.write_record([
            record.question.as_str(),
            record.action.as_str(),
            record.answer.as_deref().unwrap_or_default(),
            record.answer2.as_deref().unwrap_or_default(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::Encoding(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_resolution() {
        assert_eq!("JSON".parse::<Format>().unwrap(), Format::Json);
        assert_eq!(
            Format::from_path(Path::new("backup.CSV")).unwrap(),
            Format::Csv
        );
        assert!(matches!(
            "xml".parse::<Format>(),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            Format::from_path(Path::new("entries.yaml")),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(Format::from_path(Path::new("entries")).is_err());
    }

    #[test]
    fn test_parse_json_array_and_object() {
        let records = parse(
            Format::Json,
            r#"[{"questions":["a","b"],"action":"text","answer":"x"},{"question":"c","action":"text","answer":"y","id":"qna_1"}]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].questions,
            Some(OneOrMany::Many(vec!["a".to_string(), "b".to_string()]))
        );
        assert_eq!(records[1].question.as_deref(), Some("c"));

        let single = parse(Format::Json, r#"{"question":"a","action":"text","answer":"x"}"#).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_parse_json_rejects_bad_shapes() {
        assert!(matches!(parse(Format::Json, "[1, "), Err(Error::Json(_))));
        assert!(matches!(
            parse(Format::Json, "42"),
            Err(Error::Validation { index: 0, .. })
        ));
        assert!(matches!(
            parse(Format::Json, r#"[{"question":"a"},{"question":5}]"#),
            Err(Error::Validation { index: 1, .. })
        ));
    }

    #[test]
    fn test_parse_csv_regroups_adjacent_rows() {
        let text = "\u{feff}question,action,answer,answer2\n\
                    hi,text,hello,\n\
                    hey,text,hello,\n\
                    bye,redirect,exit#end,\n";
        let records = parse(Format::Csv, text).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].questions,
            Some(OneOrMany::Many(vec!["hi".to_string(), "hey".to_string()]))
        );
        assert_eq!(records[0].answer2, None);
        assert_eq!(records[1].question.as_deref(), Some("bye"));
        assert_eq!(records[1].answer.as_deref(), Some("exit#end"));
    }

    #[test]
    fn test_parse_csv_requires_question_column() {
        let err = parse(Format::Csv, "action,answer\ntext,hello\n").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_write_csv_quotes_and_header() {
        let csv = write_csv(&[FlatRecord {
            question: "hours, please".to_string(),
            action: "text".to_string(),
            answer: Some("9 to 5".to_string()),
            answer2: None,
        }])
        .unwrap();

        assert_eq!(
            csv,
            "question,action,answer,answer2\n\"hours, please\",text,9 to 5,\n"
        );
        assert_eq!(write_csv(&[]).unwrap(), "question,action,answer,answer2\n");
    }
}
