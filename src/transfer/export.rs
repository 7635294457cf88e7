//! Export of every stored entry to an interchange format.
//!
//! Export is a backup path: disabled entries are included, and rows that no
//! longer satisfy the entry invariants are written out as stored rather than
//! failing the export.

use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::storage::EntryStore;
use crate::transfer::charset::Charset;
use crate::transfer::codec::{export_row, flatten, ExportRecord, FlatRecord};
use crate::transfer::file::atomic_write;
use crate::transfer::formats::{write_csv, write_json, Format};

/// Exported records in either shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ExportRecords {
    Grouped(Vec<ExportRecord>),
    Flat(Vec<FlatRecord>),
}

impl ExportRecords {
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Grouped(records) => records.len(),
            Self::Flat(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One record per question.
    #[must_use]
    pub fn into_flat(self) -> Vec<FlatRecord> {
        match self {
            Self::Grouped(records) => records.iter().flat_map(flatten).collect(),
            Self::Flat(records) => records,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportOptions {
    pub format: Format,
    /// One JSON record per question. CSV is always flat.
    pub flat: bool,
    /// CSV text encoding. JSON is always UTF-8.
    pub charset: Charset,
}

/// Summary of an export.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportStats {
    pub entries: usize,
    pub records: usize,
    pub format: String,
    pub bytes: usize,
}

/// Exporter over an entry store.
pub struct Exporter<'a, S: EntryStore> {
    store: &'a S,
}

impl<'a, S: EntryStore> Exporter<'a, S> {
    #[must_use]
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Every stored entry as grouped or flat records.
    ///
    /// # Errors
    ///
    /// Returns an error only if the store cannot be read.
    pub fn export(&self, flat: bool) -> Result<ExportRecords> {
        let grouped: Vec<ExportRecord> = self.store.list_rows()?.iter().map(export_row).collect();

        Ok(if flat {
            ExportRecords::Flat(grouped.iter().flat_map(flatten).collect())
        } else {
            ExportRecords::Grouped(grouped)
        })
    }

    /// Serialize every entry to bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::Encoding` if the CSV charset cannot represent the text.
    pub fn render(&self, options: ExportOptions) -> Result<(Vec<u8>, ExportStats)> {
        let flat = options.flat || options.format == Format::Csv;
        let records = self.export(flat)?;
        let record_count = records.len();

        let bytes = match options.format {
            Format::Json => write_json(&records)?.into_bytes(),
            Format::Csv => options.charset.encode(&write_csv(&records.into_flat())?)?,
        };

        let stats = ExportStats {
            entries: self.store.count()?,
            records: record_count,
            format: options.format.to_string(),
            bytes: bytes.len(),
        };
        Ok((bytes, stats))
    }

    /// Render and atomically write to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    pub fn export_to_file(&self, path: &Path, options: ExportOptions) -> Result<ExportStats> {
        let (bytes, stats) = self.render(options)?;
        atomic_write(path, &bytes)?;

        info!(
            path = %path.display(),
            entries = stats.entries,
            records = stats.records,
            format = %stats.format,
            "Export complete"
        );
        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::model::{Answer, EntryData};
    use crate::storage::SqliteStorage;
    use crate::transfer::import::{ImportPayload, Importer};
    use tempfile::TempDir;

    fn seeded() -> SqliteStorage {
        let mut storage = SqliteStorage::open_memory().unwrap();
        let entries = [
            EntryData::new(
                vec!["hours?".to_string(), "open when".to_string(), "times".to_string()],
                Answer::Text {
                    answer_text: "9 to 5".to_string(),
                },
            ),
            EntryData::new(
                vec!["human".to_string()],
                Answer::Redirect {
                    redirect_flow: "handoff.flow.json".to_string(),
                    redirect_node: Some("agent".to_string()),
                },
            ),
            EntryData::new(
                vec!["refund".to_string(), "money back".to_string()],
                Answer::TextRedirect {
                    answer_text: "Sure, café voucher or cash?".to_string(),
                    redirect_flow: "refund.flow.json".to_string(),
                    redirect_node: None,
                },
            ),
        ];
        for data in &entries {
            storage.save(data, None).unwrap();
        }
        storage
    }

    #[test]
    fn test_export_includes_disabled_entries() {
        let mut storage = seeded();
        let id = storage.list_rows().unwrap()[0].id.clone();
        let mut data = storage.get(&id).unwrap().data;
        data.enabled = false;
        storage.save(&data, Some(&id)).unwrap();

        let records = Exporter::new(&storage).export(false).unwrap();
        assert_eq!(records.len(), 3);
    }

    #[test]
    fn test_flat_export_fans_out() {
        let storage = seeded();
        let ExportRecords::Flat(flat) = Exporter::new(&storage).export(true).unwrap() else {
            panic!("expected flat records");
        };
        assert_eq!(flat.len(), 6);
        assert_eq!(
            flat.iter().filter(|r| r.answer.as_deref() == Some("9 to 5")).count(),
            3
        );
    }

    #[test]
    fn test_json_round_trip_creates_nothing() {
        let mut storage = seeded();
        let (bytes, stats) = Exporter::new(&storage)
            .render(ExportOptions::default())
            .unwrap();
        assert_eq!(stats.records, 3);

        let outcome = Importer::new(&mut storage)
            .import(ImportPayload::Text {
                format: Format::Json,
                text: String::from_utf8(bytes).unwrap(),
            })
            .unwrap();
        assert_eq!(outcome.created(), 0);
        assert_eq!(outcome.skipped, 3);
    }

    #[test]
    fn test_csv_round_trip_creates_nothing() {
        let mut storage = seeded();
        let options = ExportOptions {
            format: Format::Csv,
            flat: false,
            charset: Charset::Latin1,
        };
        let (bytes, stats) = Exporter::new(&storage).render(options).unwrap();
        assert_eq!(stats.records, 6);

        let text = Charset::Latin1.decode(&bytes).unwrap();
        assert!(text.starts_with("question,action,answer,answer2\n"));
        assert!(text.contains("human,redirect,handoff.flow.json#agent,\n"));

        let outcome = Importer::new(&mut storage)
            .import(ImportPayload::Text {
                format: Format::Csv,
                text,
            })
            .unwrap();
        assert_eq!(outcome.created(), 0);
        assert_eq!(storage.count().unwrap(), 3);
    }

    #[test]
    fn test_csv_round_trip_with_shared_redirect_target() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        for question in ["talk to a human", "speak to an agent"] {
            let data = EntryData::new(
                vec![question.to_string()],
                Answer::Redirect {
                    redirect_flow: "handoff.flow.json".to_string(),
                    redirect_node: None,
                },
            );
            storage.save(&data, None).unwrap();
        }

        let options = ExportOptions {
            format: Format::Csv,
            ..ExportOptions::default()
        };
        let (bytes, _) = Exporter::new(&storage).render(options).unwrap();

        let outcome = Importer::new(&mut storage)
            .import(ImportPayload::Text {
                format: Format::Csv,
                text: String::from_utf8(bytes).unwrap(),
            })
            .unwrap();
        assert_eq!(outcome.created(), 0);
        assert_eq!(storage.count().unwrap(), 2);
    }

    #[test]
    fn test_csv_charset_failure_is_encoding_error() {
        let mut storage = SqliteStorage::open_memory().unwrap();
        storage
            .save(
                &EntryData::new(
                    vec!["price".to_string()],
                    Answer::Text {
                        answer_text: "10 €".to_string(),
                    },
                ),
                None,
            )
            .unwrap();

        let options = ExportOptions {
            format: Format::Csv,
            flat: true,
            charset: Charset::Latin1,
        };
        let err = Exporter::new(&storage).render(options).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));

        let utf8 = ExportOptions {
            charset: Charset::Utf8Bom,
            ..options
        };
        let (bytes, _) = Exporter::new(&storage).render(utf8).unwrap();
        assert!(bytes.starts_with(b"\xEF\xBB\xBF"));
    }

    #[test]
    fn test_export_to_file() {
        let storage = seeded();
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("backup.json");

        let stats = Exporter::new(&storage)
            .export_to_file(&path, ExportOptions::default())
            .unwrap();

        let written: Vec<ExportRecord> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 3);
        assert_eq!(stats.entries, 3);
        assert_eq!(written[2].answer2.as_deref(), Some("refund.flow.json"));
    }

    #[test]
    fn test_empty_store_exports_empty_array() {
        let storage = SqliteStorage::open_memory().unwrap();
        let (bytes, stats) = Exporter::new(&storage)
            .render(ExportOptions::default())
            .unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(String::from_utf8(bytes).unwrap().trim(), "[]");
    }
}
