//! Bulk import with content-addressed deduplication.
//!
//! An import runs in three passes:
//! 1. Parse and validate every candidate. Nothing is written if any fails.
//! 2. Drop candidates whose fingerprint matches a stored entry or an
//!    earlier candidate in the same payload.
//! 3. Save the survivors one at a time, in input order.
//!
//! CSV parsing merges adjacent rows that share an answer, which can join
//! rows exported from several entries. A merged candidate that misses in
//! step 2 is split again: runs of its questions that form a known entry
//! are dropped, and the questions between them stay grouped.
//!
//! Saves are not wrapped in a shared transaction: a store failure stops the
//! import but keeps what was already written. Two imports running at once
//! can both pass step 2 for the same content and both write it.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info};

use crate::error::Result;
use crate::model::EntryData;
use crate::storage::{EntryStore, Page};
use crate::transfer::codec::{to_persisted_entry, RawRecord};
use crate::transfer::formats::{parse, Format};
use crate::transfer::hash::fingerprint;

/// What to import.
#[derive(Debug, Clone)]
pub enum ImportPayload {
    /// Records that are already structured.
    Records(Vec<RawRecord>),
    /// Raw text to be parsed in the given format.
    Text { format: Format, text: String },
}

/// Import behaviour switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImportOptions {
    /// Delete every stored entry before saving.
    pub replace: bool,
    /// Parse and deduplicate only; write nothing.
    pub dry_run: bool,
}

/// Result of an import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportOutcome {
    /// IDs of the entries created, in input order.
    pub ids: Vec<String>,
    /// Candidates dropped as duplicates.
    pub skipped: usize,
    /// Entries removed by `replace`.
    pub deleted: usize,
    /// Entries that would be created (dry run only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending: Option<usize>,
}

impl ImportOutcome {
    /// Number of entries created.
    #[must_use]
    pub fn created(&self) -> usize {
        self.ids.len()
    }
}

/// Importer for interchange payloads.
pub struct Importer<'a, S: EntryStore> {
    store: &'a mut S,
    options: ImportOptions,
}

impl<'a, S: EntryStore> Importer<'a, S> {
    /// Create an importer with default options.
    #[must_use]
    pub fn new(store: &'a mut S) -> Self {
        Self {
            store,
            options: ImportOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }

    /// Import a payload.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error before any write, or the first
    /// store error encountered while saving.
    pub fn import(&mut self, payload: ImportPayload) -> Result<ImportOutcome> {
        let regrouped = matches!(payload, ImportPayload::Text { format: Format::Csv, .. });
        let raws = match payload {
            ImportPayload::Records(records) => records,
            ImportPayload::Text { format, text } => parse(format, &text)?,
        };
        let total = raws.len();

        let candidates = raws
            .into_iter()
            .enumerate()
            .map(|(index, raw)| to_persisted_entry(index, raw))
            .collect::<Result<Vec<_>>>()?;

        let mut seen = if self.options.replace {
            HashSet::new()
        } else {
            self.existing_fingerprints()?
        };

        let mut outcome = ImportOutcome::default();
        let mut survivors: Vec<EntryData> = Vec::with_capacity(candidates.len());
        for (index, candidate) in candidates.into_iter().enumerate() {
            let fp = fingerprint(&candidate)?;
            if seen.contains(&fp) {
                debug!(index, "Skipping duplicate candidate");
                outcome.skipped += 1;
                continue;
            }

            let pieces = if regrouped && candidate.questions.len() > 1 {
                split_known_runs(&candidate, &seen)?
            } else {
                vec![Some(candidate)]
            };

            for piece in pieces {
                let Some(data) = piece else {
                    debug!(index, "Skipping questions of a stored entry");
                    outcome.skipped += 1;
                    continue;
                };
                if seen.insert(fingerprint(&data)?) {
                    survivors.push(data);
                } else {
                    debug!(index, "Skipping duplicate candidate");
                    outcome.skipped += 1;
                }
            }
        }

        if self.options.dry_run {
            outcome.pending = Some(survivors.len());
            if self.options.replace {
                outcome.deleted = self.store.count()?;
            }
            info!(
                total,
                pending = survivors.len(),
                skipped = outcome.skipped,
                "Dry-run import"
            );
            return Ok(outcome);
        }

        if self.options.replace {
            outcome.deleted = self.clear()?;
        }

        for mut data in survivors {
            data.enabled = true;
            let id = self.store.save(&data, None)?;
            debug!(%id, "Created entry");
            outcome.ids.push(id);
        }

        info!(
            total,
            created = outcome.created(),
            skipped = outcome.skipped,
            deleted = outcome.deleted,
            "Import complete"
        );
        Ok(outcome)
    }

    fn existing_fingerprints(&self) -> Result<HashSet<String>> {
        self.store
            .list(Page::all())?
            .iter()
            .map(|entry| fingerprint(&entry.data))
            .collect()
    }

    /// Delete every stored entry, one at a time.
    fn clear(&mut self) -> Result<usize> {
        let rows = self.store.list_rows()?;
        for row in &rows {
            self.store.delete(&row.id)?;
        }
        Ok(rows.len())
    }
}

/// Cut a merged candidate at runs of questions that match a known
/// fingerprint with the same answer.
///
/// Known runs come back as `None`, in order. Questions between them are
/// returned as new candidates. The longest match at each position wins.
fn split_known_runs(candidate: &EntryData, seen: &HashSet<String>) -> Result<Vec<Option<EntryData>>> {
    let questions = &candidate.questions;
    let run = |range: std::ops::Range<usize>| EntryData {
        questions: questions[range].to_vec(),
        answer: candidate.answer.clone(),
        enabled: candidate.enabled,
    };

    let mut pieces = Vec::new();
    let mut pending = 0;
    let mut start = 0;
    while start < questions.len() {
        let mut known_end = None;
        for end in (start + 1..=questions.len()).rev() {
            if seen.contains(&fingerprint(&run(start..end))?) {
                known_end = Some(end);
                break;
            }
        }

        match known_end {
            Some(end) => {
                if pending < start {
                    pieces.push(Some(run(pending..start)));
                }
                pieces.push(None);
                start = end;
                pending = end;
            }
            None => start += 1,
        }
    }
    if pending < questions.len() {
        pieces.push(Some(run(pending..questions.len())));
    }

    Ok(pieces)
}
