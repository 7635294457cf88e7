//! Bulk interchange of entries.
//!
//! - **Codec**: entry ⇄ grouped/flat interchange records, `flow#node` redirects
//! - **Formats**: JSON and CSV parsers and writers
//! - **Import**: parse → dedup by fingerprint → persist
//! - **Export**: every entry → grouped or flat records, written atomically
//!
//! # Example
//!
//! ```ignore
//! use qna::transfer::{ExportOptions, Exporter, Format, ImportPayload, Importer};
//!
//! let outcome = Importer::new(&mut storage).import(ImportPayload::Text {
//!     format: Format::Csv,
//!     text,
//! })?;
//! println!("created {}, skipped {}", outcome.created(), outcome.skipped);
//!
//! Exporter::new(&storage).export_to_file(&path, ExportOptions::default())?;
//! ```

mod charset;
mod codec;
mod export;
mod file;
mod formats;
mod hash;
mod import;

pub use charset::Charset;
pub use codec::{
    decode_redirect, encode_redirect, export_row, flatten, to_export_record, to_persisted_entry,
    ExportRecord, FlatRecord, OneOrMany, RawRecord,
};
pub use export::{ExportOptions, ExportRecords, ExportStats, Exporter};
pub use file::atomic_write;
pub use formats::{parse, write_csv, write_json, Format, CSV_HEADER};
pub use hash::{content_hash, fingerprint};
pub use import::{ImportOptions, ImportOutcome, ImportPayload, Importer};
