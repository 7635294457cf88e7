//! Data models for qna.
//!
//! - [`Entry`]: a persisted question/answer unit
//! - [`EntryData`]: entry content without identity
//! - [`Answer`] / [`Action`]: the action-discriminated answer payload

pub mod entry;

pub use entry::{Action, Answer, Entry, EntryData};
