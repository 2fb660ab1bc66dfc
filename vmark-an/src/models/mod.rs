//! Data models for the annotation workbench

pub mod draft;
pub mod ledger_entry;

pub use draft::{split_diagnoses, AnnotationDraft, ValidationError};
pub use ledger_entry::{Conversation, LedgerEntry, VIDEO_PREFIX};
