//! vmark-an library interface
//!
//! Dataset progress tracking and annotation persistence for the `vmark-an` CLI,
//! exposed as a library for integration testing.

pub mod error;
pub mod models;
pub mod services;
pub mod workbench;

pub use crate::error::{AnnotatorError, AnnotatorResult};
pub use crate::workbench::{HistoryItem, LoadedFolder, SaveOutcome, Workbench};
