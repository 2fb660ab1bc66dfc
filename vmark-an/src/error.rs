//! Error types for vmark-an
//!
//! Maps the three failure tiers onto one enum for callers:
//! - input validation: [`ValidationError`], rejected before any state change
//! - I/O: scanner, ledger and common errors
//! - external service: [`LlmError`] (only reachable through `LlmClient::complete`;
//!   `generate` converts it into a placeholder answer)

use crate::models::ValidationError;
use crate::services::{LedgerError, LlmError, ScanError};
use thiserror::Error;

/// Workbench error type
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error("No subfolders containing videos found in {0}")]
    NoVideoFolders(String),

    #[error("Folder index {index} out of range (dataset has {count} folders)")]
    FolderIndexOutOfRange { index: usize, count: usize },

    #[error("No video file in folder {0}")]
    NoVideoInFolder(String),

    #[error("No ledger entry with id {0}")]
    EntryNotFound(u64),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    /// vmark-common error
    #[error(transparent)]
    Common(#[from] vmark_common::Error),
}

pub type AnnotatorResult<T> = std::result::Result<T, AnnotatorError>;
