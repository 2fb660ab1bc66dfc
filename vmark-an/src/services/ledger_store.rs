//! JSONL annotation ledger
//!
//! **Layout:** `<output_root>/<dataset>/<dataset>.jsonl`, one [`LedgerEntry`] per line,
//! with copied videos under `<output_root>/<dataset>/videos/`.
//!
//! **Guarantees:**
//! - Every read goes to disk; no entry list is cached between calls
//! - Upsert is keyed by the `video` field; a replaced entry keeps its id
//! - The file is always rewritten sorted ascending by id, via temp file + rename
//! - A rejected upsert leaves the file untouched

use crate::models::LedgerEntry;
use crate::services::progress_tracker::ProcessedVideos;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vmark_common::fs_utils::write_atomic;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Video field must start with 'videos/': {0}")]
    InvalidVideoField(String),

    #[error("Failed to read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Corrupt ledger {path} at line {line}: {message}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Failed to serialize ledger entry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write ledger: {0}")]
    Write(#[from] vmark_common::Error),
}

/// Result of a successful upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpsertOutcome {
    /// Id the entry was stored under
    pub id: u64,
    /// True when an existing entry for the same video was replaced
    pub replaced: bool,
}

/// Handle to one dataset's ledger and video store
///
/// Holds paths only; callers pass it to each operation, which reloads from disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerHandle {
    output_root: PathBuf,
    dataset_name: String,
}

impl LedgerHandle {
    pub fn new(output_root: impl Into<PathBuf>, dataset_name: impl Into<String>) -> Self {
        Self {
            output_root: output_root.into(),
            dataset_name: dataset_name.into(),
        }
    }

    pub fn dataset_name(&self) -> &str {
        &self.dataset_name
    }

    /// `<output_root>/<dataset>`
    pub fn dataset_dir(&self) -> PathBuf {
        self.output_root.join(&self.dataset_name)
    }

    /// `<output_root>/<dataset>/<dataset>.jsonl`
    pub fn ledger_path(&self) -> PathBuf {
        self.dataset_dir()
            .join(format!("{}.jsonl", self.dataset_name))
    }

    /// `<output_root>/<dataset>/videos`
    pub fn videos_dir(&self) -> PathBuf {
        self.dataset_dir().join("videos")
    }

    /// Read every entry in file order; a missing ledger is empty
    pub fn read_entries(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        read_jsonl(&self.ledger_path())
    }

    /// Entries sorted ascending by id
    pub fn entries_sorted(&self) -> Result<Vec<LedgerEntry>, LedgerError> {
        let mut entries = self.read_entries()?;
        entries.sort_by_key(LedgerEntry::sort_key);
        Ok(entries)
    }

    /// Processed set for reconciliation
    ///
    /// An unreadable ledger counts as empty so the tracker can still answer; the
    /// error is logged.
    pub fn processed_videos(&self) -> ProcessedVideos {
        match self.read_entries() {
            Ok(entries) => ProcessedVideos::from_entries(&entries),
            Err(e) => {
                tracing::warn!(
                    ledger = %self.ledger_path().display(),
                    error = %e,
                    "Ledger unreadable; treating as empty for progress tracking"
                );
                ProcessedVideos::default()
            }
        }
    }

    /// Entry whose `video` field is `videos/<file_name>`
    pub fn find_by_video(&self, file_name: &str) -> Result<Option<LedgerEntry>, LedgerError> {
        let video = LedgerEntry::video_field(file_name);
        Ok(self.read_entries()?.into_iter().find(|e| e.video == video))
    }

    pub fn find_by_id(&self, id: u64) -> Result<Option<LedgerEntry>, LedgerError> {
        Ok(self.read_entries()?.into_iter().find(|e| e.id == id))
    }

    /// Insert or replace the entry for `entry.video` and rewrite the ledger
    ///
    /// The incoming `id` is ignored: a replacement keeps the stored id, a new entry
    /// gets `max(len, max_id) + 1`. Stored entries without an id are numbered
    /// first, in file order, so the rewritten ledger has no zero or duplicate ids.
    pub fn upsert(&self, mut entry: LedgerEntry) -> Result<UpsertOutcome, LedgerError> {
        if entry.video_file_name().is_none() {
            return Err(LedgerError::InvalidVideoField(entry.video));
        }

        let path = self.ledger_path();
        let mut entries = read_jsonl(&path)?;
        assign_missing_ids(&mut entries);

        let outcome = match entries.iter().position(|e| e.video == entry.video) {
            Some(pos) => {
                entry.id = entries[pos].id;
                entries[pos] = entry;
                UpsertOutcome {
                    id: entries[pos].id,
                    replaced: true,
                }
            }
            None => {
                entry.id = next_id(&entries);
                let id = entry.id;
                entries.push(entry);
                UpsertOutcome { id, replaced: false }
            }
        };

        entries.sort_by_key(LedgerEntry::sort_key);
        write_jsonl(&path, &entries)?;

        tracing::info!(
            ledger = %path.display(),
            id = outcome.id,
            replaced = outcome.replaced,
            total = entries.len(),
            "Ledger entry saved"
        );

        Ok(outcome)
    }
}

fn next_id(entries: &[LedgerEntry]) -> u64 {
    let max_id = entries.iter().map(|e| e.id).max().unwrap_or(0);
    (entries.len() as u64).max(max_id) + 1
}

/// Give every id-less (id 0) entry a fresh id above all existing ones
fn assign_missing_ids(entries: &mut [LedgerEntry]) {
    let mut next = next_id(entries);
    for entry in entries.iter_mut().filter(|e| e.id == 0) {
        tracing::debug!(video = %entry.video, id = next, "Assigning id to ledger entry without one");
        entry.id = next;
        next += 1;
    }
}

fn read_jsonl(path: &Path) -> Result<Vec<LedgerEntry>, LedgerError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => {
            return Err(LedgerError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    let mut entries = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let entry = serde_json::from_str(line).map_err(|e| LedgerError::Corrupt {
            path: path.to_path_buf(),
            line: index + 1,
            message: e.to_string(),
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn write_jsonl(path: &Path, entries: &[LedgerEntry]) -> Result<(), LedgerError> {
    let mut buffer = String::new();
    for entry in entries {
        buffer.push_str(&serde_json::to_string(entry)?);
        buffer.push('\n');
    }
    write_atomic(path, buffer.as_bytes())?;
    Ok(())
}
