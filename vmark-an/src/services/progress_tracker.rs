//! Progress tracker
//!
//! Reconciles the scanned folder list against the ledger to find the next folder
//! still waiting for an annotation. Nothing here is persisted: the processed set is
//! rebuilt from a fresh ledger read every time a caller asks.
//!
//! Indices run over `0..n`; `n` itself is the "all processed" sentinel.

use crate::models::LedgerEntry;
use crate::services::dataset_scanner::DatasetFolder;
use std::collections::HashSet;

/// Video filenames that already have a ledger entry
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessedVideos {
    names: HashSet<String>,
}

impl ProcessedVideos {
    /// Collect the filename suffix of every well-formed `videos/<name>` entry
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a LedgerEntry>) -> Self {
        let names = entries
            .into_iter()
            .filter_map(|entry| entry.video_file_name())
            .map(str::to_string)
            .collect();
        Self { names }
    }

    pub fn contains(&self, file_name: &str) -> bool {
        self.names.contains(file_name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Whether the folder holds a video with no ledger entry
///
/// Folders without any video never qualify.
pub fn has_unprocessed_video(folder: &DatasetFolder, processed: &ProcessedVideos) -> bool {
    folder
        .video_files()
        .iter()
        .any(|name| !processed.contains(name))
}

/// First folder holding an unprocessed video, or `folders.len()` when all are done
pub fn find_start(folders: &[DatasetFolder], processed: &ProcessedVideos) -> usize {
    scan_from(0, folders, processed)
}

/// First unprocessed folder after `current`, or `folders.len()` when none remain
///
/// Folders at or before `current` are not revisited, even if they are still open.
pub fn find_next(current: usize, folders: &[DatasetFolder], processed: &ProcessedVideos) -> usize {
    scan_from(current.saturating_add(1), folders, processed)
}

fn scan_from(start: usize, folders: &[DatasetFolder], processed: &ProcessedVideos) -> usize {
    let n = folders.len();
    (start..n)
        .find(|&i| has_unprocessed_video(&folders[i], processed))
        .unwrap_or(n)
}

/// Counts shown by `vmark-an status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSummary {
    pub total_folders: usize,
    pub completed_folders: usize,
    /// Index of the first open folder (`total_folders` when done)
    pub start_index: usize,
}

impl ProgressSummary {
    pub fn compute(folders: &[DatasetFolder], processed: &ProcessedVideos) -> Self {
        let completed_folders = folders
            .iter()
            .filter(|folder| !has_unprocessed_video(folder, processed))
            .count();
        Self {
            total_folders: folders.len(),
            completed_folders,
            start_index: find_start(folders, processed),
        }
    }

    pub fn is_done(&self) -> bool {
        self.start_index >= self.total_folders
    }

    pub fn remaining(&self) -> usize {
        self.total_folders - self.completed_folders
    }
}
