//! Dataset folder scanner
//!
//! An imported dataset is a root folder whose immediate subfolders each hold one
//! video (plus optional still images). The scanner lists those subfolders in a
//! fixed order; their position in that list is the index the progress tracker and
//! the CLI work with.

use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Recognised video extensions (case-insensitive)
pub const VIDEO_EXTENSIONS: [&str; 4] = ["mp4", "avi", "mov", "mkv"];

/// Recognised still image extensions (case-insensitive)
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "jpeg", "png", "bmp"];

/// Dataset scanner errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Order in which folders (and files inside a folder) are listed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScanOrder {
    /// Lexicographic by file name; stable across platforms and runs
    #[default]
    FileName,
    /// Whatever order the OS directory listing yields
    Listing,
}

/// A dataset subfolder containing at least one video
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFolder {
    pub path: PathBuf,
    pub name: String,
    order: ScanOrder,
}

/// Media found in one dataset folder
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderContents {
    /// First video file, if any
    pub video: Option<PathBuf>,
    pub images: Vec<PathBuf>,
}

impl DatasetFolder {
    pub fn new(path: PathBuf, order: ScanOrder) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { path, name, order }
    }

    /// File names of the videos in this folder
    pub fn video_files(&self) -> Vec<String> {
        list_files(&self.path, self.order)
            .into_iter()
            .filter(|p| has_extension(p, &VIDEO_EXTENSIONS))
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
            .collect()
    }

    /// Whether a file with this exact name exists directly in the folder
    pub fn contains_file(&self, file_name: &str) -> bool {
        self.path.join(file_name).is_file()
    }

    pub fn contents(&self) -> FolderContents {
        let files = list_files(&self.path, self.order);
        let video = files
            .iter()
            .find(|p| has_extension(p, &VIDEO_EXTENSIONS))
            .cloned();
        let images = files
            .into_iter()
            .filter(|p| has_extension(p, &IMAGE_EXTENSIONS))
            .collect();
        FolderContents { video, images }
    }
}

/// Dataset scanner
#[derive(Debug, Clone, Default)]
pub struct DatasetScanner {
    order: ScanOrder,
}

impl DatasetScanner {
    /// Scanner with file-name ordering
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_order(order: ScanOrder) -> Self {
        Self { order }
    }

    /// List the immediate subfolders of `root` that contain a video
    ///
    /// An empty result (no qualifying subfolder) is not an error; the caller decides
    /// how to report it.
    pub fn scan(&self, root: &Path) -> Result<Vec<DatasetFolder>, ScanError> {
        if !root.exists() {
            return Err(ScanError::PathNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(ScanError::NotADirectory(root.to_path_buf()));
        }

        let folders: Vec<DatasetFolder> = list_entries(root, self.order)
            .into_iter()
            .filter(|p| p.is_dir())
            .map(|p| DatasetFolder::new(p, self.order))
            .filter(|folder| {
                let has_video = !folder.video_files().is_empty();
                if !has_video {
                    tracing::debug!(folder = %folder.path.display(), "Skipping folder without video");
                }
                has_video
            })
            .collect();

        tracing::info!(
            root = %root.display(),
            folders = folders.len(),
            "Dataset scan complete"
        );

        Ok(folders)
    }
}

/// Dataset name used for the output folder and ledger file: the root's final component
pub fn dataset_name(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "video_annotations".to_string())
}

fn list_entries(dir: &Path, order: ScanOrder) -> Vec<PathBuf> {
    let mut walker = WalkDir::new(dir).min_depth(1).max_depth(1);
    if order == ScanOrder::FileName {
        walker = walker.sort_by_file_name();
    }

    let mut entries = Vec::new();
    for entry in walker {
        match entry {
            Ok(entry) => entries.push(entry.into_path()),
            Err(e) => {
                tracing::warn!("Error accessing entry: {}", e);
                // Continue scanning, don't abort
            }
        }
    }
    entries
}

fn list_files(dir: &Path, order: ScanOrder) -> Vec<PathBuf> {
    list_entries(dir, order)
        .into_iter()
        .filter(|p| p.is_file())
        .collect()
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| extensions.contains(&ext.as_str()))
}
