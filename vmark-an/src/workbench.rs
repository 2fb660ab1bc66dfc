//! Annotation session over one imported dataset
//!
//! Ties the scanner, progress tracker, ledger and video store together into the
//! load / generate / save loop an annotator runs through. The folder list is fixed
//! at [`Workbench::open`]; the ledger is re-read from disk by every operation.

use crate::error::{AnnotatorError, AnnotatorResult};
use crate::models::{AnnotationDraft, LedgerEntry};
use crate::services::entry_builder::{build_entry, compose_description, draft_from_entry};
use crate::services::{
    copy_if_newer, dataset_name, duration_or_zero, find_next, find_start, locate_source,
    CopyOutcome, DatasetFolder, DatasetScanner, LedgerHandle, LlmAnswer, LlmClient,
    ProcessedVideos, ProgressSummary,
};
use std::path::{Path, PathBuf};
use vmark_common::config::ApiConfig;

/// A dataset folder prepared for annotation
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedFolder {
    pub index: usize,
    pub name: String,
    pub video: Option<PathBuf>,
    pub images: Vec<PathBuf>,
    /// Id of the ledger entry already saved for this video
    pub saved_id: Option<u64>,
    /// Saved annotation decoded from the ledger, or an empty draft
    pub draft: AnnotationDraft,
}

/// Result of [`Workbench::save`]
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub id: u64,
    pub replaced: bool,
    /// `None` when the copy failed (the save still went through)
    pub copy: Option<CopyOutcome>,
    pub duration: f64,
    /// Folder to annotate next; equals the folder count when all are done
    pub next_index: usize,
}

/// A ledger entry and the dataset folder currently holding its video
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryItem {
    pub entry: LedgerEntry,
    pub folder_index: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Workbench {
    root: PathBuf,
    folders: Vec<DatasetFolder>,
    ledger: LedgerHandle,
}

impl Workbench {
    /// Scan `root` and bind it to `<output_root>/<dataset>/<dataset>.jsonl`
    pub fn open(root: &Path, output_root: &Path, scanner: &DatasetScanner) -> AnnotatorResult<Self> {
        let folders = scanner.scan(root)?;
        if folders.is_empty() {
            return Err(AnnotatorError::NoVideoFolders(root.display().to_string()));
        }

        let ledger = LedgerHandle::new(output_root, dataset_name(root));
        tracing::info!(
            root = %root.display(),
            ledger = %ledger.ledger_path().display(),
            folders = folders.len(),
            "Opened dataset"
        );

        Ok(Self {
            root: root.to_path_buf(),
            folders,
            ledger,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn folders(&self) -> &[DatasetFolder] {
        &self.folders
    }

    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    fn processed(&self) -> ProcessedVideos {
        self.ledger.processed_videos()
    }

    pub fn start_index(&self) -> usize {
        find_start(&self.folders, &self.processed())
    }

    pub fn next_index(&self, current: usize) -> usize {
        find_next(current, &self.folders, &self.processed())
    }

    pub fn summary(&self) -> ProgressSummary {
        ProgressSummary::compute(&self.folders, &self.processed())
    }

    pub fn folder(&self, index: usize) -> AnnotatorResult<&DatasetFolder> {
        self.folders
            .get(index)
            .ok_or(AnnotatorError::FolderIndexOutOfRange {
                index,
                count: self.folders.len(),
            })
    }

    /// Media of folder `index` plus whatever annotation was saved for its video
    pub fn load_folder(&self, index: usize) -> AnnotatorResult<LoadedFolder> {
        let folder = self.folder(index)?;
        let contents = folder.contents();

        let saved = contents
            .video
            .as_deref()
            .and_then(|video| video.file_name())
            .and_then(|name| {
                let name = name.to_string_lossy();
                match self.ledger.find_by_video(&name) {
                    Ok(entry) => entry,
                    Err(e) => {
                        tracing::warn!(error = %e, "Could not read saved annotation");
                        None
                    }
                }
            });

        tracing::debug!(
            index = index,
            folder = %folder.path.display(),
            images = contents.images.len(),
            saved = saved.is_some(),
            "Loaded folder"
        );

        Ok(LoadedFolder {
            index,
            name: folder.name.clone(),
            video: contents.video,
            images: contents.images,
            saved_id: saved.as_ref().map(|e| e.id),
            draft: saved.as_ref().map(draft_from_entry).unwrap_or_default(),
        })
    }

    /// Ledger entries by id, each mapped to the folder holding its video
    pub fn history(&self) -> AnnotatorResult<Vec<HistoryItem>> {
        let entries = self.ledger.entries_sorted()?;
        Ok(entries
            .into_iter()
            .map(|entry| {
                let folder_index = entry
                    .video_file_name()
                    .and_then(|name| locate_source(&self.folders, name))
                    .map(|(index, _)| index);
                HistoryItem { entry, folder_index }
            })
            .collect())
    }

    /// History item for ledger id `id`
    pub fn locate_entry(&self, id: u64) -> AnnotatorResult<HistoryItem> {
        self.history()?
            .into_iter()
            .find(|item| item.entry.id == id)
            .ok_or(AnnotatorError::EntryNotFound(id))
    }

    /// Validate the draft and ask the LLM for reasoning and an answer
    ///
    /// LLM failures come back as a placeholder answer, not an error.
    pub async fn generate(
        &self,
        draft: &AnnotationDraft,
        client: &LlmClient,
    ) -> AnnotatorResult<LlmAnswer> {
        draft.validate_for_generate()?;
        let description = compose_description(&draft.description, &draft.segments);
        Ok(client.generate(&description, &draft.final_diagnosis()).await)
    }

    /// Save the draft for folder `index` and compute the next folder
    ///
    /// `from_history` marks a re-save of an earlier entry; the next folder is then
    /// searched from the start instead of after `index`.
    pub async fn save(
        &self,
        index: usize,
        draft: &AnnotationDraft,
        api: &ApiConfig,
        from_history: bool,
    ) -> AnnotatorResult<SaveOutcome> {
        draft.validate_for_save()?;

        let folder = self.folder(index)?;
        let video = folder
            .contents()
            .video
            .ok_or_else(|| AnnotatorError::NoVideoInFolder(folder.path.display().to_string()))?;

        let duration = duration_or_zero(&video).await;
        let entry = build_entry(&video, draft, &api.human_prompt_template, duration)?;

        let copy = match video.file_name() {
            Some(name) => {
                let dest = self.ledger.videos_dir().join(name);
                match copy_if_newer(&video, &dest) {
                    Ok(outcome) => Some(outcome),
                    Err(e) => {
                        tracing::warn!(
                            src = %video.display(),
                            dest = %dest.display(),
                            error = %e,
                            "Video copy failed; saving annotation anyway"
                        );
                        None
                    }
                }
            }
            None => None,
        };

        let upserted = self.ledger.upsert(entry)?;

        let processed = self.processed();
        let next_index = if from_history {
            find_start(&self.folders, &processed)
        } else {
            find_next(index, &self.folders, &processed)
        };

        Ok(SaveOutcome {
            id: upserted.id,
            replaced: upserted.replaced,
            copy,
            duration,
            next_index,
        })
    }
}
