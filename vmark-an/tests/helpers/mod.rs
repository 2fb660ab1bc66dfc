//! Test Helper Utilities
//!
//! Shared fixtures for vmark-an integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vmark_an::models::{AnnotationDraft, Conversation, LedgerEntry};
use vmark_common::AnnotationSegment;

/// Dataset root plus output folder, both in throwaway directories
pub struct DatasetFixture {
    _temp: TempDir,
    pub root: PathBuf,
    pub output: PathBuf,
}

impl DatasetFixture {
    /// Empty dataset named `name`
    pub fn new(name: &str) -> Self {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join(name);
        let output = temp.path().join("output");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&output).unwrap();
        Self {
            _temp: temp,
            root,
            output,
        }
    }

    /// Add subfolder `folder` containing `files` (dummy bytes)
    pub fn folder(self, folder: &str, files: &[&str]) -> Self {
        let dir = self.root.join(folder);
        fs::create_dir_all(&dir).unwrap();
        for file in files {
            fs::write(dir.join(file), format!("{}/{}", folder, file)).unwrap();
        }
        self
    }

    pub fn ledger_path(&self) -> PathBuf {
        let name = self.root.file_name().unwrap().to_string_lossy().to_string();
        self.output.join(&name).join(format!("{}.jsonl", name))
    }
}

/// Entry for `videos/<file_name>` with a recognisable answer
pub fn entry(video: &str, answer: &str) -> LedgerEntry {
    LedgerEntry {
        id: 0,
        video: video.to_string(),
        conversations: vec![Conversation::human("<image>"), Conversation::gpt(answer)],
        duration: 2.5,
        raw_description: format!("Video description:\n{}\n\nFinal diagnosis: X", answer),
        extra: Default::default(),
    }
}

/// Draft that passes save validation
pub fn complete_draft() -> AnnotationDraft {
    AnnotationDraft {
        segments: vec![
            AnnotationSegment::new("00:00:01", "00:00:04", "stands up"),
            AnnotationSegment::new("00:00:03", "00:00:08", "walks: short steps"),
        ],
        description: "Patient rises from a chair and walks".to_string(),
        diagnoses: vec!["Label 1".to_string(), "Label 2".to_string()],
        reasoning: "Short steps after rising".to_string(),
        answer: "Label 1, Label 2".to_string(),
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}
