//! Annotation workbench services
//!
//! - `dataset_scanner`: folder discovery and ordering
//! - `progress_tracker`: next-unprocessed-folder reconciliation
//! - `ledger_store`: JSONL ledger upsert and reads
//! - `video_store`: copy-if-newer into the dataset's `videos/` directory
//! - `duration_probe`: ffprobe duration lookup
//! - `entry_builder`: ledger line construction and `raw_description` codec
//! - `llm_client`: OpenAI-compatible reasoning/answer drafting

pub mod dataset_scanner;
pub mod duration_probe;
pub mod entry_builder;
pub mod ledger_store;
pub mod llm_client;
pub mod progress_tracker;
pub mod video_store;

pub use dataset_scanner::{dataset_name, DatasetFolder, DatasetScanner, FolderContents, ScanError, ScanOrder};
pub use duration_probe::{duration_or_zero, probe_duration, ProbeError};
pub use entry_builder::{build_entry, decode_raw_description, draft_from_entry, DecodedDescription};
pub use ledger_store::{LedgerError, LedgerHandle, UpsertOutcome};
pub use llm_client::{LlmAnswer, LlmClient, LlmError};
pub use progress_tracker::{find_next, find_start, ProcessedVideos, ProgressSummary};
pub use video_store::{copy_if_newer, locate_source, CopyOutcome};
