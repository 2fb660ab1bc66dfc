//! Ledger line model
//!
//! One JSON object per line of `<dataset>/<dataset>.jsonl`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Prefix every ledger `video` field carries
pub const VIDEO_PREFIX: &str = "videos/";

/// One turn of the stored conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub from: String,
    pub value: String,
}

impl Conversation {
    pub fn human(value: impl Into<String>) -> Self {
        Self {
            from: "human".to_string(),
            value: value.into(),
        }
    }

    pub fn gpt(value: impl Into<String>) -> Self {
        Self {
            from: "gpt".to_string(),
            value: value.into(),
        }
    }
}

/// One annotated video in the ledger
///
/// `id` is 0 until the ledger assigns one on first upsert. Fields written by other
/// tools are kept in `extra` and survive rewrites.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    #[serde(default)]
    pub id: u64,
    pub video: String,
    #[serde(default)]
    pub conversations: Vec<Conversation>,
    #[serde(default)]
    pub duration: f64,
    #[serde(default)]
    pub raw_description: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LedgerEntry {
    /// `videos/<file_name>`
    pub fn video_field(file_name: &str) -> String {
        format!("{}{}", VIDEO_PREFIX, file_name)
    }

    /// Source filename, if the `video` field is well-formed
    pub fn video_file_name(&self) -> Option<&str> {
        self.video
            .strip_prefix(VIDEO_PREFIX)
            .filter(|name| !name.is_empty())
    }

    /// Text of the first turn from `speaker`
    pub fn turn(&self, speaker: &str) -> Option<&str> {
        self.conversations
            .iter()
            .find(|c| c.from == speaker)
            .map(|c| c.value.as_str())
    }

    /// Sort key: entries without an assigned id go last
    pub(crate) fn sort_key(&self) -> u64 {
        if self.id == 0 {
            u64::MAX
        } else {
            self.id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_file_name_requires_prefix() {
        let mut entry: LedgerEntry =
            serde_json::from_str(r#"{"id": 1, "video": "videos/a.mp4"}"#).unwrap();
        assert_eq!(entry.video_file_name(), Some("a.mp4"));

        entry.video = "a.mp4".to_string();
        assert_eq!(entry.video_file_name(), None);

        entry.video = "videos/".to_string();
        assert_eq!(entry.video_file_name(), None);
    }

    #[test]
    fn test_unknown_fields_survive_round_trip() {
        let line = r#"{"id":3,"video":"videos/x.mov","conversations":[],"duration":1.5,"raw_description":"","reviewer":"kim"}"#;
        let entry: LedgerEntry = serde_json::from_str(line).unwrap();
        assert_eq!(entry.extra.get("reviewer"), Some(&Value::from("kim")));

        let back = serde_json::to_string(&entry).unwrap();
        assert!(back.contains("\"reviewer\":\"kim\""));
    }
}
