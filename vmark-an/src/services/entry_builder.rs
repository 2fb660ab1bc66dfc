//! Ledger entry builder and `raw_description` codec
//!
//! `raw_description` carries the annotator's input in a readable form:
//!
//! ```text
//! Video description:
//! <description>
//!
//! Segments:
//! 00:00:01-00:00:05: label
//!
//! Final diagnosis: A, B
//! ```
//!
//! Either of the first two blocks may be absent. [`decode_raw_description`] reverses
//! the composition so a saved folder can be reloaded into a draft.

use crate::models::{split_diagnoses, AnnotationDraft, Conversation, LedgerEntry};
use crate::services::duration_probe::round_millis;
use std::path::Path;
use vmark_common::segment::{format_segments, parse_segments};
use vmark_common::{AnnotationSegment, Error, Result};

pub const DESCRIPTION_MARKER: &str = "Video description:";
pub const SEGMENTS_MARKER: &str = "Segments:";
pub const DIAGNOSIS_MARKER: &str = "Final diagnosis:";

const BLOCK_SEPARATOR: &str = "\n\n";

/// Description text sent to the LLM: description block and segment block
pub fn compose_description(description: &str, segments: &[AnnotationSegment]) -> String {
    let description = description.trim();
    let formatted = format_segments(segments);

    let mut parts = Vec::new();
    if !description.is_empty() {
        parts.push(format!("{}\n{}", DESCRIPTION_MARKER, description));
    }
    if !formatted.is_empty() {
        parts.push(format!("{}\n{}", SEGMENTS_MARKER, formatted));
    }
    parts.join(BLOCK_SEPARATOR)
}

/// Composed description followed by the final diagnosis line
pub fn compose_raw_description(composed: &str, final_diagnosis: &str) -> String {
    format!(
        "{}{}{} {}",
        composed, BLOCK_SEPARATOR, DIAGNOSIS_MARKER, final_diagnosis
    )
}

/// Parts recovered from a stored `raw_description`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedDescription {
    pub description: String,
    pub segments: Vec<AnnotationSegment>,
    pub final_diagnosis: String,
}

pub fn decode_raw_description(raw: &str) -> DecodedDescription {
    let (body, final_diagnosis) = split_marker(raw, DIAGNOSIS_MARKER);
    let (description_block, segments_block) = split_marker(body, SEGMENTS_MARKER);

    let description = description_block.trim();
    let description = description
        .strip_prefix(DESCRIPTION_MARKER)
        .unwrap_or(description)
        .trim();

    DecodedDescription {
        description: description.to_string(),
        segments: segments_block.map(parse_segments).unwrap_or_default(),
        final_diagnosis: final_diagnosis.map(str::trim).unwrap_or_default().to_string(),
    }
}

/// Split `text` at a block marker that opens the text or follows a blank line
fn split_marker<'a>(text: &'a str, marker: &str) -> (&'a str, Option<&'a str>) {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix(marker) {
        return ("", Some(rest));
    }
    let separated = format!("{}{}", BLOCK_SEPARATOR, marker);
    match text.find(&separated) {
        Some(pos) => (&text[..pos], Some(&text[pos + separated.len()..])),
        None => (text, None),
    }
}

/// `gpt` turn text: reasoning in `<think>`, answer in `<answer>`
pub fn format_gpt_turn(reasoning: &str, answer: &str) -> String {
    format!(
        "<think>\n{}\n</think>\n\n<answer>\n{}\n</answer>",
        reasoning, answer
    )
}

/// Reasoning and answer from a `gpt` turn; text without tags is all answer
pub fn split_gpt_turn(value: &str) -> (String, String) {
    let reasoning = between(value, "<think>", "</think>");
    let answer = between(value, "<answer>", "</answer>");
    match (reasoning, answer) {
        (None, None) => (String::new(), value.trim().to_string()),
        (r, a) => (
            r.unwrap_or_default().trim().to_string(),
            a.unwrap_or_default().trim().to_string(),
        ),
    }
}

fn between<'a>(text: &'a str, open: &str, close: &str) -> Option<&'a str> {
    let start = text.find(open)? + open.len();
    let end = text[start..].find(close)? + start;
    Some(&text[start..end])
}

/// Build the ledger line for `video_path` from a draft
///
/// `id` is left at 0 for the ledger to assign.
pub fn build_entry(
    video_path: &Path,
    draft: &AnnotationDraft,
    human_prompt: &str,
    duration: f64,
) -> Result<LedgerEntry> {
    if !video_path.is_file() {
        return Err(Error::NotFound(format!(
            "Video file {}",
            video_path.display()
        )));
    }
    let file_name = video_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .ok_or_else(|| Error::InvalidInput(format!("No file name in {}", video_path.display())))?;

    let composed = compose_description(&draft.description, &draft.segments);

    Ok(LedgerEntry {
        id: 0,
        video: LedgerEntry::video_field(&file_name),
        conversations: vec![
            Conversation::human(human_prompt),
            Conversation::gpt(format_gpt_turn(&draft.reasoning, &draft.answer)),
        ],
        duration: round_millis(duration.max(0.0)),
        raw_description: compose_raw_description(&composed, &draft.final_diagnosis()),
        extra: Default::default(),
    })
}

/// Rebuild a draft from a stored entry
pub fn draft_from_entry(entry: &LedgerEntry) -> AnnotationDraft {
    let decoded = decode_raw_description(&entry.raw_description);
    let (reasoning, answer) = entry.turn("gpt").map(split_gpt_turn).unwrap_or_default();
    AnnotationDraft {
        segments: decoded.segments,
        description: decoded.description,
        diagnoses: split_diagnoses(&decoded.final_diagnosis),
        reasoning,
        answer,
    }
}
