//! Annotation segments and the `start-end: label` line format
//!
//! A segment is a labeled time range inside a video. Segments are written to the
//! ledger one per line as `start-end: label`; [`parse_line`] reads them back.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// A labeled time range within a video
///
/// Time codes are kept as the annotator typed them (e.g. `00:01:05` or `12.5`).
/// Overlapping ranges are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSegment {
    pub start_time: String,
    pub end_time: String,
    pub label: String,
}

impl AnnotationSegment {
    pub fn new(
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self {
            start_time: start_time.into(),
            end_time: end_time.into(),
            label: label.into(),
        }
    }

    /// Render as a single `start-end: label` line
    pub fn to_line(&self) -> String {
        format!("{}-{}: {}", self.start_time, self.end_time, self.label)
    }
}

/// Parse one `start-end: label` line
///
/// Returns `None` for blank lines, lines without a `-`, and lines where either
/// side of the time range is empty. The label separator is the first colon after
/// the first dash that is not part of a time code, so `00:00:01-00:00:05: text`
/// splits as expected while `1-2:3 people` keeps `3 people` as its label. With no
/// separator the label is empty.
pub fn parse_line(line: &str) -> Option<AnnotationSegment> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let dash = line.find('-')?;

    let (range, label) = match find_label_separator(line, dash) {
        Some(colon) => (&line[..colon], line[colon + 1..].trim()),
        None => (line, ""),
    };

    let (start, end) = range.split_once('-')?;
    let start = start.trim();
    let end = end.trim();
    if start.is_empty() || end.is_empty() {
        tracing::debug!(line = %line, "Rejected segment line with empty time bound");
        return None;
    }

    Some(AnnotationSegment::new(start, end, label))
}

fn find_label_separator(line: &str, dash: usize) -> Option<usize> {
    let bytes = line.as_bytes();
    (dash + 1..bytes.len()).find(|&i| bytes[i] == b':' && !is_time_code_colon(bytes, i))
}

/// A colon between a digit and a two-digit group ending at `:`, `.`, whitespace
/// or end of line
fn is_time_code_colon(bytes: &[u8], i: usize) -> bool {
    if !bytes[i - 1].is_ascii_digit() {
        return false;
    }
    let two_digits = bytes
        .get(i + 1..i + 3)
        .is_some_and(|group| group.iter().all(u8::is_ascii_digit));
    two_digits
        && bytes
            .get(i + 3)
            .map_or(true, |&b| b == b':' || b == b'.' || b.is_ascii_whitespace())
}

/// Format segments as newline-joined `start-end: label` lines
pub fn format_segments(segments: &[AnnotationSegment]) -> String {
    segments
        .iter()
        .map(AnnotationSegment::to_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse newline-separated segment lines, skipping lines that do not parse
pub fn parse_segments(text: &str) -> Vec<AnnotationSegment> {
    text.lines().filter_map(parse_line).collect()
}

/// Ordered, editable list of segments for the folder currently being annotated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SegmentList {
    segments: Vec<AnnotationSegment>,
}

impl SegmentList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment; end time and label are required
    pub fn add(&mut self, start_time: &str, end_time: &str, label: &str) -> Result<()> {
        let segment = Self::checked(start_time, end_time, label)?;
        self.segments.push(segment);
        Ok(())
    }

    /// Replace the segment at `index`
    pub fn edit(&mut self, index: usize, start_time: &str, end_time: &str, label: &str) -> Result<()> {
        self.check_index(index)?;
        self.segments[index] = Self::checked(start_time, end_time, label)?;
        Ok(())
    }

    /// Remove and return the segment at `index`
    pub fn delete(&mut self, index: usize) -> Result<AnnotationSegment> {
        self.check_index(index)?;
        Ok(self.segments.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&AnnotationSegment> {
        self.segments.get(index)
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Replace the whole list (e.g. when a saved folder is reloaded)
    pub fn set(&mut self, segments: Vec<AnnotationSegment>) {
        self.segments = segments;
    }

    pub fn as_slice(&self) -> &[AnnotationSegment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn to_text(&self) -> String {
        format_segments(&self.segments)
    }

    fn checked(start_time: &str, end_time: &str, label: &str) -> Result<AnnotationSegment> {
        let end_time = end_time.trim();
        let label = label.trim();
        if end_time.is_empty() {
            return Err(Error::InvalidInput("Segment end time is required".to_string()));
        }
        if label.is_empty() {
            return Err(Error::InvalidInput("Segment label is required".to_string()));
        }
        Ok(AnnotationSegment::new(start_time.trim(), end_time, label))
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.segments.len() {
            return Err(Error::InvalidInput(format!(
                "Segment index {} out of range (have {})",
                index,
                self.segments.len()
            )));
        }
        Ok(())
    }
}

impl From<Vec<AnnotationSegment>> for SegmentList {
    fn from(segments: Vec<AnnotationSegment>) -> Self {
        Self { segments }
    }
}
