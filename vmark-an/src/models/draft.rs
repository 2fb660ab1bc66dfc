//! Annotation draft: what the annotator has entered for the current folder
//!
//! Validation here is the input-validation tier: it runs before any LLM call or
//! ledger write and never touches state.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use vmark_common::AnnotationSegment;

/// Minimum length (in characters) of the overall video description
pub const MIN_DESCRIPTION_CHARS: usize = 10;

/// Separator between selected diagnoses in the final diagnosis string
pub const DIAGNOSIS_SEPARATOR: &str = ", ";

/// Draft validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Video description must be at least {0} characters")]
    DescriptionTooShort(usize),

    #[error("Select or enter at least one diagnosis")]
    NoDiagnosis,

    #[error("An answer is required before saving (generate one or enter it manually)")]
    MissingAnswer,
}

/// Everything collected for one folder before it is saved
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnnotationDraft {
    pub segments: Vec<AnnotationSegment>,
    pub description: String,
    pub diagnoses: Vec<String>,
    pub reasoning: String,
    pub answer: String,
}

impl AnnotationDraft {
    /// Selected diagnoses joined with `", "`
    pub fn final_diagnosis(&self) -> String {
        self.selected_diagnoses().join(DIAGNOSIS_SEPARATOR)
    }

    fn selected_diagnoses(&self) -> Vec<&str> {
        self.diagnoses
            .iter()
            .map(|d| d.trim())
            .filter(|d| !d.is_empty())
            .collect()
    }

    /// Checks required before asking the LLM for a reasoning chain
    pub fn validate_for_generate(&self) -> Result<(), ValidationError> {
        if self.description.trim().chars().count() < MIN_DESCRIPTION_CHARS {
            return Err(ValidationError::DescriptionTooShort(MIN_DESCRIPTION_CHARS));
        }
        if self.selected_diagnoses().is_empty() {
            return Err(ValidationError::NoDiagnosis);
        }
        Ok(())
    }

    /// Checks required before writing the ledger
    pub fn validate_for_save(&self) -> Result<(), ValidationError> {
        self.validate_for_generate()?;
        if self.answer.trim().is_empty() {
            return Err(ValidationError::MissingAnswer);
        }
        Ok(())
    }
}

/// Split a stored final diagnosis string back into its labels
pub fn split_diagnoses(final_diagnosis: &str) -> Vec<String> {
    final_diagnosis
        .split(DIAGNOSIS_SEPARATOR.trim())
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
