//! # vmark Common Library
//!
//! Shared code for the vmark annotation tools including:
//! - Error types
//! - Configuration store (API settings, output folder, diagnosis labels)
//! - Annotation segment model and line parser

pub mod config;
pub mod error;
pub mod fs_utils;
pub mod segment;

pub use error::{Error, Result};
pub use segment::{AnnotationSegment, SegmentList};
