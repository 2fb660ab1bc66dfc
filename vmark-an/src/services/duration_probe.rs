//! Video duration via `ffprobe`

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Probe errors
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Video file not found: {0}")]
    VideoNotFound(String),

    #[error("ffprobe could not be started: {0}")]
    NotAvailable(std::io::Error),

    #[error("ffprobe failed (exit code {exit_code:?}): {stderr}")]
    ExecutionFailed {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Failed to parse ffprobe output: {0}")]
    ParseError(String),
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: ProbeFormat,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Container duration in seconds
pub async fn probe_duration(path: &Path) -> Result<f64, ProbeError> {
    if !path.exists() {
        return Err(ProbeError::VideoNotFound(path.to_string_lossy().to_string()));
    }

    let output = tokio::process::Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .output()
        .await
        .map_err(ProbeError::NotAvailable)?;

    if !output.status.success() {
        return Err(ProbeError::ExecutionFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

fn parse_probe_output(stdout: &str) -> Result<f64, ProbeError> {
    let parsed: ProbeOutput =
        serde_json::from_str(stdout).map_err(|e| ProbeError::ParseError(e.to_string()))?;

    let raw = parsed
        .format
        .duration
        .ok_or_else(|| ProbeError::ParseError("format.duration missing".to_string()))?;

    let seconds: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ProbeError::ParseError(format!("invalid duration '{}'", raw)))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ProbeError::ParseError(format!("invalid duration '{}'", raw)));
    }
    Ok(seconds)
}

/// Duration rounded to milliseconds, or 0.0 when probing fails
pub async fn duration_or_zero(path: &Path) -> f64 {
    match probe_duration(path).await {
        Ok(seconds) => round_millis(seconds),
        Err(e) => {
            tracing::warn!(video = %path.display(), error = %e, "Could not read video duration");
            0.0
        }
    }
}

pub fn round_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}
