//! Unified error types for mixprep
//!
//! Error strategy:
//! - Decode errors (unreadable/empty audio): Fatal, abort the run
//! - Output/history write errors: Fatal, the caller must know the run did not persist
//! - Degraded-input conditions (empty roster, unknown equipment, cutoffs at
//!   Nyquist, silent audio) are NOT errors - each has a defined fallback value
//!
//! All errors include actionable suggestions where possible.

use std::path::PathBuf;
use thiserror::Error;

/// Supported audio formats for helpful error messages
pub const SUPPORTED_FORMATS: &str = "MP3, WAV, FLAC, AIFF, M4A";

/// Top-level error type for mixprep operations
#[derive(Debug, Error)]
pub enum MixprepError {
    #[error("Failed to decode audio file '{path}': {reason}\n  Supported formats: {SUPPORTED_FORMATS}\n  Tip: If the file plays in other apps, it may be corrupted or use an unsupported codec")]
    DecodeError { path: PathBuf, reason: String },

    #[error("Unsupported audio format for '{path}': {format}\n  Supported formats: {SUPPORTED_FORMATS}")]
    UnsupportedFormat { path: PathBuf, format: String },

    #[error("Audio file '{path}' contains no samples\n  Tip: Check that the recording is not empty or truncated")]
    EmptyAudio { path: PathBuf },

    #[error("File not found: '{0}'\n  Tip: Check the path exists and is accessible")]
    FileNotFound(PathBuf),

    #[error("Cannot write output to '{path}': {reason}\n  Tip: Check write permissions for the output directory")]
    OutputError { path: PathBuf, reason: String },

    #[error("Cannot update history file '{path}': {reason}\n  Tip: Pass --no-save to analyze without recording the session")]
    HistoryError { path: PathBuf, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for mixprep operations
pub type Result<T> = std::result::Result<T, MixprepError>;

impl MixprepError {
    /// Create a decode error with context about the issue
    pub fn decode_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MixprepError::DecodeError {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an output error, checking for common issues
    pub fn output_error(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        let path = path.into();
        let reason = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied. Check that you have write access to {}", path.display())
            }
            std::io::ErrorKind::NotFound => {
                format!("Directory does not exist: {}", path.parent().map(|p| p.display().to_string()).unwrap_or_default())
            }
            _ => err.to_string(),
        };
        MixprepError::OutputError { path, reason }
    }

    /// Create a history error from an IO failure
    pub fn history_error(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MixprepError::HistoryError {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
