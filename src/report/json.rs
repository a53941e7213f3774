//! JSON export of one analysis session
//!
//! The report is the rendering boundary: everything the pipeline produced
//! as plain structured data. Downstream tools (charting, dashboards) are
//! consumers of this file.

use crate::error::{MixprepError, Result};
use crate::types::{
    AnalysisResult, ComparisonReport, GoodPoint, InstrumentReport, MixRecommendation,
    SessionContext,
};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

/// JSON output schema version
const SCHEMA_VERSION: &str = "1.0";

/// Top-level JSON output structure
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionReport {
    /// Schema version for forward compatibility
    pub version: String,
    pub metadata: ReportMetadata,
    /// User-supplied session context
    pub context: SessionContext,
    /// Whole-mix measurement
    pub mix: AnalysisResult,
    pub mix_good_points: Vec<GoodPoint>,
    pub mix_recommendations: Vec<MixRecommendation>,
    /// One report per separated stem
    pub instruments: Vec<InstrumentReport>,
    /// Comparisons against similar past sessions
    pub comparisons: Vec<ComparisonReport>,
    /// Id of the history entry recorded for this session, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_entry_id: Option<String>,
}

/// Export metadata
#[derive(Debug, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// mixprep version that generated this file
    pub generator_version: String,
    /// Timestamp of the analysis
    pub analyzed_at: String,
    /// Source recording path
    pub source: String,
    /// Deterministic id derived from the source path
    pub recording_id: i32,
}

impl ReportMetadata {
    pub fn for_source(source: &Path) -> Self {
        Self {
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
            analyzed_at: chrono::Utc::now().to_rfc3339(),
            source: source.to_string_lossy().to_string(),
            recording_id: recording_id(source),
        }
    }
}

/// Write the session report to a JSON file
///
/// Uses the atomic write pattern: writes to a temp file first, then
/// renames. This prevents data corruption if the write is interrupted.
pub fn write_report(report: &SessionReport, output_path: &Path) -> Result<()> {
    let temp_path = output_path.with_extension("json.tmp");

    let file = File::create(&temp_path).map_err(|e| MixprepError::OutputError {
        path: output_path.to_path_buf(),
        reason: format!("Failed to create temp file: {}", e),
    })?;

    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, report).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        MixprepError::OutputError {
            path: output_path.to_path_buf(),
            reason: e.to_string(),
        }
    })?;

    // Atomic rename: either succeeds completely or fails without modifying target
    std::fs::rename(&temp_path, output_path).map_err(|e| {
        let _ = std::fs::remove_file(&temp_path);
        MixprepError::OutputError {
            path: output_path.to_path_buf(),
            reason: format!("Failed to finalize file: {}", e),
        }
    })?;

    info!("Wrote session report to {}", output_path.display());

    Ok(())
}

/// Generate a deterministic recording id from a file path
///
/// Uses FNV-1a, masked to the positive i32 range so the id survives
/// systems that treat it as a signed integer.
pub fn recording_id(path: &Path) -> i32 {
    use hash32::{FnvHasher, Hasher as Hash32Hasher};
    use std::hash::Hasher;

    let normalized = normalize_path_for_hash(path);

    let mut hasher = FnvHasher::default();
    hasher.write(normalized.as_bytes());
    let hash = hasher.finish32();

    (hash & 0x7FFF_FFFF) as i32
}

/// Normalize a path string for consistent hashing across platforms
fn normalize_path_for_hash(path: &Path) -> String {
    let path_str = path.to_string_lossy();

    // Forward slashes, lowercased for case-insensitive filesystems
    path_str.replace('\\', "/").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_id_deterministic() {
        let path = Path::new("/gigs/2025-06-01/board_mix.wav");
        assert_eq!(recording_id(path), recording_id(path));
    }

    #[test]
    fn test_recording_id_positive() {
        let paths = [
            "/a.wav",
            "/very/long/path/to/some/deeply/nested/recording.flac",
            "C:\\Recordings\\Live.wav",
        ];

        for path_str in paths {
            let id = recording_id(Path::new(path_str));
            assert!(id > 0, "Recording id should be positive: {}", id);
        }
    }

    #[test]
    fn test_path_normalization() {
        // Windows and Unix spellings of the same path hash the same
        let win = normalize_path_for_hash(Path::new("C:\\Gigs\\Mix.wav"));
        let unix = normalize_path_for_hash(Path::new("c:/gigs/mix.wav"));
        assert_eq!(win, unix);
    }
}
