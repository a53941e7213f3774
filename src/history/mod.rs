//! Session history repository
//!
//! Append-only store of past analysis results, queried for
//! similar-context entries before a comparison run. The store is injected
//! into the pipeline; the core contract is exactly two operations.

use crate::error::{MixprepError, Result};
use crate::types::{AnalysisResult, SessionContext};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Minimum similarity score for an entry to qualify as comparable
const MIN_SIMILARITY_SCORE: u32 = 21;

/// Maximum number of entries returned by a similarity query
const MAX_SIMILAR_ENTRIES: usize = 3;

/// The subset of an [`AnalysisResult`] worth keeping across sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSnapshot {
    pub rms_db: f64,
    pub peak_db: f64,
    pub stereo_width: f64,
    pub crest_factor: f64,
    pub band_energies: Vec<f64>,
}

impl From<&AnalysisResult> for AnalysisSnapshot {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            rms_db: result.rms_db,
            peak_db: result.peak_db,
            stereo_width: result.stereo_width,
            crest_factor: result.crest_factor,
            band_energies: result.band_energies.to_vec(),
        }
    }
}

/// Equipment pair recorded with each entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquipmentNames {
    pub mixer: String,
    pub pa_system: String,
}

/// One persisted session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: String,
    pub metadata: SessionContext,
    pub analysis: AnalysisSnapshot,
    pub equipment: EquipmentNames,
}

/// Append-only history contract consumed by the comparison step
pub trait HistoryStore {
    /// Past entries with a context similar to the given one, best first
    fn query_similar(&self, context: &SessionContext) -> Vec<HistoryEntry>;

    /// Persist a new entry; returns its id
    fn append(&mut self, analysis: &AnalysisResult, context: &SessionContext) -> Result<String>;
}

/// History persisted as one JSON file
///
/// Loads on construction (a missing or unreadable file is an empty
/// history, never an error) and rewrites atomically on append.
#[derive(Debug)]
pub struct JsonHistoryStore {
    path: PathBuf,
    entries: Vec<HistoryEntry>,
}

impl JsonHistoryStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_entries(&path);
        debug!(
            "Loaded {} history entries from {}",
            entries.len(),
            path.display()
        );
        Self { path, entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Atomic rewrite: temp file in the same directory, then rename
    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MixprepError::history_error(&self.path, e.to_string()))?;
            }
        }

        let temp_path = self.path.with_extension("json.tmp");
        let file = File::create(&temp_path)
            .map_err(|e| MixprepError::history_error(&self.path, e.to_string()))?;

        serde_json::to_writer_pretty(BufWriter::new(file), &self.entries).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            MixprepError::history_error(&self.path, e.to_string())
        })?;

        std::fs::rename(&temp_path, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            MixprepError::history_error(&self.path, e.to_string())
        })?;

        Ok(())
    }
}

impl HistoryStore for JsonHistoryStore {
    fn query_similar(&self, context: &SessionContext) -> Vec<HistoryEntry> {
        let mut scored: Vec<(u32, &HistoryEntry)> = self
            .entries
            .iter()
            .map(|e| (similarity_score(context, e), e))
            .filter(|(score, _)| *score >= MIN_SIMILARITY_SCORE)
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(MAX_SIMILAR_ENTRIES)
            .map(|(_, e)| e.clone())
            .collect()
    }

    fn append(&mut self, analysis: &AnalysisResult, context: &SessionContext) -> Result<String> {
        let now = chrono::Utc::now();
        let entry = HistoryEntry {
            id: now.format("%Y%m%d_%H%M%S").to_string(),
            timestamp: now.to_rfc3339(),
            metadata: context.clone(),
            analysis: AnalysisSnapshot::from(analysis),
            equipment: EquipmentNames {
                mixer: context.mixer.clone(),
                pa_system: context.pa_system.clone(),
            },
        };

        let id = entry.id.clone();
        self.entries.push(entry);
        self.save()?;

        info!("Recorded session {} in {}", id, self.path.display());
        Ok(id)
    }
}

/// Context similarity: capacity within 50 (+30), same mixer (+40), same PA (+30)
fn similarity_score(context: &SessionContext, entry: &HistoryEntry) -> u32 {
    let mut score = 0;

    let capacity_diff =
        (context.venue_capacity as i64 - entry.metadata.venue_capacity as i64).abs();
    if capacity_diff < 50 {
        score += 30;
    }

    if context.mixer == entry.equipment.mixer {
        score += 40;
    }

    if context.pa_system == entry.equipment.pa_system {
        score += 30;
    }

    score
}

fn load_entries(path: &Path) -> Vec<HistoryEntry> {
    if !path.exists() {
        return Vec::new();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            debug!("Could not open history file: {}", e);
            return Vec::new();
        }
    };

    match serde_json::from_reader(BufReader::new(file)) {
        Ok(entries) => entries,
        Err(e) => {
            debug!("Could not parse history file: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StageVolume;
    use tempfile::TempDir;

    fn test_result() -> AnalysisResult {
        AnalysisResult {
            stereo_width: 18.0,
            correlation: 0.96,
            peak_db: -3.0,
            rms_db: -18.0,
            crest_factor: 15.0,
            dynamic_range: 9.0,
            band_energies: [-40.0, -35.0, -33.0, -30.0, -34.0, -38.0, -45.0],
            avg_onset: 1.4,
            max_onset: 6.0,
            onset_density: 2.2,
            very_low_rms: 0.0005,
            sub_bass_ratio: -5.0,
            duration_seconds: 180.0,
        }
    }

    fn context(capacity: u32, mixer: &str, pa: &str) -> SessionContext {
        SessionContext {
            venue: "Test Hall".to_string(),
            venue_capacity: capacity,
            stage_volume: StageVolume::Medium,
            mixer: mixer.to_string(),
            pa_system: pa.to_string(),
            roster: String::new(),
            notes: String::new(),
        }
    }

    #[test]
    fn test_append_and_query_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = JsonHistoryStore::open(&path);
        assert!(store.is_empty());

        let ctx = context(150, "CL5", "d&b");
        let id = store.append(&test_result(), &ctx).unwrap();
        assert!(!id.is_empty());
        assert!(path.exists());

        // Re-open from disk and query with the same context
        let store = JsonHistoryStore::open(&path);
        assert_eq!(store.len(), 1);
        let similar = store.query_similar(&ctx);
        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].equipment.mixer, "CL5");
    }

    #[test]
    fn test_dissimilar_context_does_not_qualify() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = JsonHistoryStore::open(&path);
        store
            .append(&test_result(), &context(150, "CL5", "d&b"))
            .unwrap();

        // Different capacity bracket, mixer and PA: score 0
        let similar = store.query_similar(&context(1500, "X32", "JBL"));
        assert!(similar.is_empty());
    }

    #[test]
    fn test_capacity_proximity_alone_scores_30_and_qualifies() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = JsonHistoryStore::open(&path);
        store
            .append(&test_result(), &context(150, "CL5", "d&b"))
            .unwrap();

        // Capacity within 50 but different equipment: score 30 > threshold
        let similar = store.query_similar(&context(120, "X32", "JBL"));
        assert_eq!(similar.len(), 1);
    }

    #[test]
    fn test_query_caps_at_three_best_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        let mut store = JsonHistoryStore::open(&path);
        let ctx = context(150, "CL5", "d&b");
        for _ in 0..5 {
            store.append(&test_result(), &ctx).unwrap();
        }

        assert_eq!(store.query_similar(&ctx).len(), 3);
    }

    #[test]
    fn test_missing_or_corrupt_file_is_empty_history() {
        let dir = TempDir::new().unwrap();

        let store = JsonHistoryStore::open(dir.path().join("nope.json"));
        assert!(store.is_empty());

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, b"not json at all").unwrap();
        let store = JsonHistoryStore::open(&bad);
        assert!(store.is_empty());
    }
}
