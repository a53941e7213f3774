//! Core data types for mixprep
//!
//! These types represent the domain model and flow through the pipeline.

use serde::{Deserialize, Serialize};

// =============================================================================
// Instrument primitives
// =============================================================================

/// Canonical instrument tags recognized by the roster parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentTag {
    Vocal,
    Kick,
    Snare,
    Hihat,
    Tom,
    Bass,
    ElectricGuitar,
    AcousticGuitar,
    Keyboard,
    Synth,
}

impl InstrumentTag {
    /// All tags, in the order they appear in reports
    pub const ALL: [InstrumentTag; 10] = [
        InstrumentTag::Vocal,
        InstrumentTag::Kick,
        InstrumentTag::Snare,
        InstrumentTag::Hihat,
        InstrumentTag::Tom,
        InstrumentTag::Bass,
        InstrumentTag::ElectricGuitar,
        InstrumentTag::AcousticGuitar,
        InstrumentTag::Keyboard,
        InstrumentTag::Synth,
    ];

    /// Stable snake_case identifier (matches the serialized form)
    pub fn as_str(self) -> &'static str {
        match self {
            InstrumentTag::Vocal => "vocal",
            InstrumentTag::Kick => "kick",
            InstrumentTag::Snare => "snare",
            InstrumentTag::Hihat => "hihat",
            InstrumentTag::Tom => "tom",
            InstrumentTag::Bass => "bass",
            InstrumentTag::ElectricGuitar => "electric_guitar",
            InstrumentTag::AcousticGuitar => "acoustic_guitar",
            InstrumentTag::Keyboard => "keyboard",
            InstrumentTag::Synth => "synth",
        }
    }

    /// Human-readable name for console output
    pub fn display_name(self) -> &'static str {
        match self {
            InstrumentTag::Vocal => "Vocal",
            InstrumentTag::Kick => "Kick",
            InstrumentTag::Snare => "Snare",
            InstrumentTag::Hihat => "Hi-hat",
            InstrumentTag::Tom => "Tom",
            InstrumentTag::Bass => "Bass",
            InstrumentTag::ElectricGuitar => "Electric guitar",
            InstrumentTag::AcousticGuitar => "Acoustic guitar",
            InstrumentTag::Keyboard => "Keyboard",
            InstrumentTag::Synth => "Synth",
        }
    }
}

/// How much acoustic stage sound reaches the audience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageVolume {
    High,
    Medium,
    Low,
    None,
}

impl StageVolume {
    /// Parse a CLI/stored value; anything unrecognized degrades to `Medium`
    pub fn parse(value: &str) -> Self {
        match value.to_lowercase().as_str() {
            "high" => StageVolume::High,
            "low" => StageVolume::Low,
            "none" => StageVolume::None,
            _ => StageVolume::Medium,
        }
    }

    /// Feedback-relevant: audible stage sound mixes with the PA
    pub fn is_audible(self) -> bool {
        matches!(self, StageVolume::High | StageVolume::Medium)
    }
}

// =============================================================================
// Audio buffer types
// =============================================================================

/// Decoded stereo audio at the analysis sample rate
///
/// Mono sources are duplicated to two identical channels at decode time,
/// so downstream code always sees two equal-length channels.
#[derive(Debug, Clone)]
pub struct StereoBuffer {
    /// Left channel samples normalized to [-1.0, 1.0]
    pub left: Vec<f32>,
    /// Right channel samples normalized to [-1.0, 1.0]
    pub right: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl StereoBuffer {
    pub fn new(left: Vec<f32>, right: Vec<f32>, sample_rate: u32) -> Self {
        let num_samples = left.len().min(right.len());
        // Guard against division by zero - use 0 duration for invalid sample rate
        let duration = if sample_rate > 0 {
            num_samples as f64 / sample_rate as f64
        } else {
            0.0
        };
        Self {
            left,
            right,
            sample_rate,
            duration,
        }
    }

    /// Number of samples per channel
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Check if buffer is empty
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Mono mix: per-sample mean of both channels
    pub fn mono(&self) -> Vec<f32> {
        self.left
            .iter()
            .zip(self.right.iter())
            .map(|(l, r)| (l + r) * 0.5)
            .collect()
    }
}

/// A filter-derived single-channel approximation of one instrument
#[derive(Debug, Clone)]
pub struct Stem {
    pub tag: InstrumentTag,
    pub samples: Vec<f32>,
}

// =============================================================================
// Whole-mix analysis
// =============================================================================

/// The seven fixed mix bands: (low Hz, high Hz, name)
pub const MIX_BANDS: [(f64, f64, &str); 7] = [
    (20.0, 80.0, "Sub Bass"),
    (80.0, 250.0, "Bass"),
    (250.0, 500.0, "Low-Mid"),
    (500.0, 2000.0, "Mid"),
    (2000.0, 4000.0, "High-Mid"),
    (4000.0, 8000.0, "Presence"),
    (8000.0, 16000.0, "Brilliance"),
];

/// Complete whole-mix measurement; immutable once produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// RMS(side) / RMS(mid) as a percentage
    pub stereo_width: f64,
    /// Pearson correlation of left vs right (-1..1, 1.0 for mono)
    pub correlation: f64,
    /// Peak level in dBFS (-100 floor)
    pub peak_db: f64,
    /// RMS level in dBFS (-100 floor)
    pub rms_db: f64,
    /// Peak minus RMS, in dB
    pub crest_factor: f64,
    /// 95th minus 5th percentile of half-second-hop RMS frames, in dB
    pub dynamic_range: f64,
    /// Energy per fixed band (see [`MIX_BANDS`]), dB relative to spectral max
    pub band_energies: [f64; 7],
    /// Mean of the onset-strength envelope
    pub avg_onset: f64,
    /// Max of the onset-strength envelope
    pub max_onset: f64,
    /// Detected onsets per second of audio
    pub onset_density: f64,
    /// Linear RMS of the signal below 40 Hz (0.0 when the filter is skipped)
    pub very_low_rms: f64,
    /// Sub Bass band energy minus Bass band energy, dB
    pub sub_bass_ratio: f64,
    /// Analyzed duration in seconds
    pub duration_seconds: f64,
}

// =============================================================================
// Findings
// =============================================================================

/// Recommendation priority, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Critical,
    Important,
    Optional,
}

/// Issue severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Important,
}

/// Something the engineer already got right; impact is a 1-5 rating
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoodPoint {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub point: String,
    pub impact: u8,
}

/// A detected problem on a stem or the mix
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub severity: Severity,
    pub problem: String,
    pub detail: String,
}

/// Console-specific operating sequence attached to a recommendation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsoleSequence {
    pub mixer: String,
    pub steps: Vec<String>,
}

/// A concrete corrective action for one instrument channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub priority: Priority,
    pub title: String,
    pub steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mixer_specific: Option<ConsoleSequence>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub expected_results: Vec<String>,
}

/// A corrective action on the master bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixRecommendation {
    pub priority: Priority,
    pub category: String,
    pub issue: String,
    pub solution: String,
    pub impact: u8,
}

// =============================================================================
// Instrument reports
// =============================================================================

/// Level of one named instrument-specific band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandLevel {
    pub name: String,
    pub level_db: f64,
}

/// Full per-instrument analysis output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentReport {
    pub tag: InstrumentTag,
    pub rms_db: f64,
    pub peak_db: f64,
    pub crest_factor: f64,
    /// Stem RMS relative to the whole-mix RMS, dB
    pub level_vs_mix: f64,
    pub freq_bands: Vec<BandLevel>,
    pub good_points: Vec<GoodPoint>,
    pub issues: Vec<Issue>,
    pub recommendations: Vec<Recommendation>,
}

impl InstrumentReport {
    /// Look up a named band level, if the instrument defines that band
    pub fn band(&self, name: &str) -> Option<f64> {
        self.freq_bands
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.level_db)
    }
}

// =============================================================================
// Session context
// =============================================================================

/// User-supplied context for one analysis session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub venue: String,
    pub venue_capacity: u32,
    pub stage_volume: StageVolume,
    pub mixer: String,
    pub pa_system: String,
    pub roster: String,
    pub notes: String,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            venue: String::new(),
            venue_capacity: 150,
            stage_volume: StageVolume::Medium,
            mixer: String::new(),
            pa_system: String::new(),
            roster: String::new(),
            notes: String::new(),
        }
    }
}

// =============================================================================
// Comparison output
// =============================================================================

/// How closely a past session's context matches the current one
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    ExactMatch,
    Similar,
    Different,
}

/// RMS comparison with the mixer-tier correction applied to the past value
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RmsComparison {
    pub current: f64,
    pub past_raw: f64,
    pub past_corrected: f64,
    pub difference: f64,
    pub correction_applied: f64,
}

/// Stereo-width comparison (no equipment correction)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WidthComparison {
    pub current: f64,
    pub past: f64,
    pub difference: f64,
}

/// Per-band frequency-balance comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandComparison {
    /// Current minus PA-corrected past, per mix band
    pub differences: Vec<f64>,
    pub pa_correction_applied: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Improvement,
    Regression,
    Stable,
    Change,
    Info,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightSeverity {
    Good,
    Warning,
    Info,
}

/// One natural-language observation derived from a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub message: String,
    pub severity: InsightSeverity,
}

/// Comparison of the current session against one historical entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonReport {
    pub past_id: String,
    pub past_date: String,
    pub past_venue: String,
    pub past_mixer: String,
    pub past_pa: String,
    pub match_type: MatchType,
    pub rms: RmsComparison,
    pub stereo_width: WidthComparison,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_balance: Option<BandComparison>,
    pub insights: Vec<Insight>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mono_is_channel_mean() {
        let buffer = StereoBuffer::new(vec![0.5, 0.8, 1.0], vec![0.3, 0.2, 0.0], 22050);
        let mono = buffer.mono();
        assert!((mono[0] - 0.4).abs() < 1e-6);
        assert!((mono[1] - 0.5).abs() < 1e-6);
        assert!((mono[2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_duration_guard_for_zero_sample_rate() {
        let buffer = StereoBuffer::new(vec![0.0; 100], vec![0.0; 100], 0);
        assert_eq!(buffer.duration, 0.0);
    }

    #[test]
    fn test_stage_volume_parse_degrades_to_medium() {
        assert_eq!(StageVolume::parse("HIGH"), StageVolume::High);
        assert_eq!(StageVolume::parse("none"), StageVolume::None);
        assert_eq!(StageVolume::parse("whatever"), StageVolume::Medium);
    }

    #[test]
    fn test_band_lookup() {
        let report = InstrumentReport {
            tag: InstrumentTag::Kick,
            rms_db: -20.0,
            peak_db: -6.0,
            crest_factor: 14.0,
            level_vs_mix: -2.0,
            freq_bands: vec![BandLevel {
                name: "fundamental".to_string(),
                level_db: -18.0,
            }],
            good_points: vec![],
            issues: vec![],
            recommendations: vec![],
        };
        assert_eq!(report.band("fundamental"), Some(-18.0));
        assert_eq!(report.band("click"), None);
    }
}
