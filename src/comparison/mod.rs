//! Cross-session comparison
//!
//! Diffs the current analysis against similar past sessions, normalizing
//! for equipment differences first: a mixer-tier correction on RMS and a
//! loudspeaker-brightness correction on the top two bands. Insights are
//! generated from fixed thresholds; the engine never fails.

use crate::history::HistoryEntry;
use crate::types::{
    AnalysisResult, BandComparison, ComparisonReport, Insight, InsightKind, InsightSeverity,
    MatchType, RmsComparison, SessionContext, WidthComparison, MIX_BANDS,
};

/// Console families ranked by summing-quality tier
const MIXER_TIERS: [(&str, f64); 4] = [("cl", 1.0), ("ql", 0.8), ("sq", 0.7), ("x32", 0.5)];

/// dB of RMS difference attributed to one full tier step
const TIER_CORRECTION_DB: f64 = 2.0;

/// Brightness correction multipliers for the Presence and Brilliance bands
const PRESENCE_BRIGHTNESS_FACTOR: f64 = 1.5;
const BRILLIANCE_BRIGHTNESS_FACTOR: f64 = 2.0;

/// Compares the current session against qualifying history entries
pub struct ComparisonEngine<'a> {
    current: &'a AnalysisResult,
    context: &'a SessionContext,
}

impl<'a> ComparisonEngine<'a> {
    pub fn new(current: &'a AnalysisResult, context: &'a SessionContext) -> Self {
        Self { current, context }
    }

    /// One report per past entry, in the order given
    pub fn compare_all(&self, past_entries: &[HistoryEntry]) -> Vec<ComparisonReport> {
        past_entries.iter().map(|e| self.compare_entry(e)).collect()
    }

    fn compare_entry(&self, entry: &HistoryEntry) -> ComparisonReport {
        let match_type = self.match_type(entry);

        // RMS with the mixer-tier correction applied to the past value
        let correction = mixer_correction(&self.context.mixer, &entry.equipment.mixer);
        let past_rms = entry.analysis.rms_db;
        let past_corrected = past_rms + correction;
        let rms = RmsComparison {
            current: self.current.rms_db,
            past_raw: past_rms,
            past_corrected,
            difference: self.current.rms_db - past_corrected,
            correction_applied: correction,
        };

        // Stereo width is compared uncorrected
        let stereo_width = WidthComparison {
            current: self.current.stereo_width,
            past: entry.analysis.stereo_width,
            difference: self.current.stereo_width - entry.analysis.stereo_width,
        };

        // Per-band balance with the loudspeaker-brightness correction
        let frequency_balance = if entry.analysis.band_energies.len()
            == self.current.band_energies.len()
            && !entry.analysis.band_energies.is_empty()
        {
            let corrections =
                pa_corrections(&self.context.pa_system, &entry.equipment.pa_system);
            let differences: Vec<f64> = self
                .current
                .band_energies
                .iter()
                .zip(entry.analysis.band_energies.iter())
                .zip(corrections.iter())
                .map(|((&current, &past), &corr)| current - (past + corr))
                .collect();
            Some(BandComparison {
                differences,
                pa_correction_applied: corrections.iter().any(|&c| c != 0.0),
            })
        } else {
            None
        };

        let insights = generate_insights(match_type, &rms, &stereo_width, &frequency_balance);

        ComparisonReport {
            past_id: entry.id.clone(),
            past_date: entry.timestamp.clone(),
            past_venue: or_unknown(&entry.metadata.venue),
            past_mixer: or_unknown(&entry.equipment.mixer),
            past_pa: or_unknown(&entry.equipment.pa_system),
            match_type,
            rms,
            stereo_width,
            frequency_balance,
            insights,
        }
    }

    /// Same scoring signals as the similarity query, bucketed into a class
    fn match_type(&self, entry: &HistoryEntry) -> MatchType {
        let mut score = 0u32;

        let capacity_diff = (self.context.venue_capacity as i64
            - entry.metadata.venue_capacity as i64)
            .abs();
        if capacity_diff < 50 {
            score += 30;
        }
        if self.context.mixer == entry.equipment.mixer {
            score += 40;
        }
        if self.context.pa_system == entry.equipment.pa_system {
            score += 30;
        }

        if score >= 80 {
            MatchType::ExactMatch
        } else if score >= 50 {
            MatchType::Similar
        } else {
            MatchType::Different
        }
    }
}

/// Tier for a known console family, by lowercase substring
fn mixer_tier(name: &str) -> Option<f64> {
    let lower = name.to_lowercase();
    MIXER_TIERS
        .iter()
        .find(|(key, _)| lower.contains(key))
        .map(|&(_, tier)| tier)
}

/// RMS correction in dB applied to the past value
///
/// Zero unless both names map to a known family and differ; an unknown
/// console gets no correction rather than a guessed tier.
fn mixer_correction(current: &str, past: &str) -> f64 {
    if current.is_empty() || past.is_empty() || current == past {
        return 0.0;
    }

    match (mixer_tier(current), mixer_tier(past)) {
        (Some(current_tier), Some(past_tier)) => {
            (current_tier - past_tier) * TIER_CORRECTION_DB
        }
        _ => 0.0,
    }
}

/// Per-band corrections added to the past band energies
///
/// Only the Presence and Brilliance bands are corrected, and only when the
/// two systems differ in brightness. The sign is inverted so the past
/// value is moved toward what the current system would have shown.
fn pa_corrections(current: &str, past: &str) -> [f64; 7] {
    let mut corrections = [0.0f64; 7];

    if current.is_empty() || past.is_empty() || current == past {
        return corrections;
    }

    let brightness = |name: &str| if name.to_lowercase().contains("jbl") { 2.0 } else { 0.0 };
    let diff = brightness(current) - brightness(past);

    corrections[5] = -diff * PRESENCE_BRIGHTNESS_FACTOR;
    corrections[6] = -diff * BRILLIANCE_BRIGHTNESS_FACTOR;
    corrections
}

/// Fixed-threshold natural-language observations
fn generate_insights(
    match_type: MatchType,
    rms: &RmsComparison,
    width: &WidthComparison,
    bands: &Option<BandComparison>,
) -> Vec<Insight> {
    let mut insights = Vec::new();

    if match_type == MatchType::ExactMatch {
        if rms.difference > 2.0 {
            insights.push(Insight {
                kind: InsightKind::Improvement,
                message: format!(
                    "RMS improved by +{:.1}dB over the previous session (same conditions)",
                    rms.difference
                ),
                severity: InsightSeverity::Good,
            });
        } else if rms.difference < -2.0 {
            insights.push(Insight {
                kind: InsightKind::Regression,
                message: format!(
                    "RMS fell by {:.1}dB vs the previous session (same conditions)",
                    rms.difference
                ),
                severity: InsightSeverity::Warning,
            });
        } else {
            insights.push(Insight {
                kind: InsightKind::Stable,
                message: format!(
                    "RMS is on par with the previous session ({:+.1}dB)",
                    rms.difference
                ),
                severity: InsightSeverity::Info,
            });
        }
    } else if rms.correction_applied != 0.0 {
        insights.push(Insight {
            kind: InsightKind::Info,
            message: format!(
                "RMS difference {:+.1}dB (equipment correction of {:+.1}dB applied)",
                rms.difference, rms.correction_applied
            ),
            severity: InsightSeverity::Info,
        });
    }

    if width.difference.abs() > 10.0 {
        insights.push(Insight {
            kind: InsightKind::Change,
            message: format!("Stereo width changed by {:+.1}%", width.difference),
            severity: InsightSeverity::Info,
        });
    }

    if let Some(bands) = bands {
        for (i, &diff) in bands.differences.iter().enumerate() {
            if diff.abs() > 6.0 {
                let name = MIX_BANDS.get(i).map(|b| b.2).unwrap_or("Band");
                insights.push(Insight {
                    kind: InsightKind::Change,
                    message: format!("{} changed by {:+.1}dB", name, diff),
                    severity: InsightSeverity::Info,
                });
            }
        }
    }

    insights
}

fn or_unknown(value: &str) -> String {
    if value.is_empty() {
        "unknown".to_string()
    } else {
        value.to_string()
    }
}
