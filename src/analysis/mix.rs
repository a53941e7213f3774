//! Whole-mix analysis
//!
//! Computes the stereo-image, dynamics, frequency, transient and low-end
//! metrics of the 2-mix, then evaluates the master-bus rule set against
//! them. Every measurement is a pure function of the buffer; the result is
//! never mutated downstream.

use crate::analysis::{filters::Cascade, onset, stft};
use crate::equipment::{MixerSpec, PaSpec};
use crate::types::{
    AnalysisResult, GoodPoint, MixRecommendation, Priority, SessionContext, StereoBuffer,
    MIX_BANDS,
};
use tracing::debug;

/// Analyze a decoded recording
pub fn analyze(buffer: &StereoBuffer) -> AnalysisResult {
    let mono = buffer.mono();
    let sample_rate = buffer.sample_rate;

    debug!(
        "Mix analysis: {} samples/channel at {}Hz",
        buffer.len(),
        sample_rate
    );

    let (correlation, stereo_width) = stereo_image(&buffer.left, &buffer.right);
    let (peak_db, rms_db, crest_factor, dynamic_range) = dynamics(&mono, sample_rate);

    // One spectrogram feeds both the band energies and the onset envelope
    let frames = stft::magnitude_spectrogram(&mono);
    let band_energies = band_energies(&frames, sample_rate);

    let onsets = onset::from_spectrogram(&frames);
    let avg_onset = mean(&onsets.envelope);
    let max_onset = onsets.envelope.iter().copied().fold(0.0f32, f32::max) as f64;
    let onset_density = if buffer.duration > 0.0 {
        onsets.onset_frames.len() as f64 / buffer.duration
    } else {
        0.0
    };

    let very_low_rms = low_end_rms(&mono, sample_rate);
    let sub_bass_ratio = band_energies[0] - band_energies[1];

    AnalysisResult {
        stereo_width,
        correlation,
        peak_db,
        rms_db,
        crest_factor,
        dynamic_range,
        band_energies,
        avg_onset,
        max_onset,
        onset_density,
        very_low_rms,
        sub_bass_ratio,
        duration_seconds: buffer.duration,
    }
}

/// Pearson correlation and mid/side width of the stereo pair
fn stereo_image(left: &[f32], right: &[f32]) -> (f64, f64) {
    let correlation = pearson(left, right).unwrap_or(1.0);

    let mut mid_sq = 0.0f64;
    let mut side_sq = 0.0f64;
    for (&l, &r) in left.iter().zip(right.iter()) {
        let mid = (l as f64 + r as f64) / 2.0;
        let side = (l as f64 - r as f64) / 2.0;
        mid_sq += mid * mid;
        side_sq += side * side;
    }

    let n = left.len().max(1) as f64;
    let mid_rms = (mid_sq / n).sqrt();
    let side_rms = (side_sq / n).sqrt();
    let stereo_width = side_rms / (mid_rms + 1e-10) * 100.0;

    (correlation, stereo_width)
}

/// Pearson correlation coefficient; None when either channel has no variance
fn pearson(left: &[f32], right: &[f32]) -> Option<f64> {
    let n = left.len().min(right.len());
    if n == 0 {
        return None;
    }

    let mean_l = left.iter().map(|&v| v as f64).sum::<f64>() / n as f64;
    let mean_r = right.iter().map(|&v| v as f64).sum::<f64>() / n as f64;

    let mut cov = 0.0f64;
    let mut var_l = 0.0f64;
    let mut var_r = 0.0f64;
    for (&l, &r) in left.iter().zip(right.iter()) {
        let dl = l as f64 - mean_l;
        let dr = r as f64 - mean_r;
        cov += dl * dr;
        var_l += dl * dl;
        var_r += dr * dr;
    }

    let denom = (var_l * var_r).sqrt();
    if denom <= 0.0 {
        // Effectively mono (identical or constant channels)
        return None;
    }

    Some(cov / denom)
}

/// Peak, RMS, crest factor and the framed dynamic range
fn dynamics(mono: &[f32], sample_rate: u32) -> (f64, f64, f64, f64) {
    let peak = mono.iter().map(|s| s.abs() as f64).fold(0.0f64, f64::max);
    let peak_db = if peak > 0.0 {
        20.0 * peak.log10()
    } else {
        -100.0
    };

    let rms = rms_linear(mono);
    let rms_db = if rms > 0.0 { 20.0 * rms.log10() } else { -100.0 };

    let crest_factor = peak_db - rms_db;

    // 1-second frames, half-second hop
    let frame_length = sample_rate as usize;
    let hop = (sample_rate / 2).max(1) as usize;
    let mut frame_dbs = Vec::new();
    let mut start = 0;
    while start < mono.len() {
        let end = (start + frame_length).min(mono.len());
        let sum_sq: f64 = mono[start..end].iter().map(|&s| (s as f64) * (s as f64)).sum();
        // Tail frames are zero-padded: divide by the full frame length
        let frame_rms = (sum_sq / frame_length as f64).sqrt();
        frame_dbs.push(20.0 * (frame_rms + 1e-10).log10());
        start += hop;
    }

    let dynamic_range = if frame_dbs.is_empty() {
        0.0
    } else {
        frame_dbs.sort_by(|a, b| a.partial_cmp(b).unwrap());
        percentile(&frame_dbs, 95.0) - percentile(&frame_dbs, 5.0)
    };

    (peak_db, rms_db, crest_factor, dynamic_range)
}

/// Mean dB spectrum per fixed band; empty bands report -100 exactly
fn band_energies(frames: &[Vec<f32>], sample_rate: u32) -> [f64; 7] {
    let db_frames = stft::db_relative_to_max(frames);
    let avg_spectrum = stft::mean_spectrum(&db_frames);
    let freqs = stft::bin_frequencies(sample_rate);

    let mut energies = [0.0f64; 7];
    for (i, &(low, high, _)) in MIX_BANDS.iter().enumerate() {
        energies[i] = band_energy(&avg_spectrum, &freqs, low, high);
    }
    energies
}

/// Mean of the dB spectrum over one frequency range, -100 when no bin falls inside
pub(crate) fn band_energy(spectrum: &[f32], freqs: &[f64], low: f64, high: f64) -> f64 {
    let mut sum = 0.0f64;
    let mut count = 0usize;
    for (&v, &f) in spectrum.iter().zip(freqs.iter()) {
        if f >= low && f < high {
            sum += v as f64;
            count += 1;
        }
    }
    if count == 0 {
        -100.0
    } else {
        sum / count as f64
    }
}

/// RMS of the signal below 40 Hz; 0.0 when the cutoff cannot be realized
fn low_end_rms(mono: &[f32], sample_rate: u32) -> f64 {
    let nyquist = sample_rate as f64 / 2.0;
    if 40.0 >= nyquist {
        return 0.0;
    }

    let mut filtered = mono.to_vec();
    Cascade::lowpass(4, 40.0, sample_rate as f64).filtfilt(&mut filtered);
    rms_linear(&filtered)
}

fn rms_linear(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn mean(values: &[f32]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Linear-interpolated percentile over a pre-sorted slice
fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
    }
}

// =============================================================================
// Master-bus rule evaluation
// =============================================================================

/// Good points and recommendations for the whole mix
#[derive(Debug, Clone, Default)]
pub struct MixEvaluation {
    pub good_points: Vec<GoodPoint>,
    pub recommendations: Vec<MixRecommendation>,
}

/// Evaluate the master-bus rules against the measured mix
pub fn evaluate(
    result: &AnalysisResult,
    context: &SessionContext,
    mixer: Option<&MixerSpec>,
    pa: Option<&PaSpec>,
) -> MixEvaluation {
    let mut eval = MixEvaluation::default();
    let small_venue = context.venue_capacity < 200;

    // Good points

    if result.correlation > 0.95 {
        eval.good_points.push(GoodPoint {
            category: Some("Stereo image".to_string()),
            point: format!("Phase correlation is excellent ({:.3})", result.correlation),
            impact: 5,
        });
    } else if result.correlation > 0.85 {
        eval.good_points.push(GoodPoint {
            category: Some("Stereo image".to_string()),
            point: format!("Phase correlation is good ({:.3})", result.correlation),
            impact: 4,
        });
    }

    if result.avg_onset > 2.0 {
        eval.good_points.push(GoodPoint {
            category: Some("Transients".to_string()),
            point: format!("Transient response is healthy ({:.2})", result.avg_onset),
            impact: 4,
        });
    }

    if small_venue && result.stereo_width > 10.0 && result.stereo_width < 25.0 {
        eval.good_points.push(GoodPoint {
            category: Some("Stereo image".to_string()),
            point: format!(
                "Stereo width suits the venue size ({:.1}%)",
                result.stereo_width
            ),
            impact: 4,
        });
    }

    // Recommendations

    if result.correlation < 0.7 {
        eval.recommendations.push(MixRecommendation {
            priority: Priority::Critical,
            category: "Stereo image".to_string(),
            issue: format!("Phase correlation is low ({:.3})", result.correlation),
            solution: "Check left/right channel phase and review the panning.".to_string(),
            impact: 5,
        });
    }

    if small_venue && result.stereo_width > 30.0 {
        eval.recommendations.push(MixRecommendation {
            priority: Priority::Important,
            category: "Stereo image".to_string(),
            issue: format!(
                "Stereo image too wide for a small venue ({:.1}%)",
                result.stereo_width
            ),
            solution: "Narrow the image to 15-20% with a stereo imager.".to_string(),
            impact: 3,
        });
    }

    if result.rms_db < -22.0 {
        eval.recommendations.push(MixRecommendation {
            priority: Priority::Critical,
            category: "Level / density".to_string(),
            issue: format!(
                "RMS is very low ({:.1} dBFS) - the mix sounds thin",
                result.rms_db
            ),
            solution: master_comp_suggestion(mixer),
            impact: 5,
        });
    }

    if result.very_low_rms > 0.001 {
        let (solution, _) = master_hpf_suggestion(pa);
        eval.recommendations.push(MixRecommendation {
            priority: Priority::Critical,
            category: "HPF".to_string(),
            issue: "Subsonic content below 40 Hz".to_string(),
            solution,
            impact: 4,
        });
    }

    let bands = &result.band_energies;
    // Sub Bass vs Mid
    if bands[0] > bands[3] + 10.0 {
        eval.recommendations.push(MixRecommendation {
            priority: Priority::Important,
            category: "Frequency balance".to_string(),
            issue: format!("Low end is excessive (Sub Bass {:.1}dB)", bands[0]),
            solution: "Master EQ: 60Hz Q=1.0 -2 to -3dB".to_string(),
            impact: 4,
        });
    }
    // High-Mid vs Mid
    if bands[4] < bands[3] - 8.0 {
        eval.recommendations.push(MixRecommendation {
            priority: Priority::Important,
            category: "Frequency balance".to_string(),
            issue: format!("Clarity range is lacking (High-Mid {:.1}dB)", bands[4]),
            solution: "Master EQ: 3kHz Q=1.5 +2 to +3dB".to_string(),
            impact: 4,
        });
    }

    eval
}

/// Master-bus compressor settings, specialized by console when known
fn master_comp_suggestion(mixer: Option<&MixerSpec>) -> String {
    if let Some(spec) = mixer {
        if spec.name == "Yamaha CL Series" {
            return "Master insert: Comp260, THR -12dB, Ratio 3:1, ATK 25ms, RLS Auto".to_string();
        }
        if spec.name == "Behringer X32" {
            return "Master insert: Vintage Compressor, THR -10dB, Ratio 4:1, ATK 20ms".to_string();
        }
    }
    "Master compressor: Threshold -10 to -12dB, Ratio 3:1 to 4:1, Attack 20-30ms".to_string()
}

/// Master HPF cutoff by loudspeaker system; returns (solution text, cutoff Hz)
fn master_hpf_suggestion(pa: Option<&PaSpec>) -> (String, u32) {
    match pa {
        Some(spec) => {
            let freq = if spec.name.contains("d&b") {
                35
            } else {
                // JBL reaches 30 Hz; so does the generic assumption
                30
            };
            (
                format!(
                    "Master HPF {}Hz, 24dB/oct (accounts for the {} response)",
                    freq, spec.name
                ),
                freq,
            )
        }
        None => ("Master HPF 30-35Hz, 24dB/oct".to_string(), 30),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{EquipmentProvider, StaticEquipmentProvider};
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, seconds: f32) -> Vec<f32> {
        let n = (sample_rate as f32 * seconds) as usize;
        (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    #[test]
    fn test_silent_buffer_metrics() {
        let silence = vec![0.0f32; 22050 * 2];
        let buffer = StereoBuffer::new(silence.clone(), silence, 22050);
        let result = analyze(&buffer);

        assert_eq!(result.peak_db, -100.0);
        assert_eq!(result.rms_db, -100.0);
        assert_eq!(result.crest_factor, 0.0);
        assert_eq!(result.stereo_width, 0.0);
        assert_eq!(result.correlation, 1.0);
        assert_eq!(result.onset_density, 0.0);
        for &band in &result.band_energies {
            assert_eq!(band, -100.0);
        }
    }

    #[test]
    fn test_identical_channels_are_fully_correlated() {
        let signal = sine(440.0, 22050, 1.0);
        let buffer = StereoBuffer::new(signal.clone(), signal, 22050);
        let result = analyze(&buffer);

        assert!((result.correlation - 1.0).abs() < 1e-9);
        assert!(result.stereo_width.abs() < 1e-6);
    }

    #[test]
    fn test_crest_factor_is_peak_minus_rms() {
        let signal = sine(440.0, 22050, 2.0);
        let buffer = StereoBuffer::new(signal.clone(), signal, 22050);
        let result = analyze(&buffer);

        assert!((result.crest_factor - (result.peak_db - result.rms_db)).abs() < 1e-12);
        // Full-scale sine: peak ~0 dB, RMS ~-3 dB
        assert!(result.peak_db.abs() < 0.1);
        assert!((result.rms_db + 3.01).abs() < 0.1);
    }

    #[test]
    fn test_empty_band_reports_minus_100() {
        let spectrum = vec![-10.0f32; 100];
        let freqs: Vec<f64> = (0..100).map(|i| i as f64 * 10.0).collect();
        assert_eq!(band_energy(&spectrum, &freqs, 5000.0, 6000.0), -100.0);
        assert!((band_energy(&spectrum, &freqs, 0.0, 500.0) + 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_sub_bass_ratio_matches_bands() {
        let signal = sine(60.0, 22050, 2.0);
        let buffer = StereoBuffer::new(signal.clone(), signal, 22050);
        let result = analyze(&buffer);
        assert!(
            (result.sub_bass_ratio - (result.band_energies[0] - result.band_energies[1])).abs()
                < 1e-12
        );
        // A 60 Hz tone dominates the Sub Bass band
        assert!(result.sub_bass_ratio > 0.0);
    }

    #[test]
    fn test_percentile_interpolates() {
        let values = vec![0.0, 1.0, 2.0, 3.0, 4.0];
        assert_eq!(percentile(&values, 0.0), 0.0);
        assert_eq!(percentile(&values, 100.0), 4.0);
        assert_eq!(percentile(&values, 50.0), 2.0);
        assert!((percentile(&values, 25.0) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_low_correlation_flags_phase_issue() {
        let left = sine(440.0, 22050, 1.0);
        let right: Vec<f32> = left.iter().map(|s| -s).collect();
        let buffer = StereoBuffer::new(left, right, 22050);
        let result = analyze(&buffer);
        assert!(result.correlation < -0.9);

        let eval = evaluate(&result, &SessionContext::default(), None, None);
        assert!(eval
            .recommendations
            .iter()
            .any(|r| r.category == "Stereo image" && r.priority == Priority::Critical));
    }

    #[test]
    fn test_master_comp_text_follows_mixer() {
        let provider = StaticEquipmentProvider::new();
        let cl = provider.mixer("Yamaha CL5");
        let x32 = provider.mixer("Behringer X32");
        let unknown = provider.mixer("MysteryDesk 9000");

        assert!(master_comp_suggestion(Some(&cl)).contains("Comp260"));
        assert!(master_comp_suggestion(Some(&x32)).contains("Vintage Compressor"));
        assert!(master_comp_suggestion(Some(&unknown)).contains("Master compressor"));
        assert!(master_comp_suggestion(None).contains("Master compressor"));
    }

    #[test]
    fn test_master_hpf_cutoff_follows_pa() {
        let provider = StaticEquipmentProvider::new();
        let dandb = provider.pa("d&b V-Series");
        let jbl = provider.pa("JBL VTX");

        assert_eq!(master_hpf_suggestion(Some(&dandb)).1, 35);
        assert_eq!(master_hpf_suggestion(Some(&jbl)).1, 30);
        assert_eq!(master_hpf_suggestion(None).1, 30);
        assert!(master_hpf_suggestion(None).0.contains("30-35Hz"));
    }
}
