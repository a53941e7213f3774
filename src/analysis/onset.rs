//! Onset-strength envelope and onset picking
//!
//! The envelope is the per-frame mean positive spectral flux of the dB
//! spectrogram: how much louder each frequency got since the previous
//! frame, rectified and averaged. Onsets are local maxima of the envelope
//! above a mean-relative threshold.

use crate::analysis::stft::{self, HOP_LENGTH};

/// Frames within this distance of a stronger candidate are not onsets
const MIN_SEPARATION: usize = 4;

/// Local-maximum window half-width, in frames
const PEAK_WINDOW: usize = 3;

/// Threshold sits this far up the mean-to-max range of the envelope
const THRESHOLD_RATIO: f32 = 0.15;

/// Onset-strength envelope plus the picked onset frames
#[derive(Debug, Clone)]
pub struct OnsetAnalysis {
    /// One value per STFT frame
    pub envelope: Vec<f32>,
    /// Frame indices of detected onsets
    pub onset_frames: Vec<usize>,
}

impl OnsetAnalysis {
    /// Onset positions as sample indices (frame * hop length)
    pub fn onset_samples(&self) -> Vec<usize> {
        self.onset_frames.iter().map(|f| f * HOP_LENGTH).collect()
    }
}

/// Analyze a mono signal for transient activity
pub fn analyze(samples: &[f32]) -> OnsetAnalysis {
    let frames = stft::magnitude_spectrogram(samples);
    from_spectrogram(&frames)
}

/// Same analysis over an already-computed magnitude spectrogram
pub fn from_spectrogram(frames: &[Vec<f32>]) -> OnsetAnalysis {
    let envelope = onset_strength(frames);
    let onset_frames = pick_onsets(&envelope);
    OnsetAnalysis {
        envelope,
        onset_frames,
    }
}

/// Per-frame mean positive spectral flux of the dB spectrogram
fn onset_strength(frames: &[Vec<f32>]) -> Vec<f32> {
    let db = stft::db_relative_to_max(frames);
    let mut envelope = Vec::with_capacity(db.len());

    for t in 0..db.len() {
        if t == 0 {
            envelope.push(0.0);
            continue;
        }

        let mut flux = 0.0f32;
        for (cur, prev) in db[t].iter().zip(db[t - 1].iter()) {
            let diff = cur - prev;
            if diff > 0.0 {
                flux += diff;
            }
        }
        envelope.push(flux / db[t].len() as f32);
    }

    envelope
}

/// Pick local maxima of the envelope above a mean-relative threshold
fn pick_onsets(envelope: &[f32]) -> Vec<usize> {
    let max = envelope.iter().copied().fold(0.0f32, f32::max);
    if max <= 0.0 {
        return Vec::new();
    }

    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let threshold = mean + THRESHOLD_RATIO * (max - mean);

    let mut onsets = Vec::new();
    for t in 0..envelope.len() {
        let value = envelope[t];
        if value < threshold {
            continue;
        }

        // Strict local maximum within the peak window
        let lo = t.saturating_sub(PEAK_WINDOW);
        let hi = (t + PEAK_WINDOW + 1).min(envelope.len());
        let window_max = envelope[lo..hi].iter().copied().fold(f32::MIN, f32::max);
        if value < window_max {
            continue;
        }

        if let Some(&last) = onsets.last() {
            if t - last < MIN_SEPARATION {
                continue;
            }
        }

        onsets.push(t);
    }

    onsets
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silence_has_no_onsets() {
        let result = analyze(&vec![0.0f32; 22050]);
        assert!(result.onset_frames.is_empty());
        assert!(result.envelope.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_click_train_yields_one_onset_per_click() {
        // Four clicks, one every half second at 22050 Hz
        let sr = 22050usize;
        let mut samples = vec![0.0f32; sr * 2];
        for click in 0..4 {
            let start = click * sr / 2;
            for i in 0..64 {
                samples[start + i] = 0.9 * (-(i as f32) / 16.0).exp();
            }
        }

        let result = analyze(&samples);
        assert!(
            (3..=5).contains(&result.onset_frames.len()),
            "expected ~4 onsets, got {}",
            result.onset_frames.len()
        );
    }

    #[test]
    fn test_onset_samples_are_frame_aligned() {
        let analysis = OnsetAnalysis {
            envelope: vec![],
            onset_frames: vec![2, 10],
        };
        assert_eq!(analysis.onset_samples(), vec![1024, 5120]);
    }

    #[test]
    fn test_steady_tone_envelope_settles_to_zero() {
        use std::f32::consts::PI;
        let sr = 22050.0;
        let samples: Vec<f32> = (0..44100)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sr).sin())
            .collect();

        let result = analyze(&samples);
        // After the initial attack the flux of a steady tone is ~0
        let tail_mean = result.envelope[10..].iter().sum::<f32>()
            / (result.envelope.len() - 10) as f32;
        assert!(tail_mean < 0.1, "tail mean {}", tail_mean);
    }
}
