//! STFT (Short-Time Fourier Transform) helpers
//!
//! All spectral measurements share one parameter set: nfft=2048,
//! hop_length=512, Hann window. At 22.05 kHz that is ~93ms windows with
//! 1025 frequency bins (~10.8 Hz resolution) and ~23ms frame spacing,
//! enough to resolve the narrowest rule band (subsonic, 20-40 Hz is the
//! exception and is judged by its mean, not per bin).

use rustfft::{num_complex::Complex, FftPlanner};

/// FFT window size
pub const N_FFT: usize = 2048;

/// Hop length between frames (75% overlap, COLA-compliant with Hann)
pub const HOP_LENGTH: usize = 512;

/// Number of frequency bins in the positive-frequency half of the spectrum
pub const NUM_BINS: usize = N_FFT / 2 + 1; // 1025

/// Center frequency of each spectral bin in Hz
pub fn bin_frequencies(sample_rate: u32) -> Vec<f64> {
    (0..NUM_BINS)
        .map(|k| k as f64 * sample_rate as f64 / N_FFT as f64)
        .collect()
}

/// Compute the complex STFT of a mono signal
///
/// Short signals are zero-padded to a single frame so every input yields
/// at least one spectrum.
pub fn stft(samples: &[f32]) -> Vec<Vec<Complex<f32>>> {
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(N_FFT);

    let window = hann_window(N_FFT);

    let num_frames = samples.len().saturating_sub(N_FFT) / HOP_LENGTH + 1;
    let mut spectrogram = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * HOP_LENGTH;
        let end = (start + N_FFT).min(samples.len());

        // Prepare input buffer with windowing
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); N_FFT];
        for (i, &w) in window.iter().enumerate() {
            if start + i < end {
                buffer[i] = Complex::new(samples[start + i] * w, 0.0);
            }
        }

        fft.process(&mut buffer);

        // Keep only positive frequencies (first half + DC + Nyquist)
        spectrogram.push(buffer[..NUM_BINS].to_vec());
    }

    spectrogram
}

/// Magnitude spectrogram: |STFT|, frames x bins
pub fn magnitude_spectrogram(samples: &[f32]) -> Vec<Vec<f32>> {
    stft(samples)
        .into_iter()
        .map(|frame| frame.iter().map(|c| c.norm()).collect())
        .collect()
}

/// Convert a magnitude spectrogram to dB relative to its global maximum
///
/// A silent spectrogram (max 0) reports -100 dB everywhere, as does any
/// bin more than 100 dB below the maximum.
pub fn db_relative_to_max(frames: &[Vec<f32>]) -> Vec<Vec<f32>> {
    let global_max = frames
        .iter()
        .flat_map(|f| f.iter().copied())
        .fold(0.0f32, f32::max);

    if global_max <= 0.0 {
        return frames.iter().map(|f| vec![-100.0; f.len()]).collect();
    }

    frames
        .iter()
        .map(|frame| {
            frame
                .iter()
                .map(|&m| {
                    let db = 20.0 * ((m + 1e-10) / global_max).log10();
                    db.max(-100.0)
                })
                .collect()
        })
        .collect()
}

/// Average a spectrogram over time to a single per-bin spectrum
pub fn mean_spectrum(frames: &[Vec<f32>]) -> Vec<f32> {
    if frames.is_empty() {
        return vec![0.0; NUM_BINS];
    }

    let mut mean = vec![0.0f64; frames[0].len()];
    for frame in frames {
        for (acc, &v) in mean.iter_mut().zip(frame.iter()) {
            *acc += v as f64;
        }
    }

    let n = frames.len() as f64;
    mean.iter().map(|&v| (v / n) as f32).collect()
}

/// Reconstruct a mono signal from a complex STFT (overlap-add)
pub fn istft(spectrogram: &[Vec<Complex<f32>>], output_length: usize) -> Vec<f32> {
    let mut planner = FftPlanner::new();
    let ifft = planner.plan_fft_inverse(N_FFT);

    let window = hann_window(N_FFT);

    let mut output = vec![0.0f32; output_length];
    let mut window_sum = vec![0.0f32; output_length];

    for (frame_idx, frame) in spectrogram.iter().enumerate() {
        let start = frame_idx * HOP_LENGTH;

        // Reconstruct full spectrum (add conjugate symmetric part)
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); N_FFT];
        for (i, &c) in frame.iter().enumerate() {
            buffer[i] = c;
        }
        for i in 1..NUM_BINS - 1 {
            buffer[N_FFT - i] = frame[i].conj();
        }

        ifft.process(&mut buffer);

        // Normalize and apply the synthesis window, add to output
        let scale = 1.0 / N_FFT as f32;
        for (i, &w) in window.iter().enumerate() {
            if start + i < output_length {
                output[start + i] += buffer[i].re * scale * w;
                window_sum[start + i] += w * w;
            }
        }
    }

    // Normalize by window sum (COLA normalization)
    for (out, &ws) in output.iter_mut().zip(window_sum.iter()) {
        if ws > 1e-8 {
            *out /= ws;
        }
    }

    output
}

/// Generate a Hann window of the given size
pub fn hann_window(size: usize) -> Vec<f32> {
    use std::f32::consts::PI;
    (0..size)
        .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f32 / size as f32).cos()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(N_FFT, 2048);
        assert_eq!(HOP_LENGTH, 512);
        assert_eq!(NUM_BINS, 1025);
    }

    #[test]
    fn test_hann_window() {
        let window = hann_window(4);
        assert_eq!(window.len(), 4);
        // Zero at the left edge, max at center
        assert!(window[0] < 0.01);
        assert!(window[2] > 0.9);
    }

    #[test]
    fn test_bin_frequencies_span_to_nyquist() {
        let freqs = bin_frequencies(22050);
        assert_eq!(freqs.len(), NUM_BINS);
        assert_eq!(freqs[0], 0.0);
        assert!((freqs[NUM_BINS - 1] - 11025.0).abs() < 1e-6);
    }

    #[test]
    fn test_short_signal_yields_one_frame() {
        let frames = magnitude_spectrogram(&[0.5f32; 100]);
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].len(), NUM_BINS);
    }

    #[test]
    fn test_silence_is_floored_at_minus_100() {
        let frames = magnitude_spectrogram(&vec![0.0f32; 4096]);
        let db = db_relative_to_max(&frames);
        for frame in &db {
            for &v in frame {
                assert_eq!(v, -100.0);
            }
        }
    }

    #[test]
    fn test_sine_peaks_at_its_bin() {
        use std::f32::consts::PI;
        let sr = 22050.0;
        // Pick a frequency that lands exactly on a bin
        let bin = 100;
        let freq = bin as f32 * sr / N_FFT as f32;
        let samples: Vec<f32> = (0..8192)
            .map(|i| (2.0 * PI * freq * i as f32 / sr).sin())
            .collect();

        let spectrum = mean_spectrum(&magnitude_spectrogram(&samples));
        let peak_bin = spectrum
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak_bin, bin);
    }

    #[test]
    fn test_istft_round_trip_preserves_signal() {
        use std::f32::consts::PI;
        let sr = 22050.0;
        let samples: Vec<f32> = (0..8192)
            .map(|i| 0.5 * (2.0 * PI * 440.0 * i as f32 / sr).sin())
            .collect();

        let spec = stft(&samples);
        let restored = istft(&spec, samples.len());

        // Compare away from the edges where the window sum is partial
        for i in N_FFT..samples.len() - N_FFT {
            assert!(
                (samples[i] - restored[i]).abs() < 0.01,
                "sample {} diverged: {} vs {}",
                i,
                samples[i],
                restored[i]
            );
        }
    }
}
