//! Audio decoding using symphonia
//!
//! Decodes a recording to stereo f32 samples at the analysis sample rate.
//! Mono sources are duplicated to two identical channels; multichannel
//! sources are downmixed to the front pair. Uses rubato for high-quality
//! resampling with proper anti-aliasing.

use crate::error::{MixprepError, Result};
use crate::types::StereoBuffer;
use rubato::{FftFixedInOut, Resampler};
use std::path::Path;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// Target sample rate for analysis (22050 Hz)
///
/// Every band edge in the analysis is defined against this rate. It keeps
/// the full range the rule tables care about (< 11 kHz) while halving the
/// computation compared to 44.1 kHz.
pub const TARGET_SAMPLE_RATE: u32 = 22050;

/// Maximum analyzed duration in seconds
///
/// Longer recordings are truncated after resampling; a full set is not
/// needed to judge the mix, and this bounds memory for the spectrograms.
pub const MAX_ANALYSIS_SECONDS: usize = 300;

/// Decode an audio file to a StereoBuffer at the analysis rate
///
/// Fatal on unreadable input; there is no partial success.
pub fn decode(path: &Path) -> Result<StereoBuffer> {
    let file = std::fs::File::open(path).map_err(|e| MixprepError::DecodeError {
        path: path.to_path_buf(),
        reason: format!("Failed to open file: {}", e),
    })?;

    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    // Provide a hint based on file extension
    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    // Probe the media source
    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| MixprepError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("Failed to probe format: {}", e),
        })?;

    let mut format = probed.format;

    // Find the first audio track
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| MixprepError::DecodeError {
            path: path.to_path_buf(),
            reason: "No audio tracks found".to_string(),
        })?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();

    let source_sample_rate = codec_params.sample_rate.unwrap_or(44100);
    let channels = codec_params.channels.map(|c| c.count()).unwrap_or(2);

    debug!(
        "Decoding: {} @ {}Hz, {} channels",
        path.display(),
        source_sample_rate,
        channels
    );

    // Create decoder
    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| MixprepError::DecodeError {
            path: path.to_path_buf(),
            reason: format!("Failed to create decoder: {}", e),
        })?;

    // Collect all interleaved samples
    let mut all_samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break; // End of stream
            }
            Err(e) => {
                return Err(MixprepError::DecodeError {
                    path: path.to_path_buf(),
                    reason: format!("Failed to read packet: {}", e),
                });
            }
        };

        // Skip packets from other tracks
        if packet.track_id() != track_id {
            continue;
        }

        // Decode packet
        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(symphonia::core::errors::Error::DecodeError(e)) => {
                // Skip corrupted frames
                trace!("Skipping corrupted frame: {}", e);
                continue;
            }
            Err(e) => {
                return Err(MixprepError::DecodeError {
                    path: path.to_path_buf(),
                    reason: format!("Decode error: {}", e),
                });
            }
        };

        // Convert to f32 samples
        let spec = *decoded.spec();
        let num_frames = decoded.frames();

        let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);
        all_samples.extend(sample_buf.samples());
    }

    if all_samples.is_empty() {
        return Err(MixprepError::EmptyAudio {
            path: path.to_path_buf(),
        });
    }

    // Split channels: mono duplicates, multichannel keeps the front pair
    let (left, right) = split_channels(&all_samples, channels);

    // Resample to the analysis rate
    let (left, right) = if source_sample_rate != TARGET_SAMPLE_RATE {
        (
            resample(&left, source_sample_rate, TARGET_SAMPLE_RATE),
            resample(&right, source_sample_rate, TARGET_SAMPLE_RATE),
        )
    } else {
        (left, right)
    };

    // Bound the analyzed duration
    let max_samples = MAX_ANALYSIS_SECONDS * TARGET_SAMPLE_RATE as usize;
    let (mut left, mut right) = (left, right);
    if left.len() > max_samples {
        debug!(
            "Truncating {:.1}s recording to {}s",
            left.len() as f64 / TARGET_SAMPLE_RATE as f64,
            MAX_ANALYSIS_SECONDS
        );
        left.truncate(max_samples);
        right.truncate(max_samples);
    }

    let buffer = StereoBuffer::new(left, right, TARGET_SAMPLE_RATE);

    debug!(
        "Decoded {} samples/channel ({:.2}s)",
        buffer.len(),
        buffer.duration
    );

    Ok(buffer)
}

/// Split interleaved audio into a stereo pair
///
/// Mono input is duplicated to both channels; for more than two channels
/// the front left/right pair is kept.
fn split_channels(samples: &[f32], channels: usize) -> (Vec<f32>, Vec<f32>) {
    if channels <= 1 {
        return (samples.to_vec(), samples.to_vec());
    }

    let num_frames = samples.len() / channels;
    let mut left = Vec::with_capacity(num_frames);
    let mut right = Vec::with_capacity(num_frames);

    for frame in samples.chunks_exact(channels) {
        left.push(frame[0]);
        right.push(frame[1]);
    }

    (left, right)
}

/// High-quality audio resampling using rubato
///
/// Uses FFT-based resampling with proper anti-aliasing to prevent artifacts
/// when downsampling. This matters for the band-energy measurements: aliased
/// content above Nyquist would land in the Presence/Brilliance bands.
fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    // rubato works on fixed-size chunks
    const CHUNK_SIZE: usize = 1024;

    let mut resampler = match FftFixedInOut::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        CHUNK_SIZE,
        1, // one channel at a time
    ) {
        Ok(r) => r,
        Err(e) => {
            // Fallback to simple resampling if rubato fails to initialize
            debug!("Rubato initialization failed ({}), using fallback", e);
            return resample_linear_fallback(samples, from_rate, to_rate);
        }
    };

    let input_frames_per_chunk = resampler.input_frames_next();
    let output_frames_per_chunk = resampler.output_frames_next();

    // Estimate output size
    let ratio = to_rate as f64 / from_rate as f64;
    let estimated_output_len = (samples.len() as f64 * ratio).ceil() as usize;
    let mut output = Vec::with_capacity(estimated_output_len);

    // Process in chunks
    let mut pos = 0;
    while pos < samples.len() {
        let end = (pos + input_frames_per_chunk).min(samples.len());
        let mut chunk = samples[pos..end].to_vec();

        // Pad last chunk if needed
        if chunk.len() < input_frames_per_chunk {
            chunk.resize(input_frames_per_chunk, 0.0);
        }

        let input_channels = vec![chunk];

        match resampler.process(&input_channels, None) {
            Ok(resampled) => {
                if let Some(channel) = resampled.first() {
                    // Only take valid samples (not padding)
                    let valid_samples = if pos + input_frames_per_chunk > samples.len() {
                        // Last chunk - calculate how many output samples are valid
                        let input_valid = samples.len() - pos;
                        let output_valid = (input_valid as f64 * ratio).ceil() as usize;
                        output_valid.min(output_frames_per_chunk)
                    } else {
                        output_frames_per_chunk
                    };
                    // Guard against floating-point rounding causing out-of-bounds
                    let safe_samples = valid_samples.min(channel.len());
                    output.extend_from_slice(&channel[..safe_samples]);
                }
            }
            Err(e) => {
                debug!("Rubato processing error ({}), using fallback for remaining", e);
                // Fallback for remaining samples
                let remaining = resample_linear_fallback(&samples[pos..], from_rate, to_rate);
                output.extend(remaining);
                break;
            }
        }

        pos += input_frames_per_chunk;
    }

    output
}

/// Fallback linear interpolation resampler
///
/// Used only when rubato fails to initialize or process. This is a simple
/// linear interpolation that may introduce aliasing artifacts.
fn resample_linear_fallback(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let src_pos = i as f64 * ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        let sample = if src_idx + 1 < samples.len() {
            samples[src_idx] * (1.0 - frac as f32) + samples[src_idx + 1] * frac as f32
        } else {
            samples[src_idx.min(samples.len() - 1)]
        };

        output.push(sample);
    }

    output
}
