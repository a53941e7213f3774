//! Audio decoding and the analysis-rate boundary

pub mod decoder;

pub use decoder::{decode, MAX_ANALYSIS_SECONDS, TARGET_SAMPLE_RATE};
