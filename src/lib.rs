//! mixprep - Live-Mix Analysis & Correction Planning
//!
//! A command-line utility that analyzes a full-mix recording of a live
//! performance and produces objective mix metrics, per-instrument signal
//! estimates, and a prioritized, equipment-aware list of corrective
//! EQ/compressor/gate settings for the sound engineer.
//!
//! # Architecture
//!
//! The library is organized into several key modules:
//!
//! - `config`: CLI argument parsing and runtime settings
//! - `audio`: Audio decoding using symphonia, resampled to 22,050 Hz
//! - `analysis`: whole-mix metrics, stem separation and per-instrument rules
//! - `equipment`: mixer/loudspeaker capability lookup
//! - `history`: append-only session history (JSON file repository)
//! - `comparison`: equipment-normalized diffing against past sessions
//! - `report`: JSON session-report export
//! - `pipeline`: single-run orchestration
//!
//! # Example
//!
//! ```no_run
//! use mixprep::{config::Settings, pipeline};
//!
//! let mut settings = Settings::default();
//! settings.context.roster = "vocal, kick, bass".to_string();
//! let result = pipeline::run(&settings).expect("Analysis failed");
//! println!("Report written to {}", result.report_path.display());
//! ```

pub mod analysis;
pub mod audio;
pub mod comparison;
pub mod config;
pub mod equipment;
pub mod error;
pub mod history;
pub mod pipeline;
pub mod report;
pub mod types;

// Re-export key types at crate root
pub use error::{MixprepError, Result};
pub use types::{
    AnalysisResult, InstrumentReport, InstrumentTag, SessionContext, StereoBuffer,
};
