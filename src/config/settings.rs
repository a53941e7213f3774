//! Runtime configuration settings

use crate::types::{SessionContext, StageVolume};
use std::path::PathBuf;

/// Runtime settings for one analysis run
#[derive(Debug, Clone)]
pub struct Settings {
    /// Input recording
    pub input: PathBuf,
    /// Output directory
    pub output: PathBuf,
    /// History file path
    pub history_path: PathBuf,
    /// Session context (venue, equipment, roster)
    pub context: SessionContext,
    /// Number of analysis worker threads
    pub analysis_threads: usize,
    /// Show progress spinners
    pub show_progress: bool,
    /// Record this session in the history
    pub save_history: bool,
}

impl Settings {
    /// Create settings from CLI arguments
    pub fn from_cli(cli: &super::cli::Cli) -> Self {
        let total_cores = num_cpus::get();
        let default_threads = total_cores.saturating_sub(1).max(1);

        Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            history_path: cli.history_path(),
            context: SessionContext {
                venue: cli.venue.clone(),
                venue_capacity: cli.capacity,
                stage_volume: StageVolume::parse(&cli.stage_volume),
                mixer: cli.mixer.clone(),
                pa_system: cli.pa.clone(),
                roster: cli.roster.clone(),
                notes: cli.notes.clone(),
            },
            analysis_threads: cli.threads.unwrap_or(default_threads),
            show_progress: !cli.quiet,
            save_history: !cli.no_save,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            input: PathBuf::from("./recording.wav"),
            output: PathBuf::from("./output"),
            history_path: PathBuf::from("./output/history.json"),
            context: SessionContext::default(),
            analysis_threads: num_cpus::get().saturating_sub(1).max(1),
            show_progress: true,
            save_history: true,
        }
    }
}
