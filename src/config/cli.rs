//! CLI argument parsing and configuration

use clap::Parser;
use std::path::PathBuf;

/// mixprep - Live-mix analysis and correction planning
///
/// Analyzes a full-mix recording of a live performance and produces mix
/// metrics, per-instrument findings and prioritized, equipment-aware
/// EQ/compressor/gate recommendations. Results export as JSON.
#[derive(Parser, Debug)]
#[command(name = "mixprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Recording to analyze (2-mix board or room capture)
    #[arg(short, long, value_name = "FILE")]
    pub input: PathBuf,

    /// Output directory for the JSON report
    #[arg(short, long, value_name = "DIR", default_value = "./output")]
    pub output: PathBuf,

    /// Band lineup, free text (Japanese/English/abbreviations, comma separated)
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub roster: String,

    /// Venue name (recorded with the session)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub venue: String,

    /// Venue capacity in people
    #[arg(long, value_name = "N", default_value_t = 150)]
    pub capacity: u32,

    /// How much acoustic stage sound reaches the audience
    #[arg(long, value_name = "LEVEL", default_value = "medium")]
    #[arg(value_parser = ["high", "medium", "low", "none"])]
    pub stage_volume: String,

    /// Mixing console name (e.g. "Yamaha CL5"; enables console-specific steps)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub mixer: String,

    /// Loudspeaker system name (e.g. "d&b V-Series")
    #[arg(long, value_name = "NAME", default_value = "")]
    pub pa: String,

    /// Free-text notes recorded with the session
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub notes: String,

    /// History file (defaults to <output>/history.json)
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Analyze without recording this session in the history
    #[arg(long, default_value = "false")]
    pub no_save: bool,

    /// Number of worker threads (defaults to CPU count - 1)
    #[arg(short = 'j', long, value_name = "N")]
    pub threads: Option<usize>,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress progress spinners)
    #[arg(short, long, default_value = "false")]
    pub quiet: bool,
}

impl Cli {
    /// Get the effective history file path
    pub fn history_path(&self) -> PathBuf {
        self.history
            .clone()
            .unwrap_or_else(|| self.output.join("history.json"))
    }
}
