//! Pipeline orchestration
//!
//! Coordinates one analysis run: decode, whole-mix analysis, stem
//! separation, per-instrument analysis, cross-session comparison, history
//! append and report export. Stem work fans out over the rayon pool;
//! every stage is a pure function of its inputs.

use crate::analysis::{instrument::InstrumentAnalyzer, mix, stems};
use crate::audio;
use crate::comparison::ComparisonEngine;
use crate::config::Settings;
use crate::equipment::{EquipmentProvider, StaticEquipmentProvider};
use crate::error::{MixprepError, Result};
use crate::history::{HistoryStore, JsonHistoryStore};
use crate::report::{self, SessionReport};
use crate::types::{InstrumentReport, Stem};
use indicatif::{ProgressBar, ProgressStyle};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Pipeline result summary
#[derive(Debug)]
pub struct PipelineResult {
    pub duration_seconds: f64,
    pub instrument_count: usize,
    pub comparison_count: usize,
    pub report_path: PathBuf,
    pub history_entry_id: Option<String>,
}

/// Run the full analysis pipeline
pub fn run(settings: &Settings) -> Result<PipelineResult> {
    let pipeline_start = Instant::now();

    configure_thread_pool(settings.analysis_threads)?;

    if !settings.input.exists() {
        return Err(MixprepError::FileNotFound(settings.input.clone()));
    }

    // Phase 1: Decode. Unreadable audio is fatal - there is no partial run.
    let spinner = phase_spinner(settings.show_progress, "Decoding audio...");
    let decode_start = Instant::now();
    let buffer = audio::decode(&settings.input)?;
    finish_spinner(spinner);
    info!(
        "Decoded {:.1}s of audio in {:.2}s",
        buffer.duration,
        decode_start.elapsed().as_secs_f64()
    );

    // Phase 2: Whole-mix analysis
    let spinner = phase_spinner(settings.show_progress, "Analyzing the mix...");
    let analysis = mix::analyze(&buffer);
    finish_spinner(spinner);
    info!(
        "Mix: RMS {:.1} dBFS, peak {:.1} dBFS, width {:.1}%, DR {:.1} dB",
        analysis.rms_db, analysis.peak_db, analysis.stereo_width, analysis.dynamic_range
    );

    // Phase 3: Equipment lookup. Only consulted for names the user gave;
    // unknown names degrade to generic specs inside the provider.
    let provider = StaticEquipmentProvider::new();
    let mixer_spec = (!settings.context.mixer.is_empty())
        .then(|| provider.mixer(&settings.context.mixer));
    let pa_spec = (!settings.context.pa_system.is_empty())
        .then(|| provider.pa(&settings.context.pa_system));

    if let Some(spec) = &mixer_spec {
        info!("Console: {}", spec.name);
    }
    if let Some(spec) = &pa_spec {
        info!("Loudspeakers: {}", spec.name);
    }

    let mix_eval = mix::evaluate(
        &analysis,
        &settings.context,
        mixer_spec.as_ref(),
        pa_spec.as_ref(),
    );

    // Phase 4: Separation and per-instrument analysis
    let tags = stems::parse_roster(&settings.context.roster);
    if tags.is_empty() && !settings.context.roster.trim().is_empty() {
        warn!("No instruments recognized in roster: '{}'", settings.context.roster);
    }

    let instruments = analyze_instruments(
        &buffer.mono(),
        buffer.sample_rate,
        &tags,
        &analysis,
        settings,
        mixer_spec.as_ref(),
        pa_spec.as_ref(),
    );
    info!("Analyzed {} instrument stems", instruments.len());

    // Phase 5: Comparison against similar past sessions
    let mut store = JsonHistoryStore::open(&settings.history_path);
    let past_entries = store.query_similar(&settings.context);
    let comparisons =
        ComparisonEngine::new(&analysis, &settings.context).compare_all(&past_entries);
    if !comparisons.is_empty() {
        info!("Compared against {} past sessions", comparisons.len());
    }

    // Phase 6: Record this session
    let history_entry_id = if settings.save_history {
        Some(store.append(&analysis, &settings.context)?)
    } else {
        debug!("History append skipped (--no-save)");
        None
    };

    // Phase 7: Export
    std::fs::create_dir_all(&settings.output)
        .map_err(|e| MixprepError::output_error(&settings.output, e))?;

    let report = SessionReport {
        version: "1.0".to_string(),
        metadata: report::ReportMetadata::for_source(&settings.input),
        context: settings.context.clone(),
        mix: analysis,
        mix_good_points: mix_eval.good_points,
        mix_recommendations: mix_eval.recommendations,
        instruments,
        comparisons,
        history_entry_id: history_entry_id.clone(),
    };

    let report_path = settings.output.join("mixprep.json");
    report::write_report(&report, &report_path)?;

    info!(
        "Total pipeline time: {:.2}s",
        pipeline_start.elapsed().as_secs_f64()
    );

    Ok(PipelineResult {
        duration_seconds: report.mix.duration_seconds,
        instrument_count: report.instruments.len(),
        comparison_count: report.comparisons.len(),
        report_path,
        history_entry_id,
    })
}

/// Separate and analyze every recognized instrument
///
/// Stems are independent pure computations, so both separation and the
/// per-stem analysis fan out across the thread pool. The cross-instrument
/// pass runs afterwards on the collected reports.
#[allow(clippy::too_many_arguments)]
fn analyze_instruments(
    mono: &[f32],
    sample_rate: u32,
    tags: &[crate::types::InstrumentTag],
    analysis: &crate::types::AnalysisResult,
    settings: &Settings,
    mixer_spec: Option<&crate::equipment::MixerSpec>,
    pa_spec: Option<&crate::equipment::PaSpec>,
) -> Vec<InstrumentReport> {
    if tags.is_empty() {
        return Vec::new();
    }

    let spinner = phase_spinner(
        settings.show_progress,
        &format!("Separating {} instruments...", tags.len()),
    );
    let separation_start = Instant::now();
    let separated: Vec<Stem> = tags
        .par_iter()
        .map(|&tag| stems::extract(tag, mono, sample_rate))
        .collect();
    finish_spinner(spinner);
    debug!(
        "Separated {} stems in {:.2}s",
        separated.len(),
        separation_start.elapsed().as_secs_f64()
    );

    let spinner = phase_spinner(settings.show_progress, "Analyzing instruments...");
    let analyzer = InstrumentAnalyzer::new(
        sample_rate,
        analysis.rms_db,
        settings.context.venue_capacity,
        settings.context.stage_volume,
        mixer_spec,
        pa_spec,
    );
    let reports = analyzer.analyze_all(&separated);
    finish_spinner(spinner);

    reports
}

/// Configure the Rayon thread pool
fn configure_thread_pool(num_threads: usize) -> Result<()> {
    match rayon::ThreadPoolBuilder::new()
        .num_threads(num_threads)
        .build_global()
    {
        Ok(()) => {
            debug!("Configured thread pool with {} threads", num_threads);
        }
        Err(e) => {
            // If the pool is already initialized (e.g., in tests), that's OK
            if e.to_string().contains("already been initialized") {
                debug!("Thread pool already initialized, using existing pool");
            } else {
                return Err(MixprepError::ConfigError(format!(
                    "Failed to configure thread pool: {}",
                    e
                )));
            }
        }
    }
    Ok(())
}

fn phase_spinner(enabled: bool, message: &str) -> Option<ProgressBar> {
    if !enabled {
        return None;
    }

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Some(pb)
}

fn finish_spinner(spinner: Option<ProgressBar>) {
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
}
