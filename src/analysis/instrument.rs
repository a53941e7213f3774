//! Per-instrument analysis and the channel-level rule engine
//!
//! Each stem gets level metrics, a set of named band levels specific to
//! the instrument, and the output of that instrument's rule set: good
//! points, issues and prioritized recommendations. Rule evaluation is
//! pure - every rule returns its findings and the results are
//! concatenated, so rules stay independently testable.

use crate::analysis::stft;
use crate::equipment::{MixerSpec, PaSpec};
use crate::types::{
    BandLevel, ConsoleSequence, GoodPoint, InstrumentReport, InstrumentTag, Issue, Priority,
    Recommendation, Severity, StageVolume, Stem,
};
use tracing::debug;

// Named band tables, (name, low Hz, high Hz)

const VOCAL_BANDS: [(&str, f64, f64); 6] = [
    ("fundamental", 150.0, 400.0),
    ("body", 400.0, 1000.0),
    ("clarity", 2000.0, 4000.0),
    ("presence", 4000.0, 6000.0),
    ("sibilance", 6000.0, 8000.0),
    ("air", 8000.0, 12000.0),
];

const KICK_BANDS: [(&str, f64, f64); 6] = [
    ("subsonic", 20.0, 40.0),
    ("fundamental", 40.0, 80.0),
    ("attack", 60.0, 100.0),
    ("body", 100.0, 200.0),
    ("boxiness", 200.0, 400.0),
    ("click", 2000.0, 5000.0),
];

const SNARE_BANDS: [(&str, f64, f64); 5] = [
    ("body", 200.0, 400.0),
    ("fatness", 400.0, 800.0),
    ("attack", 2000.0, 5000.0),
    ("crack", 3000.0, 6000.0),
    ("snappy", 6000.0, 10000.0),
];

const BASS_BANDS: [(&str, f64, f64); 4] = [
    ("fundamental", 80.0, 200.0),
    ("harmonic", 200.0, 800.0),
    ("attack", 1000.0, 3000.0),
    ("brightness", 3000.0, 6000.0),
];

const HIHAT_BANDS: [(&str, f64, f64); 2] = [
    ("brightness", 6000.0, 10000.0),
    ("air", 10000.0, 16000.0),
];

const GUITAR_BANDS: [(&str, f64, f64); 3] = [
    ("body", 200.0, 800.0),
    ("presence", 2000.0, 5000.0),
    ("brightness", 5000.0, 10000.0),
];

/// Findings from one rule evaluation; concatenated into the report
#[derive(Debug, Default)]
struct Findings {
    good_points: Vec<GoodPoint>,
    issues: Vec<Issue>,
    recommendations: Vec<Recommendation>,
}

/// Per-instrument analyzer, parameterized by session context and equipment
pub struct InstrumentAnalyzer<'a> {
    sample_rate: u32,
    overall_rms_db: f64,
    venue_capacity: u32,
    stage_volume: StageVolume,
    mixer: Option<&'a MixerSpec>,
    pa: Option<&'a PaSpec>,
}

impl<'a> InstrumentAnalyzer<'a> {
    pub fn new(
        sample_rate: u32,
        overall_rms_db: f64,
        venue_capacity: u32,
        stage_volume: StageVolume,
        mixer: Option<&'a MixerSpec>,
        pa: Option<&'a PaSpec>,
    ) -> Self {
        Self {
            sample_rate,
            overall_rms_db,
            venue_capacity,
            stage_volume,
            mixer,
            pa,
        }
    }

    /// Analyze every stem, then run the cross-instrument pass
    pub fn analyze_all(&self, stems: &[Stem]) -> Vec<InstrumentReport> {
        let mut reports: Vec<InstrumentReport> = stems
            .iter()
            .filter(|s| !s.samples.is_empty())
            .map(|s| self.analyze_stem(s))
            .collect();

        self.relationship_pass(&mut reports);
        reports
    }

    /// Level metrics, band levels and rule findings for one stem
    pub fn analyze_stem(&self, stem: &Stem) -> InstrumentReport {
        debug!("Analyzing {} stem", stem.tag.as_str());

        let rms = rms_linear(&stem.samples);
        let rms_db = if rms > 0.0 { 20.0 * rms.log10() } else { -100.0 };
        let peak = stem
            .samples
            .iter()
            .map(|s| s.abs() as f64)
            .fold(0.0f64, f64::max);
        let peak_db = if peak > 0.0 {
            20.0 * peak.log10()
        } else {
            -100.0
        };

        let spectrum = stft::mean_spectrum(&stft::magnitude_spectrogram(&stem.samples));
        let freqs = stft::bin_frequencies(self.sample_rate);

        let freq_bands = band_levels(&spectrum, &freqs, band_table(stem.tag));

        let findings = match stem.tag {
            InstrumentTag::Vocal => self.vocal_rules(&freq_bands),
            InstrumentTag::Kick => self.kick_rules(&freq_bands),
            InstrumentTag::Snare => self.snare_rules(&freq_bands),
            InstrumentTag::Bass => self.bass_rules(&freq_bands),
            InstrumentTag::Hihat => self.hihat_rules(&freq_bands),
            InstrumentTag::Tom => self.tom_rules(),
            InstrumentTag::ElectricGuitar => self.guitar_rules(&freq_bands, true),
            InstrumentTag::AcousticGuitar => self.guitar_rules(&freq_bands, false),
            InstrumentTag::Keyboard => self.keys_rules(InstrumentTag::Keyboard),
            InstrumentTag::Synth => self.keys_rules(InstrumentTag::Synth),
        };

        InstrumentReport {
            tag: stem.tag,
            rms_db,
            peak_db,
            crest_factor: peak_db - rms_db,
            level_vs_mix: rms_db - self.overall_rms_db,
            freq_bands,
            good_points: findings.good_points,
            issues: findings.issues,
            recommendations: findings.recommendations,
        }
    }

    // =========================================================================
    // Per-instrument rule sets
    // =========================================================================

    fn vocal_rules(&self, bands: &[BandLevel]) -> Findings {
        let mut f = Findings::default();
        let clarity = level(bands, "clarity");
        let body = level(bands, "body");
        let sibilance = level(bands, "sibilance");
        let air = level(bands, "air");

        if clarity > -25.0 {
            f.good_points.push(good(
                format!("Clarity range is healthy ({:.1}dB)", clarity),
                5,
            ));
        }
        if air > -35.0 {
            f.good_points
                .push(good(format!("Plenty of air ({:.1}dB)", air), 4));
        }

        if clarity < -35.0 {
            f.issues.push(Issue {
                severity: Severity::Critical,
                problem: "Clarity is severely lacking".to_string(),
                detail: format!("2-4kHz: {:.1}dB (recommended: above -25dB)", clarity),
            });

            // Small venue with audible stage sound means real feedback risk,
            // so the EQ sequence stays narrow and low-gain
            let feedback_risk = self.venue_capacity < 200 && self.stage_volume.is_audible();
            let steps = if feedback_risk {
                vocal_eq_steps_safe()
            } else {
                vocal_eq_steps_full()
            };

            f.recommendations.push(Recommendation {
                priority: Priority::Critical,
                title: "Improve vocal clarity".to_string(),
                steps,
                mixer_specific: self.mixer_vocal_sequence(),
                expected_results: strings(&[
                    "Clarity +50-70%",
                    "Lyrics much easier to follow",
                    "More presence in the mix",
                ]),
            });
        }

        if body > clarity + 8.0 {
            f.issues.push(Issue {
                severity: Severity::Important,
                problem: "Muddy vocal".to_string(),
                detail: format!(
                    "400-1000Hz excess ({:.1}dB above the clarity range)",
                    body - clarity
                ),
            });
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Remove the mud".to_string(),
                steps: strings(&[
                    "PEQ: 600Hz, Q=1.5, -3.0dB",
                    "or: 800Hz, Q=2.0, -2.5dB",
                    "",
                    "Result: a cleaner vocal",
                ]),
                mixer_specific: None,
                expected_results: strings(&["Better clarity", "A clearer vocal"]),
            });
        }

        if sibilance > clarity + 5.0 {
            f.issues.push(Issue {
                severity: Severity::Important,
                problem: "Excessive sibilance".to_string(),
                detail: format!("6-8kHz: {:.1}dB", sibilance),
            });
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "De-esser settings".to_string(),
                steps: self.deesser_steps(),
                mixer_specific: None,
                expected_results: strings(&["Natural highs", "An easier listen"]),
            });
        }

        f
    }

    fn kick_rules(&self, bands: &[BandLevel]) -> Findings {
        let mut f = Findings::default();
        let subsonic = level(bands, "subsonic");
        let fundamental = level(bands, "fundamental");
        let attack = level(bands, "attack");
        let boxiness = level(bands, "boxiness");
        let click = level(bands, "click");

        if attack > -25.0 {
            f.good_points.push(good(
                format!("Punch and attack are strong ({:.1}dB)", attack),
                5,
            ));
        }
        if click > -40.0 {
            f.good_points
                .push(good(format!("Beater click is clear ({:.1}dB)", click), 4));
        }

        if subsonic > -45.0 {
            f.issues.push(Issue {
                severity: Severity::Critical,
                problem: "Heavy subsonic content".to_string(),
                detail: format!("20-40Hz: {:.1}dB", subsonic),
            });

            let hpf_freq = self.kick_hpf_freq();
            let pa_label = self
                .pa
                .map(|p| p.name.clone())
                .unwrap_or_else(|| "PA".to_string());

            let mut steps = vec![
                format!("HPF: {}Hz, 24dB/oct", hpf_freq),
                String::new(),
                "[Effect]".to_string(),
                "  - Recovers 2-3dB of headroom".to_string(),
                "  - Protects the PA system".to_string(),
                "  - Tighter low end".to_string(),
                String::new(),
                format!("[{} notes]", pa_label),
            ];
            steps.extend(self.pa_kick_notes());

            f.recommendations.push(Recommendation {
                priority: Priority::Critical,
                title: "HPF (essential)".to_string(),
                steps,
                mixer_specific: self.mixer_hpf_sequence("kick", hpf_freq),
                expected_results: strings(&[
                    "Headroom +2-3dB",
                    "Cleaner low end",
                    "Less system strain",
                ]),
            });
        }

        if boxiness > fundamental + 5.0 {
            f.issues.push(Issue {
                severity: Severity::Important,
                problem: "Boxy kick".to_string(),
                detail: "200-400Hz excess".to_string(),
            });
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Remove the boxiness".to_string(),
                steps: strings(&["PEQ: 250Hz, Q=3.0, -3.0dB", "", "Result: a tighter kick"]),
                mixer_specific: None,
                expected_results: strings(&["A clearer low end", "More punch"]),
            });
        }

        if attack < fundamental - 5.0 {
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Add punch".to_string(),
                steps: strings(&[
                    "PEQ: 70Hz, Q=1.2, +4.0dB (fundamental)",
                    "PEQ: 3kHz, Q=2.0, +2.0dB (beater)",
                    "",
                    "Compressor:",
                    "  Threshold: -15dB, Ratio: 3:1",
                    "  Attack: 20ms (keeps the attack)",
                    "  Release: 150ms",
                    "",
                    "Gate (optional):",
                    "  Attack: 0.1ms, Release: 150ms",
                ]),
                mixer_specific: None,
                expected_results: strings(&["Punch +40%", "Clearer attack"]),
            });
        }

        f
    }

    fn snare_rules(&self, bands: &[BandLevel]) -> Findings {
        let mut f = Findings::default();
        let body = level(bands, "body");
        let attack = level(bands, "attack");
        let crack = level(bands, "crack");
        let snappy = level(bands, "snappy");

        if crack > -30.0 {
            f.good_points
                .push(good(format!("Crack is well defined ({:.1}dB)", crack), 4));
        }
        if snappy > -35.0 {
            f.good_points
                .push(good(format!("Snap is crisp ({:.1}dB)", snappy), 4));
        }

        if attack < -35.0 {
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Sharpen the snare attack".to_string(),
                steps: strings(&[
                    "PEQ: 3.5kHz, Q=2.0, +3.0dB (crack)",
                    "PEQ: 7kHz, Q=1.5, +2.0dB (snap)",
                    "",
                    "Compressor:",
                    "  Threshold: -12dB, Ratio: 4:1",
                    "  Attack: 5ms (fast, for punch)",
                    "  Release: 100ms",
                    "",
                    "Gate:",
                    "  Threshold: adjust",
                    "  Attack: 0.1ms, Release: 80ms",
                ]),
                mixer_specific: None,
                expected_results: strings(&["Attack +50%", "A snare with bite"]),
            });
        }

        if body < -40.0 {
            f.recommendations.push(Recommendation {
                priority: Priority::Optional,
                title: "Add body".to_string(),
                steps: strings(&["PEQ: 250Hz, Q=1.5, +2.5dB", "", "Result: a fuller snare"]),
                mixer_specific: None,
                expected_results: strings(&["More body", "More presence"]),
            });
        }

        f
    }

    fn bass_rules(&self, bands: &[BandLevel]) -> Findings {
        let mut f = Findings::default();
        let fundamental = level(bands, "fundamental");
        let harmonic = level(bands, "harmonic");
        let attack = level(bands, "attack");

        if fundamental > -25.0 {
            f.good_points.push(good(
                format!("Rich fundamental ({:.1}dB)", fundamental),
                5,
            ));
        }
        if attack > -40.0 {
            f.good_points
                .push(good(format!("Attack reads clearly ({:.1}dB)", attack), 4));
        }

        if harmonic < fundamental - 10.0 {
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Make the bass easier to hear".to_string(),
                steps: strings(&[
                    "PEQ: 400Hz, Q=1.5, +3.0dB (harmonics)",
                    "PEQ: 2kHz, Q=2.0, +2.0dB (attack)",
                    "",
                    "Result: a bass line that reads on small speakers",
                ]),
                mixer_specific: None,
                expected_results: strings(&["Audibility +60%", "A clearer bass line"]),
            });
        }

        if fundamental > harmonic + 15.0 {
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Clean up the low end".to_string(),
                steps: strings(&[
                    "PEQ: 120Hz, Q=2.0, -2.5dB (trim excess low end)",
                    "",
                    "Compressor:",
                    "  Threshold: -15dB, Ratio: 3:1",
                    "  Attack: 30ms (keeps the attack)",
                    "  Release: 200ms",
                ]),
                mixer_specific: None,
                expected_results: strings(&["A tighter low end", "A clearer bass"]),
            });
        }

        f
    }

    fn hihat_rules(&self, bands: &[BandLevel]) -> Findings {
        let mut f = Findings::default();

        if level(bands, "brightness") > -30.0 {
            f.good_points
                .push(good("Plenty of brightness".to_string(), 4));
        }

        f.recommendations.push(Recommendation {
            priority: Priority::Optional,
            title: "Hi-hat adjustments".to_string(),
            steps: strings(&[
                "HPF: 300Hz, 12dB/oct (remove low end)",
                "PEQ: 8kHz, Q=1.5, +1 to +2dB (brightness to taste)",
                "",
                "Compressor (light):",
                "  Threshold: -10dB, Ratio: 2:1",
            ]),
            mixer_specific: None,
            expected_results: strings(&["A clear hi-hat"]),
        });

        f
    }

    fn tom_rules(&self) -> Findings {
        let mut f = Findings::default();
        f.recommendations.push(Recommendation {
            priority: Priority::Optional,
            title: "Tom adjustments".to_string(),
            steps: strings(&[
                "HPF: 60Hz, 12dB/oct",
                "PEQ: 150Hz, Q=1.5, +3dB (body)",
                "PEQ: 2.5kHz, Q=2.0, +2dB (attack)",
                "",
                "Gate:",
                "  Threshold: adjust",
                "  Attack: 0.5ms, Release: 200ms",
            ]),
            mixer_specific: None,
            expected_results: strings(&["A defined tom sound"]),
        });
        f
    }

    fn guitar_rules(&self, bands: &[BandLevel], electric: bool) -> Findings {
        let mut f = Findings::default();

        if level(bands, "presence") > -30.0 {
            f.good_points.push(good("Presence is healthy".to_string(), 4));
        }

        if electric {
            f.recommendations.push(Recommendation {
                priority: Priority::Important,
                title: "Electric guitar adjustments".to_string(),
                steps: strings(&[
                    "HPF: 80Hz, 12dB/oct",
                    "PEQ: 2.5kHz, Q=2.0, +2 to +3dB (carve a slot next to the vocal)",
                    "  The vocal gets its boost at 3.2kHz, so this avoids the clash",
                    "",
                    "Compressor:",
                    "  Threshold: -12dB, Ratio: 3:1",
                    "  Attack: 15ms, Release: 150ms",
                ]),
                mixer_specific: None,
                expected_results: strings(&["Separation from the vocal", "A clearer guitar"]),
            });
        } else {
            f.recommendations.push(Recommendation {
                priority: Priority::Optional,
                title: "Acoustic guitar adjustments".to_string(),
                steps: strings(&[
                    "HPF: 80Hz, 12dB/oct",
                    "PEQ: 3kHz, Q=1.5, +2dB (brightness)",
                    "PEQ: 8kHz, Q=2.0, +1.5dB (air)",
                ]),
                mixer_specific: None,
                expected_results: strings(&["A clean acoustic sound"]),
            });
        }

        f
    }

    fn keys_rules(&self, tag: InstrumentTag) -> Findings {
        let mut f = Findings::default();
        f.recommendations.push(Recommendation {
            priority: Priority::Optional,
            title: format!("{} adjustments", tag.display_name()),
            steps: strings(&[
                "HPF: 60Hz, 12dB/oct",
                "PEQ: check where the vocal and guitars sit",
                "  Make space as needed",
            ]),
            mixer_specific: None,
            expected_results: strings(&["Blends with the other instruments"]),
        });
        f
    }

    // =========================================================================
    // Cross-instrument relationship pass
    // =========================================================================

    /// Rules that relate one stem to another; runs after all per-stem passes
    fn relationship_pass(&self, reports: &mut [InstrumentReport]) {
        // Kick vs bass: fundamentals fighting over the same range
        let kick_fund = find(reports, InstrumentTag::Kick)
            .and_then(|r| r.band("fundamental"))
            .unwrap_or(-100.0);
        let bass_fund = find(reports, InstrumentTag::Bass)
            .and_then(|r| r.band("fundamental"))
            .unwrap_or(-100.0);

        if (kick_fund - bass_fund).abs() < 3.0 && kick_fund > -100.0 && bass_fund > -100.0 {
            if let Some(kick) = find_mut(reports, InstrumentTag::Kick) {
                kick.recommendations.push(Recommendation {
                    priority: Priority::Important,
                    title: "Carve out space from the bass".to_string(),
                    steps: strings(&[
                        "PEQ: 65Hz, Q=1.2, +4dB (kick emphasis)",
                        "PEQ: 90Hz, Q=3.0, -4dB (cut the bass range)",
                        "",
                        "Give each instrument its own slice of the low end",
                    ]),
                    mixer_specific: None,
                    expected_results: strings(&["A defined low end", "Kick and bass separation"]),
                });
            }
            if let Some(bass) = find_mut(reports, InstrumentTag::Bass) {
                bass.recommendations.push(Recommendation {
                    priority: Priority::Important,
                    title: "Carve out space from the kick".to_string(),
                    steps: strings(&[
                        "PEQ: 90Hz, Q=1.0, +3dB (bass emphasis)",
                        "PEQ: 65Hz, Q=3.0, -4dB (cut the kick range)",
                        "",
                        "Give each instrument its own slice of the low end",
                    ]),
                    mixer_specific: None,
                    expected_results: strings(&["A defined low end", "Kick and bass separation"]),
                });
            }
        }

        // Vocal vs electric guitar: a buried vocal needs the guitar to move
        let vocal_clarity = find(reports, InstrumentTag::Vocal)
            .map(|r| r.band("clarity").unwrap_or(-100.0));

        if let Some(clarity) = vocal_clarity {
            if clarity < -30.0 {
                if let Some(guitar) = find_mut(reports, InstrumentTag::ElectricGuitar) {
                    guitar.recommendations.push(Recommendation {
                        priority: Priority::Important,
                        title: "Make room for the vocal".to_string(),
                        steps: strings(&[
                            "PEQ: 3.2kHz, Q=2.0, -2.5dB",
                            "  Clears the vocal clarity range",
                            "",
                            "Result: a more intelligible vocal",
                        ]),
                        mixer_specific: None,
                        expected_results: strings(&["Better separation from the vocal"]),
                    });
                }
            }
        }
    }

    // =========================================================================
    // Equipment-dependent step builders
    // =========================================================================

    /// De-esser recipe: native when the console has one, workaround otherwise
    fn deesser_steps(&self) -> Vec<String> {
        if self.mixer.map(|m| m.has_de_esser).unwrap_or(false) {
            strings(&[
                "De-esser settings:",
                "  Frequency: 6.5kHz",
                "  Threshold: adjust until it only reacts to sibilance",
                "  Range: -3dB",
                "",
                "Result: natural sibilance control",
            ])
        } else {
            strings(&[
                "No on-board de-esser - alternatives:",
                "",
                "[Option 1] Dynamic EQ",
                "  6-8kHz, adjust threshold, -3dB",
                "",
                "[Option 2] Compressor with side-chain",
                "  HPF the key input so only 6kHz+ triggers it",
                "",
                "[Option 3] External de-esser unit",
            ])
        }
    }

    /// Kick HPF cutoff, from the loudspeaker low-frequency extension
    fn kick_hpf_freq(&self) -> u32 {
        let Some(pa) = self.pa else {
            return 35;
        };

        let name = pa.name.to_lowercase();
        if name.contains("d&b") || pa.low_extension <= 45.0 {
            35
        } else if name.contains("jbl") || pa.low_extension <= 50.0 {
            30
        } else {
            40
        }
    }

    /// Loudspeaker-specific note lines for the kick HPF recommendation
    fn pa_kick_notes(&self) -> Vec<String> {
        match self.pa {
            None => vec!["  Assuming a generic PA system".to_string()],
            Some(pa) => match &pa.kick_hpf_hint {
                Some(hint) => vec![format!("  {}", hint)],
                None => vec![format!("  Tuned for the {} characteristics", pa.name)],
            },
        }
    }

    /// Console operating sequence for the vocal chain, where one is known
    fn mixer_vocal_sequence(&self) -> Option<ConsoleSequence> {
        let mixer = self.mixer?;

        if mixer.name.contains("Yamaha CL") {
            return Some(ConsoleSequence {
                mixer: mixer.name.clone(),
                steps: strings(&[
                    "1. Select the vocal channel",
                    "2. [EQ] button -> PEQ screen",
                    "3. Dial in the bands listed above",
                    "4. [DYNAMICS1] -> Compressor",
                    "5. TYPE: Comp260 (transparent)",
                    "6. Set the parameters",
                    "7. Confirm 4-6dB of gain reduction",
                ]),
            });
        }

        if mixer.name.contains("X32") {
            return Some(ConsoleSequence {
                mixer: mixer.name.clone(),
                steps: strings(&[
                    "1. Select the vocal channel",
                    "2. [EQ] button",
                    "3. Dial in the bands (4 bands - follow the priority order)",
                    "4. [DYNAMICS] -> Compressor",
                    "5. Set the parameters",
                    "",
                    "Note: only 4 bands available. Stick to the priority order",
                ]),
            });
        }

        None
    }

    /// Generic console HPF sequence, available for any known mixer
    fn mixer_hpf_sequence(&self, channel: &str, freq: u32) -> Option<ConsoleSequence> {
        let mixer = self.mixer?;
        Some(ConsoleSequence {
            mixer: mixer.name.clone(),
            steps: vec![
                format!("1. Select the {} channel", channel),
                "2. [EQ] button".to_string(),
                format!("3. HPF: {}Hz, 24dB/oct", freq),
                "4. Confirm HPF is engaged".to_string(),
            ],
        })
    }
}

/// Vocal clarity EQ for rooms with real feedback risk: narrow, low-gain
/// moves and a slow hand on the boosts
fn vocal_eq_steps_safe() -> Vec<String> {
    strings(&[
        "[PEQ - feedback-safe]",
        "  Band 1: 250Hz, Q=3.0, -2.5dB (remove mud)",
        "  Band 2: 800Hz, Q=2.0, -2.0dB (clean the low mids)",
        "  Band 3: 3.2kHz, Q=3.0, +3.0dB (clarity, narrow)",
        "  Band 4: 5kHz, Q=2.5, +2.0dB (consonants)",
        "",
        "[HPF]",
        "  80Hz, 24dB/oct",
        "",
        "[Compressor]",
        "  Threshold: -18dB, Ratio: 4:1",
        "  Attack: 10ms, Release: 100ms",
        "  Make-up: +3dB",
        "",
        "[Feedback precautions]",
        "  Raise 3.2kHz slowly (+1dB at a time)",
        "  Ring out the system first to find the resonant frequencies",
        "  Check monitor placement",
    ])
}

/// Vocal clarity EQ when the PA carries the room: wider, bigger moves
fn vocal_eq_steps_full() -> Vec<String> {
    strings(&[
        "[PEQ]",
        "  Band 1: 250Hz, Q=2.0, -3.0dB (remove mud)",
        "  Band 2: 3kHz, Q=1.5, +4.5dB (clarity, wide)",
        "  Band 3: 5kHz, Q=2.0, +3.0dB (consonants)",
        "  Band 4: 10kHz, Q=1.5, +2.0dB (air)",
        "",
        "[HPF]",
        "  80Hz, 24dB/oct",
        "",
        "[Compressor]",
        "  Threshold: -18dB, Ratio: 4:1",
        "  Attack: 10ms, Release: 100ms",
        "",
        "[De-Esser]",
        "  Frequency: 6.5kHz, Range: -3dB",
    ])
}

/// Band table for a tag; tom and keys carry no named bands
fn band_table(tag: InstrumentTag) -> &'static [(&'static str, f64, f64)] {
    match tag {
        InstrumentTag::Vocal => &VOCAL_BANDS,
        InstrumentTag::Kick => &KICK_BANDS,
        InstrumentTag::Snare => &SNARE_BANDS,
        InstrumentTag::Bass => &BASS_BANDS,
        InstrumentTag::Hihat => &HIHAT_BANDS,
        InstrumentTag::ElectricGuitar | InstrumentTag::AcousticGuitar => &GUITAR_BANDS,
        InstrumentTag::Tom | InstrumentTag::Keyboard | InstrumentTag::Synth => &[],
    }
}

/// Mean linear magnitude per named band, in dB; empty bands report -100
fn band_levels(
    spectrum: &[f32],
    freqs: &[f64],
    table: &[(&'static str, f64, f64)],
) -> Vec<BandLevel> {
    table
        .iter()
        .map(|&(name, low, high)| {
            let mut sum = 0.0f64;
            let mut count = 0usize;
            for (&m, &f) in spectrum.iter().zip(freqs.iter()) {
                if f >= low && f < high {
                    sum += m as f64;
                    count += 1;
                }
            }
            let level_db = if count == 0 {
                -100.0
            } else {
                20.0 * (sum / count as f64 + 1e-10).log10()
            };
            BandLevel {
                name: name.to_string(),
                level_db,
            }
        })
        .collect()
}

fn level(bands: &[BandLevel], name: &str) -> f64 {
    bands
        .iter()
        .find(|b| b.name == name)
        .map(|b| b.level_db)
        .unwrap_or(-100.0)
}

fn find(reports: &[InstrumentReport], tag: InstrumentTag) -> Option<&InstrumentReport> {
    reports.iter().find(|r| r.tag == tag)
}

fn find_mut(reports: &mut [InstrumentReport], tag: InstrumentTag) -> Option<&mut InstrumentReport> {
    reports.iter_mut().find(|r| r.tag == tag)
}

fn good(point: String, impact: u8) -> GoodPoint {
    GoodPoint {
        category: None,
        point,
        impact,
    }
}

fn rms_linear(samples: &[f32]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equipment::{EquipmentProvider, StaticEquipmentProvider};

    fn analyzer<'a>(
        mixer: Option<&'a MixerSpec>,
        pa: Option<&'a PaSpec>,
    ) -> InstrumentAnalyzer<'a> {
        InstrumentAnalyzer::new(22050, -18.0, 150, StageVolume::Medium, mixer, pa)
    }

    fn mk_bands(values: &[(&str, f64)]) -> Vec<BandLevel> {
        values
            .iter()
            .map(|&(name, level_db)| BandLevel {
                name: name.to_string(),
                level_db,
            })
            .collect()
    }

    fn mk_report(tag: InstrumentTag, bands: &[(&str, f64)]) -> InstrumentReport {
        InstrumentReport {
            tag,
            rms_db: -20.0,
            peak_db: -6.0,
            crest_factor: 14.0,
            level_vs_mix: -2.0,
            freq_bands: mk_bands(bands),
            good_points: vec![],
            issues: vec![],
            recommendations: vec![],
        }
    }

    #[test]
    fn test_low_clarity_is_a_critical_issue() {
        let a = analyzer(None, None);
        let bands = mk_bands(&[
            ("clarity", -40.0),
            ("body", -45.0),
            ("sibilance", -50.0),
            ("air", -50.0),
        ]);
        let f = a.vocal_rules(&bands);
        assert!(f
            .issues
            .iter()
            .any(|i| i.severity == Severity::Critical && i.problem.contains("Clarity")));
        assert!(f
            .recommendations
            .iter()
            .any(|r| r.priority == Priority::Critical));
    }

    #[test]
    fn test_feedback_risk_selects_safe_eq_steps() {
        // Small venue, loud stage: the safe sequence with ringing warnings
        let safe = InstrumentAnalyzer::new(22050, -18.0, 100, StageVolume::High, None, None);
        let bands = mk_bands(&[("clarity", -40.0), ("body", -60.0), ("sibilance", -60.0)]);
        let f = safe.vocal_rules(&bands);
        let steps = f.recommendations[0].steps.join("\n");
        assert!(steps.contains("feedback-safe"));
        assert!(steps.contains("+1dB at a time"));

        // Big venue: the permissive sequence including a de-esser step
        let full = InstrumentAnalyzer::new(22050, -18.0, 800, StageVolume::High, None, None);
        let f = full.vocal_rules(&bands);
        let steps = f.recommendations[0].steps.join("\n");
        assert!(steps.contains("De-Esser"));
        assert!(!steps.contains("feedback-safe"));
    }

    #[test]
    fn test_deesser_workaround_without_native_unit() {
        let provider = StaticEquipmentProvider::new();
        let x32 = provider.mixer("X32");
        assert!(!x32.has_de_esser);

        let a = analyzer(Some(&x32), None);
        let bands = mk_bands(&[("clarity", -30.0), ("body", -60.0), ("sibilance", -20.0)]);
        let f = a.vocal_rules(&bands);
        let rec = f
            .recommendations
            .iter()
            .find(|r| r.title == "De-esser settings")
            .unwrap();
        let steps = rec.steps.join("\n");
        assert!(steps.contains("No on-board de-esser"));
        assert!(steps.contains("Dynamic EQ"));
    }

    #[test]
    fn test_deesser_native_recipe_with_unit() {
        let provider = StaticEquipmentProvider::new();
        let cl = provider.mixer("CL5");

        let a = analyzer(Some(&cl), None);
        let bands = mk_bands(&[("clarity", -30.0), ("body", -60.0), ("sibilance", -20.0)]);
        let f = a.vocal_rules(&bands);
        let rec = f
            .recommendations
            .iter()
            .find(|r| r.title == "De-esser settings")
            .unwrap();
        assert!(rec.steps.join("\n").contains("Frequency: 6.5kHz"));
    }

    #[test]
    fn test_kick_hpf_freq_follows_pa_extension() {
        let provider = StaticEquipmentProvider::new();
        let dandb = provider.pa("d&b");
        let jbl = provider.pa("JBL");
        let generic = provider.pa("House Rig");
        let mut weak = provider.pa("House Rig");
        weak.low_extension = 60.0;

        assert_eq!(analyzer(None, None).kick_hpf_freq(), 35);
        assert_eq!(analyzer(None, Some(&dandb)).kick_hpf_freq(), 35);
        assert_eq!(analyzer(None, Some(&jbl)).kick_hpf_freq(), 30);
        assert_eq!(analyzer(None, Some(&generic)).kick_hpf_freq(), 30);
        assert_eq!(analyzer(None, Some(&weak)).kick_hpf_freq(), 40);
    }

    #[test]
    fn test_subsonic_kick_gets_hpf_recommendation() {
        let provider = StaticEquipmentProvider::new();
        let cl = provider.mixer("CL5");
        let a = analyzer(Some(&cl), None);
        let bands = mk_bands(&[
            ("subsonic", -30.0),
            ("fundamental", -20.0),
            ("attack", -22.0),
            ("boxiness", -40.0),
            ("click", -45.0),
        ]);
        let f = a.kick_rules(&bands);
        let rec = f
            .recommendations
            .iter()
            .find(|r| r.title == "HPF (essential)")
            .unwrap();
        assert_eq!(rec.priority, Priority::Critical);
        // Console sequence comes along when a mixer is known
        let seq = rec.mixer_specific.as_ref().unwrap();
        assert_eq!(seq.mixer, "Yamaha CL Series");
        assert!(seq.steps.iter().any(|s| s.contains("35Hz")));
    }

    #[test]
    fn test_close_fundamentals_append_one_recommendation_to_each() {
        let a = analyzer(None, None);
        let mut reports = vec![
            mk_report(InstrumentTag::Kick, &[("fundamental", -20.0)]),
            mk_report(InstrumentTag::Bass, &[("fundamental", -21.5)]),
        ];
        a.relationship_pass(&mut reports);

        assert_eq!(reports[0].recommendations.len(), 1);
        assert_eq!(reports[1].recommendations.len(), 1);
        assert!(reports[0].recommendations[0].title.contains("bass"));
        assert!(reports[1].recommendations[0].title.contains("kick"));
    }

    #[test]
    fn test_distant_fundamentals_stay_untouched() {
        let a = analyzer(None, None);
        let mut reports = vec![
            mk_report(InstrumentTag::Kick, &[("fundamental", -12.0)]),
            mk_report(InstrumentTag::Bass, &[("fundamental", -25.0)]),
        ];
        a.relationship_pass(&mut reports);
        assert!(reports[0].recommendations.is_empty());
        assert!(reports[1].recommendations.is_empty());
    }

    #[test]
    fn test_buried_vocal_moves_the_guitar() {
        let a = analyzer(None, None);
        let mut reports = vec![
            mk_report(InstrumentTag::Vocal, &[("clarity", -34.0)]),
            mk_report(InstrumentTag::ElectricGuitar, &[("presence", -20.0)]),
        ];
        a.relationship_pass(&mut reports);

        let guitar = &reports[1];
        assert_eq!(guitar.recommendations.len(), 1);
        assert!(guitar.recommendations[0].steps[0].contains("3.2kHz"));
    }

    #[test]
    fn test_analyze_stem_level_metrics() {
        use std::f32::consts::PI;
        let sr = 22050u32;
        let samples: Vec<f32> = (0..sr * 2)
            .map(|i| 0.5 * (2.0 * PI * 100.0 * i as f32 / sr as f32).sin())
            .collect();

        let a = analyzer(None, None);
        let report = a.analyze_stem(&Stem {
            tag: InstrumentTag::Bass,
            samples,
        });

        assert!((report.crest_factor - (report.peak_db - report.rms_db)).abs() < 1e-12);
        assert!((report.level_vs_mix - (report.rms_db + 18.0)).abs() < 1e-12);
        // A 100 Hz tone lands in the bass fundamental band
        let fundamental = report.band("fundamental").unwrap();
        let brightness = report.band("brightness").unwrap();
        assert!(fundamental > brightness + 20.0);
    }

    #[test]
    fn test_tom_and_keys_have_no_named_bands() {
        let a = analyzer(None, None);
        for tag in [InstrumentTag::Tom, InstrumentTag::Keyboard, InstrumentTag::Synth] {
            let report = a.analyze_stem(&Stem {
                tag,
                samples: vec![0.1f32; 4096],
            });
            assert!(report.freq_bands.is_empty());
            assert_eq!(report.recommendations.len(), 1);
            assert_eq!(report.recommendations[0].priority, Priority::Optional);
        }
    }
}
