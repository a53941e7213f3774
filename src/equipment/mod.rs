//! Equipment specifications
//!
//! Mixer and loudspeaker capability records drive the equipment-aware
//! branches of the rule engine. Lookup is by free-text name and never
//! fails: unrecognized names get a generic low-capability spec. A
//! network-backed provider can slot in behind [`EquipmentProvider`], but
//! the core only depends on this synchronous contract.

use serde::{Deserialize, Serialize};

/// Mixing-console capability record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MixerSpec {
    pub name: String,
    pub eq_bands: u8,
    pub eq_type: String,
    /// Usable parametric Q range
    pub q_range: (f64, f64),
    /// EQ gain range in dB
    pub gain_range: (f64, f64),
    pub compressor_types: Vec<String>,
    pub has_de_esser: bool,
    pub has_dynamic_eq: bool,
    pub hpf_slopes: Vec<String>,
    pub characteristics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub limitations: Vec<String>,
    /// Per-channel working hints, keyed by instrument
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub channel_hints: Vec<(String, String)>,
}

/// Loudspeaker-system capability record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaSpec {
    pub name: String,
    pub system_type: String,
    /// Usable low-frequency extension in Hz
    pub low_extension: f64,
    pub high_extension: f64,
    pub characteristics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub eq_compensation: Vec<String>,
    /// Frequencies this system tends to ring at
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub feedback_prone: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kick_hpf_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vocal_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_hint: Option<String>,
}

/// Synchronous equipment lookup; implementations must never fail
pub trait EquipmentProvider {
    /// Look up a mixing console by free-text name
    fn mixer(&self, name: &str) -> MixerSpec;

    /// Look up a loudspeaker system by free-text name
    fn pa(&self, name: &str) -> PaSpec;
}

/// Offline lookup over the built-in equipment tables
#[derive(Debug, Default)]
pub struct StaticEquipmentProvider;

impl StaticEquipmentProvider {
    pub fn new() -> Self {
        Self
    }
}

impl EquipmentProvider for StaticEquipmentProvider {
    fn mixer(&self, name: &str) -> MixerSpec {
        let upper = name.to_uppercase();

        if upper.contains("CL5") || upper.contains("CL3") || upper.contains("CL1") {
            return MixerSpec {
                name: "Yamaha CL Series".to_string(),
                eq_bands: 8,
                eq_type: "Parametric".to_string(),
                q_range: (0.1, 10.0),
                gain_range: (-18.0, 18.0),
                compressor_types: strings(&["Comp260", "U76", "Opt-2A"]),
                has_de_esser: true,
                has_dynamic_eq: true,
                hpf_slopes: strings(&["12dB/oct", "24dB/oct"]),
                characteristics: strings(&[
                    "8-band PEQ allows very precise shaping",
                    "Comp260 is transparent and well suited to vocals",
                    "Dynamic EQ enables frequency-dependent dynamics control",
                ]),
                limitations: vec![],
                channel_hints: hints(&[
                    ("vocal", "Comp260 model recommended; use all 8 EQ bands"),
                    ("kick", "HPF 24dB/oct recommended; combine gate and compressor"),
                    ("bass", "Stabilize with Comp260; shape precisely with 8 bands"),
                ]),
            };
        }

        if upper.contains("QL5") || upper.contains("QL1") {
            return MixerSpec {
                name: "Yamaha QL Series".to_string(),
                eq_bands: 8,
                eq_type: "Parametric".to_string(),
                q_range: (0.1, 10.0),
                gain_range: (-18.0, 18.0),
                compressor_types: strings(&["Comp260", "U76", "Opt-2A"]),
                has_de_esser: true,
                has_dynamic_eq: false,
                hpf_slopes: strings(&["12dB/oct", "24dB/oct"]),
                characteristics: strings(&[
                    "Close to the CL sound, slightly simplified",
                    "The 8-band PEQ is just as capable",
                ]),
                limitations: vec![],
                channel_hints: vec![],
            };
        }

        if upper.contains("X32") {
            return MixerSpec {
                name: "Behringer X32".to_string(),
                eq_bands: 4,
                eq_type: "Parametric".to_string(),
                q_range: (0.3, 10.0),
                gain_range: (-15.0, 15.0),
                compressor_types: strings(&["Standard", "Vintage"]),
                has_de_esser: false,
                has_dynamic_eq: false,
                hpf_slopes: strings(&["12dB/oct", "24dB/oct"]),
                characteristics: strings(&[
                    "Excellent value for money",
                    "Only 4 EQ bands - prioritize your moves",
                    "No de-esser - a dynamic EQ can stand in",
                ]),
                limitations: strings(&[
                    "4-band EQ limits precise correction",
                    "No on-board de-esser",
                ]),
                channel_hints: hints(&[
                    (
                        "vocal",
                        "EQ priority: cut mud, then clarity, then air. Use an external de-esser",
                    ),
                    ("kick", "EQ order: HPF, fundamental, cut the boxiness, attack"),
                    (
                        "bass",
                        "Lean on the compressor; spend the EQ on the two most important bands",
                    ),
                ]),
            };
        }

        if upper.contains("SQ") {
            return MixerSpec {
                name: "Allen & Heath SQ Series".to_string(),
                eq_bands: 4,
                eq_type: "Parametric".to_string(),
                q_range: (0.5, 10.0),
                gain_range: (-15.0, 15.0),
                compressor_types: strings(&["Standard", "Vintage"]),
                has_de_esser: true,
                has_dynamic_eq: false,
                hpf_slopes: strings(&["12dB/oct", "24dB/oct"]),
                characteristics: strings(&["Musical EQ curves", "On-board de-esser"]),
                limitations: vec![],
                channel_hints: vec![],
            };
        }

        // Unknown console
        MixerSpec {
            name: name.to_string(),
            eq_bands: 4,
            eq_type: "Parametric".to_string(),
            q_range: (0.5, 10.0),
            gain_range: (-15.0, 15.0),
            compressor_types: strings(&["Standard"]),
            has_de_esser: false,
            has_dynamic_eq: false,
            hpf_slopes: strings(&["12dB/oct"]),
            characteristics: strings(&["Specs unknown - generic settings recommended"]),
            limitations: vec![],
            channel_hints: vec![],
        }
    }

    fn pa(&self, name: &str) -> PaSpec {
        let upper = name.to_uppercase();

        if upper.contains("D&B") || upper.contains("DB") {
            return PaSpec {
                name: "d&b Audiotechnik".to_string(),
                system_type: "Line Array".to_string(),
                low_extension: 45.0,
                high_extension: 18000.0,
                characteristics: strings(&[
                    "Very flat response",
                    "Strong response below 60Hz",
                    "Slight peak tendency around 2-4kHz",
                    "High intelligibility",
                ]),
                eq_compensation: strings(&[
                    "2.5kHz Q=2.0 -1.5dB (system peak correction)",
                    "100Hz Q=1.0 +1dB (low-end support)",
                ]),
                feedback_prone: vec![250.0, 500.0, 2000.0, 4000.0],
                kick_hpf_hint: Some("35Hz recommended (plenty of low end in reserve)".to_string()),
                vocal_hint: Some("An articulate system - keep vocal EQ moves small".to_string()),
                overall_hint: Some("A neutral rig - little correction needed".to_string()),
            };
        }

        if upper.contains("JBL") || upper.contains("VTX") || upper.contains("VRX") {
            return PaSpec {
                name: "JBL Professional".to_string(),
                system_type: "Line Array".to_string(),
                low_extension: 50.0,
                high_extension: 20000.0,
                characteristics: strings(&[
                    "Bright top end (6-10kHz)",
                    "Punchy low end",
                    "Strong transient reproduction",
                ]),
                eq_compensation: strings(&[
                    "8kHz Q=1.5 -2dB (tame the top)",
                    "80Hz Q=1.0 +1.5dB (reinforce the lows)",
                ]),
                feedback_prone: vec![315.0, 630.0, 2500.0, 5000.0],
                kick_hpf_hint: Some("30-35Hz recommended".to_string()),
                vocal_hint: Some("A bright system - watch the sibilance".to_string()),
                overall_hint: Some("A slightly hyped response - even it out with EQ".to_string()),
            };
        }

        if upper.contains("L-ACOUSTICS") || upper.contains("KARA") || upper.contains("ARCS") {
            return PaSpec {
                name: "L-Acoustics".to_string(),
                system_type: "Line Array".to_string(),
                low_extension: 50.0,
                high_extension: 20000.0,
                characteristics: strings(&[
                    "Very balanced response",
                    "Musical character",
                    "High intelligibility",
                ]),
                eq_compensation: vec![],
                feedback_prone: vec![],
                kick_hpf_hint: None,
                vocal_hint: None,
                overall_hint: Some("A high-quality system with a neutral response".to_string()),
            };
        }

        // Unknown system
        PaSpec {
            name: name.to_string(),
            system_type: "Unknown".to_string(),
            low_extension: 50.0,
            high_extension: 18000.0,
            characteristics: strings(&["Specs unknown"]),
            eq_compensation: vec![],
            feedback_prone: vec![],
            kick_hpf_hint: None,
            vocal_hint: None,
            overall_hint: None,
        }
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn hints(values: &[(&str, &str)]) -> Vec<(String, String)> {
    values
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cl_series_lookup() {
        let provider = StaticEquipmentProvider::new();
        let spec = provider.mixer("Yamaha CL5");
        assert_eq!(spec.name, "Yamaha CL Series");
        assert_eq!(spec.eq_bands, 8);
        assert!(spec.has_de_esser);
        assert!(spec.has_dynamic_eq);
        assert!(spec.compressor_types.contains(&"Comp260".to_string()));
    }

    #[test]
    fn test_x32_has_no_de_esser() {
        let provider = StaticEquipmentProvider::new();
        let spec = provider.mixer("behringer x32");
        assert_eq!(spec.name, "Behringer X32");
        assert_eq!(spec.eq_bands, 4);
        assert!(!spec.has_de_esser);
        assert!(!spec.limitations.is_empty());
    }

    #[test]
    fn test_unknown_mixer_gets_generic_spec() {
        let provider = StaticEquipmentProvider::new();
        let spec = provider.mixer("Soundcraft Si Expression");
        assert_eq!(spec.name, "Soundcraft Si Expression");
        assert_eq!(spec.eq_bands, 4);
        assert!(!spec.has_de_esser);
    }

    #[test]
    fn test_pa_lookup_by_substring() {
        let provider = StaticEquipmentProvider::new();
        assert_eq!(provider.pa("d&b V-Series").name, "d&b Audiotechnik");
        assert_eq!(provider.pa("JBL VTX A12").name, "JBL Professional");
        assert_eq!(provider.pa("Kara II").name, "L-Acoustics");
    }

    #[test]
    fn test_pa_low_extension_values() {
        let provider = StaticEquipmentProvider::new();
        assert_eq!(provider.pa("d&b").low_extension, 45.0);
        assert_eq!(provider.pa("JBL").low_extension, 50.0);
        assert_eq!(provider.pa("No Name Boxes").low_extension, 50.0);
    }

    #[test]
    fn test_unknown_pa_keeps_query_name() {
        let provider = StaticEquipmentProvider::new();
        let spec = provider.pa("House Rig");
        assert_eq!(spec.name, "House Rig");
        assert_eq!(spec.system_type, "Unknown");
    }
}
