//! Process-wide scoring configuration.
//!
//! RULE: built once at startup, then only read. Every decision borrows it.
//! Missing or broken artifact files never abort startup; each falls back to
//! its defaults and the condition is logged.

use crate::{
    clock::SimulationEpoch,
    fraud_flag::DEFAULT_BASELINE_RATE,
    policy::{normalize_threshold, DecisionPolicyConfig, DEFAULT_DEMO_CUTOFF, DEFAULT_THRESHOLD},
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

pub const MODEL_FILE: &str = "fraud_model.json";
pub const METADATA_FILE: &str = "model_metadata.json";
pub const POLICY_FILE: &str = "scoring_policy.json";
pub const DEFAULT_AUDIT_FILE: &str = "decision_audit.csv";

/// Threshold keys in lookup order. `chosen_threshold` is the legacy name.
pub const THRESHOLD_KEYS: [&str; 2] = ["best_threshold", "chosen_threshold"];

// ── Model metadata ───────────────────────────────────────────────────────────

/// Training-side metadata shipped next to the model artifact.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelMetadata {
    pub raw: Map<String, Value>,
}

impl ModelMetadata {
    pub fn from_json(content: &str) -> anyhow::Result<Self> {
        match serde_json::from_str::<Value>(content)? {
            Value::Object(raw) => Ok(Self { raw }),
            other => anyhow::bail!("metadata must be a JSON object, got {other}"),
        }
    }

    /// Read the metadata file; absent or unreadable → empty metadata.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            log::warn!("Metadata file {} not found, using defaults", path.display());
            return Self::default();
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|content| Self::from_json(&content));
        match parsed {
            Ok(meta) => meta,
            Err(e) => {
                log::warn!("Could not load metadata from {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    /// First key of THRESHOLD_KEYS that is present, parsed as a number.
    /// A present but unparsable value yields `None` and is logged; later
    /// aliases are not consulted.
    pub fn threshold(&self) -> Option<f64> {
        let (key, value) = THRESHOLD_KEYS
            .iter()
            .find_map(|k| self.raw.get(*k).map(|v| (*k, v)))?;
        let parsed = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            log::warn!("metadata {key} = {value} is not a number");
        }
        parsed
    }

    pub fn simulation_start(&self) -> Option<&str> {
        self.raw.get("simulation_start").and_then(Value::as_str)
    }
}

// ── Policy file ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PolicySettings {
    #[serde(default = "default_demo_mode")]
    pub demo_mode: bool,
    #[serde(default = "default_demo_cutoff")]
    pub demo_probability_cutoff: f64,
    #[serde(default = "default_baseline_rate")]
    pub flag_baseline_rate: f64,
}

fn default_demo_mode() -> bool {
    true
}

fn default_demo_cutoff() -> f64 {
    DEFAULT_DEMO_CUTOFF
}

fn default_baseline_rate() -> f64 {
    DEFAULT_BASELINE_RATE
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            demo_mode: default_demo_mode(),
            demo_probability_cutoff: default_demo_cutoff(),
            flag_baseline_rate: default_baseline_rate(),
        }
    }
}

impl PolicySettings {
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = std::fs::read_to_string(path)
            .map_err(anyhow::Error::from)
            .and_then(|c| serde_json::from_str::<PolicySettings>(&c).map_err(Into::into));
        match parsed {
            Ok(settings) => settings.sanitized(),
            Err(e) => {
                log::warn!("Could not load policy from {}: {e:#}", path.display());
                Self::default()
            }
        }
    }

    fn sanitized(mut self) -> Self {
        if !(self.demo_probability_cutoff > 0.0 && self.demo_probability_cutoff <= 1.0) {
            log::warn!(
                "demo_probability_cutoff {} outside (0, 1], using {DEFAULT_DEMO_CUTOFF}",
                self.demo_probability_cutoff
            );
            self.demo_probability_cutoff = DEFAULT_DEMO_CUTOFF;
        }
        if !(0.0..=1.0).contains(&self.flag_baseline_rate) {
            log::warn!(
                "flag_baseline_rate {} outside [0, 1], using {DEFAULT_BASELINE_RATE}",
                self.flag_baseline_rate
            );
            self.flag_baseline_rate = DEFAULT_BASELINE_RATE;
        }
        self
    }
}

// ── Scoring config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub epoch:              SimulationEpoch,
    pub policy:             DecisionPolicyConfig,
    pub flag_baseline_rate: f64,
}

impl ScoringConfig {
    /// Assemble from already-loaded metadata and policy settings.
    pub fn from_parts(metadata: ModelMetadata, settings: PolicySettings) -> Self {
        let raw_threshold = metadata.threshold().unwrap_or(DEFAULT_THRESHOLD);
        let calibrated_threshold = normalize_threshold(raw_threshold);
        let epoch = SimulationEpoch::from_config(metadata.simulation_start());

        log::info!("Effective threshold (0..1): {calibrated_threshold}");
        log::info!("Simulation start: {}", epoch.sim_start);

        Self {
            epoch,
            policy: DecisionPolicyConfig {
                calibrated_threshold,
                demo_mode: settings.demo_mode,
                demo_probability_cutoff: settings.demo_probability_cutoff,
            },
            flag_baseline_rate: settings.flag_baseline_rate,
        }
    }

    /// Load from an artifact directory. Never fails.
    pub fn load(artifact_dir: &Path) -> Self {
        let paths = ArtifactPaths::new(artifact_dir);
        let metadata = ModelMetadata::load_or_default(&paths.metadata);
        let settings = PolicySettings::load_or_default(&paths.policy);
        Self::from_parts(metadata, settings)
    }

    /// Calibrated mode, default epoch and threshold, no baseline flagging.
    pub fn default_test() -> Self {
        Self {
            epoch: SimulationEpoch::default(),
            policy: DecisionPolicyConfig {
                calibrated_threshold: DEFAULT_THRESHOLD,
                demo_mode: false,
                demo_probability_cutoff: DEFAULT_DEMO_CUTOFF,
            },
            flag_baseline_rate: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub model:    PathBuf,
    pub metadata: PathBuf,
    pub policy:   PathBuf,
}

impl ArtifactPaths {
    pub fn new(dir: &Path) -> Self {
        Self {
            model:    dir.join(MODEL_FILE),
            metadata: dir.join(METADATA_FILE),
            policy:   dir.join(POLICY_FILE),
        }
    }
}
