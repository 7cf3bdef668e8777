//! Probability model capability and the bundled logistic artifact.
//!
//! The pipeline only ever sees `ProbabilityModel`. Any classifier that maps
//! a FeatureRecord to a probability can sit behind it.

use crate::{
    error::{ScoreError, ScoreResult},
    features::{is_numeric_feature, FeatureRecord, FEATURE_SCHEMA_VERSION},
    types::Probability,
};
use anyhow::Context;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// The contract every model backend must fulfill.
///
/// Takes `&self` so inference never needs an exclusive lock on the model.
pub trait ProbabilityModel: Send + Sync {
    fn name(&self) -> &str;

    /// Probability of fraud for one feature record.
    /// Errors with `PredictionFailed` when the record is unusable.
    fn predict(&self, features: &FeatureRecord) -> ScoreResult<Probability>;
}

/// Holds the process-wide model, or nothing if none could be loaded.
#[derive(Clone, Default)]
pub struct ModelSlot {
    model: Option<Arc<dyn ProbabilityModel>>,
}

impl ModelSlot {
    pub fn empty() -> Self {
        Self { model: None }
    }

    pub fn loaded(model: Arc<dyn ProbabilityModel>) -> Self {
        Self { model: Some(model) }
    }

    pub fn is_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Load a logistic artifact. Missing or unreadable files leave the slot
    /// empty; the process keeps running and requests get `Unavailable`.
    pub fn load_or_empty(path: &Path) -> Self {
        if !path.exists() {
            log::warn!("model artifact {} not found, scoring unavailable", path.display());
            return Self::empty();
        }
        match LogisticModel::load(path) {
            Ok(model) => {
                log::info!("Loaded model '{}' from {}", model.name(), path.display());
                Self::loaded(Arc::new(model))
            }
            Err(e) => {
                log::warn!("Could not load model from {}: {e:#}", path.display());
                Self::empty()
            }
        }
    }

    /// Run inference and check the result is a probability.
    pub fn predict(&self, features: &FeatureRecord) -> ScoreResult<Probability> {
        let model = self.model.as_ref().ok_or(ScoreError::Unavailable)?;
        let p = model.predict(features)?;
        if !(0.0..=1.0).contains(&p) {
            return Err(ScoreError::PredictionFailed(format!(
                "model '{}' returned {p}, outside [0, 1]",
                model.name()
            )));
        }
        Ok(p)
    }
}

impl std::fmt::Debug for ModelSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.model {
            Some(m) => write!(f, "ModelSlot({})", m.name()),
            None => f.write_str("ModelSlot(empty)"),
        }
    }
}

// ── Logistic artifact ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct Standardization {
    pub mean: f64,
    pub std:  f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LogisticModel {
    #[serde(default = "default_model_name")]
    pub name: String,
    pub schema_version: u32,
    pub intercept: f64,
    /// Weight per numeric column, keyed by model column name.
    pub coefficients: HashMap<String, f64>,
    #[serde(default)]
    pub standardization: HashMap<String, Standardization>,
    /// One-hot weight per transaction type. Types absent here were never seen
    /// in training and are rejected.
    pub type_weights: HashMap<String, f64>,
}

fn default_model_name() -> String {
    "logistic".to_string()
}

impl LogisticModel {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read {}", path.display()))?;
        let model: LogisticModel = serde_json::from_str(&content)
            .with_context(|| format!("Cannot parse {}", path.display()))?;
        model.check()?;
        Ok(model)
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.schema_version != FEATURE_SCHEMA_VERSION {
            anyhow::bail!(
                "artifact feature schema v{} does not match pipeline v{}",
                self.schema_version,
                FEATURE_SCHEMA_VERSION
            );
        }
        for column in self.coefficients.keys().chain(self.standardization.keys()) {
            if !is_numeric_feature(column) {
                anyhow::bail!("artifact references unknown feature '{column}'");
            }
        }
        for (column, s) in &self.standardization {
            if !(s.std.is_finite() && s.std > 0.0) {
                anyhow::bail!("standardization for '{column}' has non-positive std {}", s.std);
            }
        }
        if self.type_weights.is_empty() {
            anyhow::bail!("artifact has no transaction type weights");
        }
        Ok(())
    }
}

impl ProbabilityModel for LogisticModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn predict(&self, features: &FeatureRecord) -> ScoreResult<Probability> {
        let type_weight = self.type_weights.get(&features.txn_type).ok_or_else(|| {
            ScoreError::PredictionFailed(format!(
                "unknown transaction type '{}'",
                features.txn_type
            ))
        })?;

        let mut z = self.intercept + type_weight;
        for (column, weight) in &self.coefficients {
            // Columns were validated at load time.
            let mut x = features.numeric(column).unwrap_or(0.0);
            if let Some(s) = self.standardization.get(column) {
                x = (x - s.mean) / s.std;
            }
            z += weight * x;
        }

        if !z.is_finite() {
            return Err(ScoreError::PredictionFailed(format!(
                "non-finite score for type '{}'",
                features.txn_type
            )));
        }
        Ok(1.0 / (1.0 + (-z).exp()))
    }
}
