//! The scoring engine: one transaction in, one decision out.
//!
//! EXECUTION ORDER (fixed):
//!   1. Validate the event            (InvalidInput)
//!   2. Derive the step               (BeforeEpoch)
//!   3. Compute the fraud flag
//!   4. Assemble the feature record
//!   5. Predict                       (Unavailable, PredictionFailed)
//!   6. Apply the decision policy
//!   7. Append the audit record       (LogWriteFailed, advisory only)
//!
//! RULES:
//!   - Config and model are read-only; a failed request changes neither.
//!   - Nothing is audited for a request that fails in steps 1-5.
//!   - An audit failure never hides the computed result.

use crate::{
    audit::{AuditRecord, AuditSink, NullAuditSink},
    config::{ArtifactPaths, ScoringConfig},
    error::{ScoreError, ScoreResult},
    features::assemble,
    fraud_flag::compute_flag,
    input::RawTransaction,
    model::ModelSlot,
    policy::decide,
    rng::FlagSource,
    types::{RiskResult, TransactionEvent},
};
use chrono::{NaiveDateTime, Utc};
use std::path::Path;

/// A computed decision plus the advisory audit outcome.
#[derive(Debug)]
pub struct Decision {
    pub result:      RiskResult,
    /// `Some(LogWriteFailed)` when the audit append failed.
    pub audit_error: Option<ScoreError>,
}

impl Decision {
    pub fn audited(&self) -> bool {
        self.audit_error.is_none()
    }
}

pub struct ScoringEngine {
    pub config: ScoringConfig,
    model:      ModelSlot,
    audit:      Box<dyn AuditSink>,
}

impl ScoringEngine {
    pub fn new(config: ScoringConfig, model: ModelSlot, audit: Box<dyn AuditSink>) -> Self {
        Self { config, model, audit }
    }

    /// Build from an artifact directory, auditing to `audit`.
    /// Missing artifacts leave the engine running with defaults.
    pub fn build(artifact_dir: &Path, audit: Box<dyn AuditSink>) -> Self {
        let paths = ArtifactPaths::new(artifact_dir);
        let config = ScoringConfig::load(artifact_dir);
        let model = ModelSlot::load_or_empty(&paths.model);
        Self::new(config, model, audit)
    }

    /// Test configuration with the given model and no audit output.
    pub fn build_test(model: ModelSlot) -> Self {
        Self::new(ScoringConfig::default_test(), model, Box::new(NullAuditSink))
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_loaded()
    }

    pub fn score(
        &self,
        event: &TransactionEvent,
        flags: &mut dyn FlagSource,
    ) -> ScoreResult<Decision> {
        self.score_at(event, flags, Utc::now().naive_utc())
    }

    pub fn score_raw(
        &self,
        raw: &RawTransaction,
        flags: &mut dyn FlagSource,
    ) -> ScoreResult<Decision> {
        let event = raw.parse()?;
        self.score(&event, flags)
    }

    /// Same as `score` with an explicit audit timestamp.
    pub fn score_at(
        &self,
        event: &TransactionEvent,
        flags: &mut dyn FlagSource,
        logged_at: NaiveDateTime,
    ) -> ScoreResult<Decision> {
        event.validate()?;

        let step = self.config.epoch.to_step(event.occurred_at)?;
        let is_flagged = compute_flag(
            event.amount,
            event.new_balance_origin,
            event.old_balance_dest,
            self.config.flag_baseline_rate,
            flags,
        );
        let features = assemble(event, step, is_flagged);

        let probability = self.model.predict(&features)?;
        let (label, label_reason) = decide(probability, is_flagged, &self.config.policy);

        let result = RiskResult {
            probability,
            percent: probability * 100.0,
            label,
            label_reason,
            step,
            is_flagged,
            threshold_used: self.config.policy.calibrated_threshold,
        };

        log::debug!(
            "step={step} type={} flagged={is_flagged} p={probability:.4} label={label} ({label_reason})",
            features.txn_type
        );

        let record = AuditRecord::new(&features, event, &result, logged_at);
        let audit_error = match self.audit.append(&record) {
            Ok(()) => None,
            Err(e) => {
                log::warn!("Failed to save audit record: {e}");
                match e {
                    ScoreError::LogWriteFailed(_) => Some(e),
                    other => Some(ScoreError::LogWriteFailed(other.to_string())),
                }
            }
        };

        Ok(Decision { result, audit_error })
    }
}
