//! Decision policy: probability (+ flag) to a discrete risk label.
//!
//! Pure function of its inputs. Two modes:
//!   - demo:       flagged → HIGH, p >= demo cutoff → HIGH, else calibrated
//!   - calibrated: p >= t → HIGH, p >= t/2 → MEDIUM, else LOW
//!
//! The t*0.5 midpoint is fixed; do not tune it.

use crate::types::{DecisionReason, Probability, RiskLabel};
use serde::{Deserialize, Serialize};

pub const DEFAULT_THRESHOLD: f64 = 0.5;
pub const DEFAULT_DEMO_CUTOFF: f64 = 0.70;

const MIDPOINT_FACTOR: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DecisionPolicyConfig {
    /// Always in (0, 1]; see `normalize_threshold`.
    pub calibrated_threshold:    f64,
    pub demo_mode:               bool,
    pub demo_probability_cutoff: f64,
}

impl Default for DecisionPolicyConfig {
    fn default() -> Self {
        Self {
            calibrated_threshold:    DEFAULT_THRESHOLD,
            demo_mode:               true,
            demo_probability_cutoff: DEFAULT_DEMO_CUTOFF,
        }
    }
}

pub fn decide(
    probability: Probability,
    is_flagged: u8,
    config: &DecisionPolicyConfig,
) -> (RiskLabel, DecisionReason) {
    if config.demo_mode {
        if is_flagged == 1 {
            return (RiskLabel::High, DecisionReason::FlagOverride);
        }
        if probability >= config.demo_probability_cutoff {
            return (RiskLabel::High, DecisionReason::DemoCutoff);
        }
    }
    calibrated(probability, config.calibrated_threshold)
}

/// Three-tier calibrated rule around `threshold` and its midpoint.
pub fn calibrated(probability: Probability, threshold: f64) -> (RiskLabel, DecisionReason) {
    if probability >= threshold {
        (RiskLabel::High, DecisionReason::CalibratedThreshold)
    } else if probability >= threshold * MIDPOINT_FACTOR {
        (RiskLabel::Medium, DecisionReason::CalibratedMidpoint)
    } else {
        (RiskLabel::Low, DecisionReason::BelowMidpoint)
    }
}

/// Bring a persisted threshold into (0, 1]. Percentages (> 1) are divided
/// by 100; anything still outside (0, 1] gives the default.
pub fn normalize_threshold(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        log::warn!("threshold {raw} is not usable, falling back to {DEFAULT_THRESHOLD}");
        return DEFAULT_THRESHOLD;
    }
    if raw <= 1.0 {
        return raw;
    }
    let scaled = raw / 100.0;
    if scaled > 1.0 {
        log::warn!("threshold {raw} exceeds 100%, falling back to {DEFAULT_THRESHOLD}");
        return DEFAULT_THRESHOLD;
    }
    scaled
}
