//! Shared primitive types used across the scoring pipeline.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};

/// A 1-indexed hourly bucket since the simulation epoch.
pub type Step = u64;

/// A model probability in [0, 1].
pub type Probability = f64;

/// An opaque account identifier. Carried to the audit record only.
pub type AccountId = String;

/// One submitted transaction, already type-coerced by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionEvent {
    pub occurred_at:         NaiveDateTime,
    /// Open set (PAYMENT, TRANSFER, CASH_OUT, ...). The model validates it.
    #[serde(rename = "type")]
    pub txn_type:            String,
    pub amount:              f64,
    pub old_balance_origin:  f64,
    pub new_balance_origin:  f64,
    pub old_balance_dest:    f64,
    pub new_balance_dest:    f64,
    pub origin_account:      AccountId,
    pub destination_account: AccountId,
}

impl TransactionEvent {
    /// Reject events with non-finite amounts before anything reaches the model.
    pub fn validate(&self) -> ScoreResult<()> {
        let fields = [
            ("amount", self.amount),
            ("old_balance_origin", self.old_balance_origin),
            ("new_balance_origin", self.new_balance_origin),
            ("old_balance_dest", self.old_balance_dest),
            ("new_balance_dest", self.new_balance_dest),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ScoreError::InvalidInput(format!(
                    "{name} must be a finite number, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// Discrete risk label produced by the decision policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLabel {
    Low,
    Medium,
    High,
}

impl RiskLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low    => "LOW",
            Self::Medium => "MEDIUM",
            Self::High   => "HIGH",
        }
    }

    /// Presentation hint for the rendering layer.
    pub fn css_class(&self) -> &'static str {
        match self {
            Self::Low    => "risk-low",
            Self::Medium => "risk-medium",
            Self::High   => "risk-high",
        }
    }
}

impl std::fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which policy branch produced the label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    FlagOverride,
    DemoCutoff,
    CalibratedThreshold,
    CalibratedMidpoint,
    BelowMidpoint,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FlagOverride        => "flag override",
            Self::DemoCutoff          => "demo cutoff",
            Self::CalibratedThreshold => "calibrated threshold",
            Self::CalibratedMidpoint  => "calibrated midpoint",
            Self::BelowMidpoint       => "below midpoint",
        }
    }
}

impl std::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome handed back to the caller for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskResult {
    pub probability:    Probability,
    pub percent:        f64,
    pub label:          RiskLabel,
    pub label_reason:   DecisionReason,
    pub step:           Step,
    pub is_flagged:     u8,
    pub threshold_used: f64,
}
