//! Feature assembly: the fixed input schema of the probability model.
//!
//! RULE: any change to FeatureRecord or FEATURE_COLUMNS is a breaking change
//! for every trained artifact. Bump FEATURE_SCHEMA_VERSION when it happens.

use crate::types::{Step, TransactionEvent};
use serde::{Deserialize, Serialize};

pub const FEATURE_SCHEMA_VERSION: u32 = 1;

/// Column names as the model was trained on them, in order.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "step",
    "type",
    "amount",
    "oldbalanceOrg",
    "newbalanceOrig",
    "oldbalanceDest",
    "newbalanceDest",
    "isFlaggedFraud",
];

/// The only categorical column; every other model column is numeric.
pub const CATEGORICAL_FEATURE: &str = "type";

pub fn is_numeric_feature(column: &str) -> bool {
    column != CATEGORICAL_FEATURE && FEATURE_COLUMNS.contains(&column)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub step:               Step,
    #[serde(rename = "type")]
    pub txn_type:           String,
    pub amount:             f64,
    #[serde(rename = "oldbalanceOrg")]
    pub old_balance_origin: f64,
    #[serde(rename = "newbalanceOrig")]
    pub new_balance_origin: f64,
    #[serde(rename = "oldbalanceDest")]
    pub old_balance_dest:   f64,
    #[serde(rename = "newbalanceDest")]
    pub new_balance_dest:   f64,
    #[serde(rename = "isFlaggedFraud")]
    pub is_flagged:         u8,
}

impl FeatureRecord {
    /// Look up a numeric feature by its model column name.
    pub fn numeric(&self, column: &str) -> Option<f64> {
        match column {
            "step"           => Some(self.step as f64),
            "amount"         => Some(self.amount),
            "oldbalanceOrg"  => Some(self.old_balance_origin),
            "newbalanceOrig" => Some(self.new_balance_origin),
            "oldbalanceDest" => Some(self.old_balance_dest),
            "newbalanceDest" => Some(self.new_balance_dest),
            "isFlaggedFraud" => Some(self.is_flagged as f64),
            _ => None,
        }
    }
}

/// Pure: copies the event's model fields and injects step and flag.
/// Account identifiers never reach the model.
pub fn assemble(event: &TransactionEvent, step: Step, is_flagged: u8) -> FeatureRecord {
    FeatureRecord {
        step,
        txn_type:           event.txn_type.clone(),
        amount:             event.amount,
        old_balance_origin: event.old_balance_origin,
        new_balance_origin: event.new_balance_origin,
        old_balance_dest:   event.old_balance_dest,
        new_balance_dest:   event.new_balance_dest,
        is_flagged,
    }
}
