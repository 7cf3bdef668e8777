//! Coercion of raw form fields into a TransactionEvent.

use crate::{
    error::{ScoreError, ScoreResult},
    types::TransactionEvent,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Fields exactly as a form submits them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTransaction {
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM`, seconds optional
    pub time: String,
    #[serde(rename = "type")]
    pub txn_type: String,
    pub amount: String,
    pub old_balance_origin: String,
    pub new_balance_origin: String,
    pub old_balance_dest: String,
    pub new_balance_dest: String,
    #[serde(default)]
    pub origin_account: String,
    #[serde(default)]
    pub destination_account: String,
}

impl RawTransaction {
    pub fn parse(&self) -> ScoreResult<TransactionEvent> {
        let event = TransactionEvent {
            occurred_at:         parse_occurred_at(&self.date, &self.time)?,
            txn_type:            self.txn_type.trim().to_string(),
            amount:              parse_amount("amount", &self.amount)?,
            old_balance_origin:  parse_amount("old_balance_origin", &self.old_balance_origin)?,
            new_balance_origin:  parse_amount("new_balance_origin", &self.new_balance_origin)?,
            old_balance_dest:    parse_amount("old_balance_dest", &self.old_balance_dest)?,
            new_balance_dest:    parse_amount("new_balance_dest", &self.new_balance_dest)?,
            origin_account:      self.origin_account.clone(),
            destination_account: self.destination_account.clone(),
        };
        Ok(event)
    }
}

fn parse_amount(field: &str, raw: &str) -> ScoreResult<f64> {
    let value: f64 = raw.trim().parse().map_err(|e| {
        ScoreError::InvalidInput(format!("invalid numeric input for {field}: {raw:?} ({e})"))
    })?;
    if !value.is_finite() {
        return Err(ScoreError::InvalidInput(format!(
            "invalid numeric input for {field}: {raw:?} is not finite"
        )));
    }
    Ok(value)
}

/// `{date}T{time}` as ISO 8601, else `{date} {time}` as `%Y-%m-%d %H:%M`.
pub fn parse_occurred_at(date: &str, time: &str) -> ScoreResult<NaiveDateTime> {
    let (date, time) = (date.trim(), time.trim());
    let iso = format!("{date}T{time}");
    iso.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(&iso, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(&format!("{date} {time}"), "%Y-%m-%d %H:%M"))
        .map_err(|e| ScoreError::InvalidInput(format!("invalid date/time {date} {time}: {e}")))
}
