//! Audit trail: one durable row per decision.
//!
//! RULE: append only. A sink never rewrites or removes earlier rows.
//! A failed append is reported to the caller but never undoes the decision.

use crate::{
    error::{ScoreError, ScoreResult},
    features::FeatureRecord,
    types::{AccountId, RiskLabel, RiskResult, Step, TransactionEvent},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Column order of every audit store. Schema-stable: append new columns only.
pub const AUDIT_COLUMNS: [&str; 13] = [
    "step",
    "type",
    "amount",
    "old_balance_origin",
    "new_balance_origin",
    "old_balance_dest",
    "new_balance_dest",
    "is_flagged",
    "origin_account",
    "destination_account",
    "percent",
    "label",
    "logged_at",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub step:                Step,
    #[serde(rename = "type")]
    pub txn_type:            String,
    pub amount:              f64,
    pub old_balance_origin:  f64,
    pub new_balance_origin:  f64,
    pub old_balance_dest:    f64,
    pub new_balance_dest:    f64,
    pub is_flagged:          u8,
    pub origin_account:      AccountId,
    pub destination_account: AccountId,
    pub percent:             f64,
    pub label:               RiskLabel,
    /// When the decision was made, not when the transaction happened.
    pub logged_at:           NaiveDateTime,
}

impl AuditRecord {
    pub fn new(
        features: &FeatureRecord,
        event: &TransactionEvent,
        result: &RiskResult,
        logged_at: NaiveDateTime,
    ) -> Self {
        Self {
            step:                features.step,
            txn_type:            features.txn_type.clone(),
            amount:              features.amount,
            old_balance_origin:  features.old_balance_origin,
            new_balance_origin:  features.new_balance_origin,
            old_balance_dest:    features.old_balance_dest,
            new_balance_dest:    features.new_balance_dest,
            is_flagged:          features.is_flagged,
            origin_account:      event.origin_account.clone(),
            destination_account: event.destination_account.clone(),
            percent:             result.percent,
            label:               result.label,
            logged_at,
        }
    }

    /// ISO 8601 with microseconds.
    pub fn logged_at_iso(&self) -> String {
        self.logged_at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
    }

    /// Field values in AUDIT_COLUMNS order, unescaped.
    pub fn values(&self) -> [String; 13] {
        [
            self.step.to_string(),
            self.txn_type.clone(),
            self.amount.to_string(),
            self.old_balance_origin.to_string(),
            self.new_balance_origin.to_string(),
            self.old_balance_dest.to_string(),
            self.new_balance_dest.to_string(),
            self.is_flagged.to_string(),
            self.origin_account.clone(),
            self.destination_account.clone(),
            self.percent.to_string(),
            self.label.as_str().to_string(),
            self.logged_at_iso(),
        ]
    }
}

/// Where decisions are recorded. Implementations must make each append
/// atomic with respect to concurrent appends.
pub trait AuditSink: Send + Sync {
    fn append(&self, record: &AuditRecord) -> ScoreResult<()>;
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn append(&self, _record: &AuditRecord) -> ScoreResult<()> {
        Ok(())
    }
}

// ── CSV log ──────────────────────────────────────────────────────────────────

/// Comma-delimited append-only file with a single header row.
///
/// The header check and the append are serialized by this instance's lock
/// only. Keep one CsvAuditLog per path per process and share it (the engine
/// owns one); separate instances or processes on the same path can each see
/// the file missing and each write a header.
pub struct CsvAuditLog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Data rows written so far, header excluded. 0 if the file is absent.
    pub fn row_count(&self) -> ScoreResult<usize> {
        if !self.path.exists() {
            return Ok(0);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(count_records(&content).saturating_sub(1))
    }

    fn write_row(&self, record: &AuditRecord) -> std::io::Result<()> {
        // Header is decided by absence right before this write.
        let needs_header = !self.path.exists();

        let mut buf = String::new();
        if needs_header {
            buf.push_str(&AUDIT_COLUMNS.join(","));
            buf.push('\n');
        }
        let row: Vec<String> = record.values().iter().map(|v| escape_field(v)).collect();
        buf.push_str(&row.join(","));
        buf.push('\n');

        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf.as_bytes())?;
        file.flush()
    }
}

impl AuditSink for CsvAuditLog {
    fn append(&self, record: &AuditRecord) -> ScoreResult<()> {
        // A poisoned lock only means another append panicked; the file
        // itself is still usable.
        let _guard = self.write_lock.lock().unwrap_or_else(|p| p.into_inner());
        self.write_row(record).map_err(|e| {
            ScoreError::LogWriteFailed(format!("{}: {e}", self.path.display()))
        })
    }
}

/// Quote a field when it holds a delimiter, quote or line break.
pub fn escape_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Count records, honoring line breaks inside quoted fields.
fn count_records(content: &str) -> usize {
    let mut in_quotes = false;
    let mut records = 0;
    let mut line_has_content = false;
    for c in content.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                line_has_content = true;
            }
            '\n' if !in_quotes => {
                if line_has_content {
                    records += 1;
                }
                line_has_content = false;
            }
            '\r' if !in_quotes => {}
            _ => line_has_content = true,
        }
    }
    if line_has_content {
        records += 1;
    }
    records
}
