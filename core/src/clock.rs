//! Simulation epoch and the hourly step index derived from it.
//!
//! RULE: the epoch is parsed once at startup and never changes afterwards.
//! Step 1 covers the first hour after the epoch; steps only grow.

use crate::{
    error::{ScoreError, ScoreResult},
    types::Step,
};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SIM_START: &str = "2017-01-01T00:00:00";

const SECONDS_PER_STEP: i64 = 3600;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SimulationEpoch {
    pub sim_start: NaiveDateTime,
}

impl SimulationEpoch {
    pub fn new(sim_start: NaiveDateTime) -> Self {
        Self { sim_start }
    }

    /// Parse a configured start; falls back to the default epoch when the
    /// value is missing or matches neither accepted format.
    pub fn from_config(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };
        match parse_timestamp(raw) {
            Some(sim_start) => Self { sim_start },
            None => {
                log::warn!(
                    "unparsable simulation_start {raw:?}, using default {DEFAULT_SIM_START}"
                );
                Self::default()
            }
        }
    }

    pub fn to_step(&self, occurred_at: NaiveDateTime) -> ScoreResult<Step> {
        to_step(occurred_at, self.sim_start)
    }
}

impl Default for SimulationEpoch {
    fn default() -> Self {
        let sim_start = NaiveDate::from_ymd_opt(2017, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .unwrap_or(NaiveDateTime::MIN);
        Self { sim_start }
    }
}

/// Elapsed whole hours since `sim_start`, plus one.
pub fn to_step(occurred_at: NaiveDateTime, sim_start: NaiveDateTime) -> ScoreResult<Step> {
    if occurred_at < sim_start {
        return Err(ScoreError::BeforeEpoch { occurred_at, sim_start });
    }
    // Non-negative here, so integer division floors.
    let elapsed = (occurred_at - sim_start).num_seconds();
    Ok((elapsed / SECONDS_PER_STEP) as Step + 1)
}

/// ISO 8601 with `T` or space separator, seconds and fraction optional.
/// A bare date means midnight.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    raw.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M"))
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
