//! Fraud-flag heuristic.
//!
//! A small random baseline models an unrelated fraud-control trigger.
//! The magnitude and balance rules below can only raise the flag.

use crate::rng::FlagSource;

// ── Constants ────────────────────────────────────────────────────────────────

pub const DEFAULT_BASELINE_RATE: f64 = 0.01;

const LARGE_VALUE_AMOUNT: f64 = 100_000.0;
const ZERO_DEST_INBOUND_AMOUNT: f64 = 50_000.0;

/// Returns 1 when the transaction is flagged, 0 otherwise.
pub fn compute_flag(
    amount: f64,
    new_balance_origin: f64,
    old_balance_dest: f64,
    baseline_rate: f64,
    rng: &mut dyn FlagSource,
) -> u8 {
    let baseline = rng.chance(baseline_rate);
    if baseline || override_fires(amount, new_balance_origin, old_balance_dest) {
        1
    } else {
        0
    }
}

/// True when any deterministic rule fires. Malformed (non-finite) inputs
/// fire nothing; the flag then rests on the baseline draw alone.
pub fn override_fires(amount: f64, new_balance_origin: f64, old_balance_dest: f64) -> bool {
    if !(amount.is_finite() && new_balance_origin.is_finite() && old_balance_dest.is_finite()) {
        log::debug!("fraud flag: non-finite input, overrides skipped");
        return false;
    }

    let large_value = amount >= LARGE_VALUE_AMOUNT;
    let origin_drained = new_balance_origin == 0.0;
    let zero_dest_inbound = old_balance_dest == 0.0 && amount > ZERO_DEST_INBOUND_AMOUNT;

    large_value || origin_drained || zero_dest_inbound
}
