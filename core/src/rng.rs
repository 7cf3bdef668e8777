//! Random sources for the baseline fraud flag.
//!
//! RULE: nothing in the pipeline calls a global RNG.
//! The caller passes a FlagSource into every decision, so tests can pin
//! the draw with a seed or a fixed value.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Capability the flag heuristic draws its baseline from.
pub trait FlagSource {
    /// Roll a float in [0.0, 1.0).
    fn next_unit(&mut self) -> f64;

    /// Bernoulli trial: returns true with probability p.
    fn chance(&mut self, p: f64) -> bool {
        self.next_unit() < p
    }
}

/// Reproducible source: the same seed yields the same sequence of draws.
pub struct SeededFlagSource {
    inner: Pcg64Mcg,
}

impl SeededFlagSource {
    pub fn new(seed: u64) -> Self {
        Self { inner: Pcg64Mcg::seed_from_u64(seed) }
    }
}

impl FlagSource for SeededFlagSource {
    fn next_unit(&mut self) -> f64 {
        unit_from_bits(self.inner.next_u64())
    }
}

/// Production source, seeded once from OS entropy.
pub struct EntropyFlagSource {
    inner: Pcg64Mcg,
}

impl EntropyFlagSource {
    pub fn new() -> Self {
        Self { inner: Pcg64Mcg::from_entropy() }
    }
}

impl Default for EntropyFlagSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagSource for EntropyFlagSource {
    fn next_unit(&mut self) -> f64 {
        unit_from_bits(self.inner.next_u64())
    }
}

/// Always returns the same draw. 0.0 always trips a non-zero rate,
/// 1.0 never trips any rate.
#[derive(Debug, Clone, Copy)]
pub struct FixedDraw(pub f64);

impl FlagSource for FixedDraw {
    fn next_unit(&mut self) -> f64 {
        self.0
    }
}

/// Top 53 bits of a u64 mapped onto [0, 1).
fn unit_from_bits(bits: u64) -> f64 {
    (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
