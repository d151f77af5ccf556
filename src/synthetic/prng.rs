//! Seeded random sources
//!
//! Synthetic sites must be byte-for-byte reproducible: the same catalog
//! entry always produces the same site, across runs and across platforms.
//! All randomness flows through a [`RandomSource`] seeded from a string, and
//! the algorithm is a named, swappable strategy. The default is a hand-rolled
//! xorshift64* whose output is fully pinned down by this crate; a
//! [`rand::rngs::StdRng`]-backed source exists as the alternate strategy.

use rand::{Rng, SeedableRng};

/// A deterministic stream of floats in `[0, 1)`.
pub trait RandomSource {
    fn next_f64(&mut self) -> f64;

    /// Uniform float in `[lo, hi)`.
    fn in_range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    /// Uniform integer in `[lo, hi]`, both ends inclusive.
    fn int_in_range(&mut self, lo: i64, hi: i64) -> i64 {
        lo + (self.next_f64() * (hi - lo + 1) as f64) as i64
    }

    /// Pick one element. `items` must be non-empty.
    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let idx = (self.next_f64() * items.len() as f64) as usize;
        &items[idx.min(items.len() - 1)]
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.next_f64() < probability
    }
}

/// Seeding strategy: turns a site key into a [`RandomSource`].
pub trait SeedStrategy {
    type Source: RandomSource;
    fn seed(&self, input: &str) -> Self::Source;
}

/// FNV-1a over the input bytes; stable across platforms.
pub fn hash_seed(input: &str) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

// ============================================================================
// Default strategy: xorshift64*
// ============================================================================

/// Hand-rolled xorshift64* stream. The default source: its output depends on
/// nothing but this file, which is what pins synthetic sites across releases.
#[derive(Debug, Clone)]
pub struct XorShiftSource {
    state: u64,
}

impl XorShiftSource {
    pub fn seeded(input: &str) -> Self {
        let hash = hash_seed(input);
        Self {
            // xorshift state must never be zero
            state: if hash == 0 { 0x9e37_79b9_7f4a_7c15 } else { hash },
        }
    }
}

impl RandomSource for XorShiftSource {
    fn next_f64(&mut self) -> f64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        let scrambled = x.wrapping_mul(0x2545_f491_4f6c_dd1d);
        // top 53 bits give a float in [0, 1)
        (scrambled >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XorShiftStrategy;

impl SeedStrategy for XorShiftStrategy {
    type Source = XorShiftSource;

    fn seed(&self, input: &str) -> XorShiftSource {
        XorShiftSource::seeded(input)
    }
}

// ============================================================================
// Alternate strategy: rand::StdRng
// ============================================================================

/// [`rand::rngs::StdRng`] seeded from the same string hash. Deterministic per
/// rand release, but its stream is rand's to change; use the xorshift source
/// where long-term stability matters.
#[derive(Debug, Clone)]
pub struct StdRngSource {
    rng: rand::rngs::StdRng,
}

impl StdRngSource {
    pub fn seeded(input: &str) -> Self {
        Self {
            rng: rand::rngs::StdRng::seed_from_u64(hash_seed(input)),
        }
    }
}

impl RandomSource for StdRngSource {
    fn next_f64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StdRngStrategy;

impl SeedStrategy for StdRngStrategy {
    type Source = StdRngSource;

    fn seed(&self, input: &str) -> StdRngSource {
        StdRngSource::seeded(input)
    }
}
