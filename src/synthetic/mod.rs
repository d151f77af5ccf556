//! Synthetic fallback data
//!
//! Deterministic, seeded generation of plausible sites for catalog entries
//! that have no usable telemetry.

pub mod prng;
pub mod site_gen;

pub use prng::{
    hash_seed, RandomSource, SeedStrategy, StdRngSource, StdRngStrategy, XorShiftSource,
    XorShiftStrategy,
};
pub use site_gen::{weather_for, SyntheticSiteGenerator};
