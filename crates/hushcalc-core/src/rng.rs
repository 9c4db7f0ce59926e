//! Random number generator abstraction for determinism.
//!
//! In production, this wraps a seeded `StdRng`. In tests, a fixed or
//! sequence-driven implementation is injected.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over random number generation.
pub trait DeterministicRng: Send + Sync {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;
}

/// Production RNG backed by `rand`'s `StdRng`.
#[derive(Debug)]
pub struct StdDeterministicRng(StdRng);

impl StdDeterministicRng {
    /// Creates an RNG with a fixed seed, for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// Creates an RNG seeded from operating-system entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self(StdRng::from_os_rng())
    }
}

impl DeterministicRng for StdDeterministicRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.random_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0.random::<f64>()
    }
}

/// Fisher-Yates shuffle driven by a `DeterministicRng`.
#[allow(clippy::cast_possible_truncation)]
pub fn shuffle<T>(items: &mut [T], rng: &mut dyn DeterministicRng) {
    for i in (1..items.len()).rev() {
        let j = rng.next_u32_range(0, i as u32) as usize;
        items.swap(i, j.min(i));
    }
}

/// Picks an index in `0..len` (returns 0 for an empty range).
#[allow(clippy::cast_possible_truncation)]
pub fn pick_index(len: usize, rng: &mut dyn DeterministicRng) -> usize {
    if len == 0 {
        return 0;
    }
    (rng.next_u32_range(0, (len - 1) as u32) as usize).min(len - 1)
}
