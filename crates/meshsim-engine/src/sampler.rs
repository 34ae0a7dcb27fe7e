//! Randomness sources for the simulation.
//!
//! Every stochastic draw in the engine goes through [`Sampler`], so seeded
//! runs replay bit-identically and tests can script exact draw sequences.
//! Samplers are created per slot during propagation; slots never share one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Source of uniform draws on `[0, 1)`.
pub trait Sampler {
    /// Next uniform draw on `[0, 1)`.
    fn unit(&mut self) -> f64;

    /// Next uniform draw on `[0, 100)`, used for percent-threshold
    /// selection.
    fn percent(&mut self) -> f64 {
        self.unit() * 100.0
    }

    /// Jittered latency: uniform on `[base - jitter, base + jitter]`,
    /// floored at zero.
    fn jittered(&mut self, base_ms: f64, jitter_ms: f64) -> f64 {
        let draw = base_ms - jitter_ms + self.unit() * 2.0 * jitter_ms;
        draw.max(0.0)
    }
}

/// Production sampler backed by a seedable PRNG.
#[derive(Clone, Debug)]
pub struct StdSampler {
    rng: StdRng,
}

impl StdSampler {
    /// Sampler replaying a fixed seed, for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Sampler drawing from OS entropy.
    #[must_use]
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Sampler for StdSampler {
    fn unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Scripted sampler replaying a fixed sequence of draws, cycling when the
/// sequence is exhausted. Intended for deterministic tests.
#[derive(Clone, Debug)]
pub struct SequenceSampler {
    values: Vec<f64>,
    next: usize,
}

impl SequenceSampler {
    /// Sampler replaying `values` in order, then cycling.
    ///
    /// # Panics
    ///
    /// Panics when `values` is empty.
    #[must_use]
    pub fn new(values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "draw sequence must not be empty");
        Self { values, next: 0 }
    }

    /// Sampler that always returns `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl Sampler for SequenceSampler {
    fn unit(&mut self) -> f64 {
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}
