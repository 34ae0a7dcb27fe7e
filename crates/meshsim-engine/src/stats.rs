//! Numerically stable online latency statistics.

use meshsim_core::LatencyStats;

/// Welford online accumulator for mean and variance.
///
/// Keeps a running mean and sum of squared deviations (`m2`) instead of raw
/// sums of squares, which lose precision and eventually overflow at high
/// request volumes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct WelfordAccumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl WelfordAccumulator {
    /// Creates an empty accumulator.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    /// Folds one sample into the running statistics.
    pub fn record(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = value - self.mean;
        self.m2 += delta * delta2;
    }

    /// Number of samples recorded.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Running mean; 0 before any sample.
    #[must_use]
    pub const fn mean(&self) -> f64 {
        self.mean
    }

    /// Sample variance (`n - 1` divisor); 0 for fewer than two samples.
    #[must_use]
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.m2 / (self.count - 1) as f64
        } else {
            0.0
        }
    }

    /// Coefficient of variation; 0 when the mean is 0.
    #[must_use]
    pub fn cv(&self) -> f64 {
        if self.mean != 0.0 {
            self.variance().sqrt() / self.mean
        } else {
            0.0
        }
    }

    /// Snapshot as the output statistics pair.
    #[must_use]
    pub fn stats(&self) -> LatencyStats {
        LatencyStats {
            mean: self.mean,
            cv: self.cv(),
        }
    }
}
