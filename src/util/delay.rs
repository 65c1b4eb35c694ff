//! Randomised pre-submission delays.

use std::time::Duration;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Inclusive delay window in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange {
    /// Lower bound in milliseconds.
    pub min_ms: u64,
    /// Upper bound in milliseconds.
    pub max_ms: u64,
}

/// A delay window whose lower bound exceeds its upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("delay min {min_ms}ms exceeds max {max_ms}ms")]
pub struct InvertedDelay {
    /// Requested lower bound.
    pub min_ms: u64,
    /// Requested upper bound.
    pub max_ms: u64,
}

impl DelayRange {
    /// Build a range, rejecting `min > max`.
    pub fn new(min_ms: u64, max_ms: u64) -> Result<Self, InvertedDelay> {
        if min_ms > max_ms {
            return Err(InvertedDelay { min_ms, max_ms });
        }
        Ok(Self { min_ms, max_ms })
    }
}

impl Default for DelayRange {
    fn default() -> Self {
        Self {
            min_ms: 120,
            max_ms: 300,
        }
    }
}

/// Chooses how long to wait before a submission.
pub trait DelaySampler: Send + Sync {
    /// Sample a delay from `range`.
    fn sample(&self, range: DelayRange) -> Duration;
}

/// Uniform sampling over the inclusive range.
pub struct UniformDelay {
    rng: Mutex<StdRng>,
}

impl UniformDelay {
    /// Seeded from the OS.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Reproducible sequence for a given seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for UniformDelay {
    fn default() -> Self {
        Self::new()
    }
}

impl DelaySampler for UniformDelay {
    fn sample(&self, range: DelayRange) -> Duration {
        let (lo, hi) = if range.min_ms <= range.max_ms {
            (range.min_ms, range.max_ms)
        } else {
            (range.max_ms, range.min_ms)
        };
        let ms = self.rng.lock().random_range(lo..=hi);
        Duration::from_millis(ms)
    }
}

/// Always returns the same delay, ignoring the range.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedDelay(pub Duration);

impl DelaySampler for FixedDelay {
    fn sample(&self, _range: DelayRange) -> Duration {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_delay_stays_in_range() {
        let sampler = UniformDelay::seeded(7);
        let range = DelayRange::new(120, 300).unwrap();
        for _ in 0..200 {
            let d = sampler.sample(range);
            assert!(d >= Duration::from_millis(120) && d <= Duration::from_millis(300));
        }
    }

    #[test]
    fn degenerate_range_is_exact() {
        let sampler = UniformDelay::seeded(1);
        let range = DelayRange::new(50, 50).unwrap();
        assert_eq!(sampler.sample(range), Duration::from_millis(50));
    }

    #[test]
    fn inverted_range_rejected() {
        let err = DelayRange::new(300, 120).unwrap_err();
        assert_eq!(err, InvertedDelay { min_ms: 300, max_ms: 120 });
        assert_eq!(err.to_string(), "delay min 300ms exceeds max 120ms");
    }
}
