//! Restart delays for streams that closed with an error.

use crate::config::BackoffConfig;
use rand::Rng;
use std::time::Duration;

/// Tracks consecutive stream failures and computes the next restart delay.
///
/// The stream never restarts itself. Callers read
/// [`next_delay`](Self::next_delay) after an error close and schedule the
/// restart on their own timer.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    failures: u32,
}

impl ExponentialBackoff {
    /// Creates a backoff with no recorded failures.
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            config,
            failures: 0,
        }
    }

    /// Returns the number of consecutive failures.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Records a failed stream.
    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Forgets all failures, typically after a successful open.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Returns the base delay for the current failure count, without jitter.
    pub fn base_delay(&self) -> Duration {
        if self.failures == 0 {
            return Duration::ZERO;
        }
        let exponent = (self.failures - 1).min(i32::MAX as u32) as i32;
        let base = self.config.initial_delay.as_secs_f64() * self.config.multiplier.powi(exponent);
        let capped = base.min(self.config.max_delay.as_secs_f64());
        if capped.is_finite() && capped > 0.0 {
            Duration::from_secs_f64(capped)
        } else {
            Duration::ZERO
        }
    }

    /// Returns the delay to wait before the next restart, with jitter.
    pub fn next_delay(&self) -> Duration {
        let base = self.base_delay();
        if base.is_zero() || self.config.jitter_factor <= 0.0 {
            return base;
        }
        let jitter = base.mul_f64(self.config.jitter_factor * rand::thread_rng().gen::<f64>());
        base + jitter
    }
}
