//! Configuration for the remote streams.

use std::time::Duration;

/// Configuration shared by the watch and write streams.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Database resource name sent with every request.
    pub database: String,
    /// Backoff policy used to compute restart delays after failures.
    pub backoff: BackoffConfig,
}

impl StreamConfig {
    /// Creates a configuration for a database resource name.
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            backoff: BackoffConfig::default(),
        }
    }

    /// Creates a configuration for `projects/{project}/databases/{database}`.
    pub fn for_project(project_id: &str, database_id: &str) -> Self {
        Self::new(format!("projects/{project_id}/databases/{database_id}"))
    }

    /// Sets the backoff configuration.
    pub fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::for_project("default", "(default)")
    }
}

/// Exponential backoff policy for restarting failed streams.
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failure.
    pub initial_delay: Duration,
    /// Upper bound on the delay before jitter.
    pub max_delay: Duration,
    /// Growth factor per consecutive failure.
    pub multiplier: f64,
    /// Extra random delay as a fraction of the base delay (0.5 = up to 50%).
    pub jitter_factor: f64,
}

impl BackoffConfig {
    /// Creates a policy with no delay at all.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            multiplier: 1.0,
            jitter_factor: 0.0,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the growth factor.
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Sets the jitter factor.
    pub fn with_jitter_factor(mut self, jitter_factor: f64) -> Self {
        self.jitter_factor = jitter_factor;
        self
    }
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 1.5,
            jitter_factor: 0.5,
        }
    }
}
