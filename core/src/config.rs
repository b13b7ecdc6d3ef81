//! Configuration for retry bounds, concurrency and timeouts.

use std::time::Duration;

/// Exponential backoff parameters for transient provider failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    /// Delay before the first retry (default: 200 ms).
    pub initial_delay: Duration,
    /// Upper bound for the doubled delay (default: 2 s).
    pub max_delay: Duration,
    /// Upper bound of the uniform random jitter added to each delay (default: 200 ms).
    pub max_jitter: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(2),
            max_jitter: Duration::from_millis(200),
        }
    }
}

impl BackoffConfig {
    /// Backoff with no delay at all. Useful for tests and replay tooling.
    #[must_use]
    pub const fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            max_jitter: Duration::ZERO,
        }
    }
}

/// Configuration for one [`Orchestrator`](crate::Orchestrator).
#[derive(Debug, Clone)]
pub struct RequesterConfig {
    /// Extra attempts on transient provider failures (default: 2, i.e. 3 total).
    pub max_retry_provider: u32,
    /// Extra attempts when the output is not valid structured JSON (default: 2).
    pub max_retry_json: u32,
    /// Simultaneous in-flight network calls across the process (default: 10).
    pub max_concurrent: usize,
    /// Wall-clock limit for a single network call (default: 180 s).
    pub request_timeout: Duration,
    /// Delay schedule between transient retries.
    pub backoff: BackoffConfig,
    /// Validate parsed output against the requested schema (default: false).
    pub validate_schema: bool,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            max_retry_provider: 2,
            max_retry_json: 2,
            max_concurrent: 10,
            request_timeout: Duration::from_secs(180),
            backoff: BackoffConfig::default(),
            validate_schema: false,
        }
    }
}

impl RequesterConfig {
    /// Set the number of extra attempts on transient provider failures.
    #[must_use]
    pub const fn with_max_retry_provider(mut self, retries: u32) -> Self {
        self.max_retry_provider = retries;
        self
    }

    /// Set the number of corrective rounds for malformed JSON.
    #[must_use]
    pub const fn with_max_retry_json(mut self, retries: u32) -> Self {
        self.max_retry_json = retries;
        self
    }

    /// Set the concurrency gate size. Zero is raised to one.
    #[must_use]
    pub const fn with_max_concurrent(mut self, permits: usize) -> Self {
        self.max_concurrent = if permits == 0 { 1 } else { permits };
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Set the backoff schedule.
    #[must_use]
    pub const fn with_backoff(mut self, backoff: BackoffConfig) -> Self {
        self.backoff = backoff;
        self
    }

    /// Enable or disable JSON-schema validation of structured output.
    #[must_use]
    pub const fn with_schema_validation(mut self, enabled: bool) -> Self {
        self.validate_schema = enabled;
        self
    }
}
