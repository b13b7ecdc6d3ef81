//! Transient-failure classification and exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::BackoffConfig;
use crate::error::ErrorClass;

/// Lowercase markers that identify a transient failure in free-form error text.
const TRANSIENT_MARKERS: &[&str] = &[
    "429",
    "rate limit",
    "timeout",
    "timed out",
    "gateway",
    "temporar",
    "unavailable",
];

/// Classifies an HTTP status code.
///
/// Rate limiting, request timeouts and gateway-side failures are transient.
/// Everything else, including 401/403 and exhausted quotas reported as 4xx,
/// is permanent.
#[must_use]
pub const fn classify_status(status: u16) -> ErrorClass {
    match status {
        408 | 425 | 429 | 500 | 502 | 503 | 504 | 520..=524 => ErrorClass::Transient,
        _ => ErrorClass::Permanent,
    }
}

/// Classifies an error by its text.
///
/// Fallback for failures without a status code; matching is case-insensitive.
#[must_use]
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_lowercase();
    if TRANSIENT_MARKERS.iter().any(|marker| lower.contains(marker)) {
        ErrorClass::Transient
    } else {
        ErrorClass::Permanent
    }
}

/// Delay schedule for one run of the provider retry loop.
///
/// The base delay starts at `initial_delay` and doubles after each use,
/// capped at `max_delay`. Each returned delay adds uniform jitter in
/// `[0, max_jitter)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: BackoffConfig,
    next: Duration,
}

impl Backoff {
    /// Starts a fresh schedule.
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self {
            next: config.initial_delay.min(config.max_delay),
            config,
        }
    }

    /// Returns the delay to sleep before the next attempt and advances the schedule.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.next;
        self.next = base.saturating_mul(2).min(self.config.max_delay);
        base + self.jitter()
    }

    fn jitter(&self) -> Duration {
        let max_nanos = u64::try_from(self.config.max_jitter.as_nanos()).unwrap_or(u64::MAX);
        if max_nanos == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..max_nanos))
    }
}
