//! Error types for structured calls, with attempt and usage tracking.

use std::time::Duration;
use thiserror::Error;

use crate::resolver::Backend;
use crate::retry::{classify_message, classify_status};
use crate::usage::Usage;

/// Number of characters of raw model output kept for diagnostics.
pub const EXCERPT_CHARS: usize = 300;

/// Whether a transport failure is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Rate limiting, timeouts, gateway errors, temporary unavailability.
    Transient,
    /// Authentication, bad requests, exhausted quota and everything unrecognised.
    Permanent,
}

impl ErrorClass {
    /// Returns `true` for [`ErrorClass::Transient`].
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::Transient)
    }
}

/// A failed network round-trip, already classified by the transport.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    /// Retry classification.
    pub class: ErrorClass,
    /// HTTP status, when the backend answered at all.
    pub status: Option<u16>,
    /// Human-readable description, including a truncated response body.
    pub message: String,
    /// Usage reported alongside the failure, if any.
    pub usage: Option<Usage>,
}

impl TransportError {
    /// Creates an error with an explicit classification.
    #[must_use]
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            status: None,
            message: message.into(),
            usage: None,
        }
    }

    /// A failure known to be transient.
    #[must_use]
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient, message)
    }

    /// A failure known to be permanent.
    #[must_use]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Permanent, message)
    }

    /// Classifies a non-success HTTP answer by its status code.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            class: classify_status(status),
            status: Some(status),
            message: message.into(),
            usage: None,
        }
    }

    /// Classifies a failure that carries no status by its text.
    ///
    /// Only for providers that expose nothing more structured.
    #[must_use]
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self::new(classify_message(&message), message)
    }

    /// The per-call wall-clock limit expired.
    #[must_use]
    pub fn timeout(limit: Duration) -> Self {
        Self::transient(format!("request timed out after {limit:?}"))
    }

    /// Attaches usage the backend reported despite failing.
    #[must_use]
    pub const fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Returns `true` if the failure may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        self.class.is_transient()
    }
}

/// Model output that does not contain the structured JSON that was asked for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid JSON from LLM: {reason}\n{excerpt}")]
pub struct MalformedOutput {
    /// What went wrong: no JSON found, parse error, wrong top-level type, schema violation.
    pub reason: String,
    /// The first [`EXCERPT_CHARS`] characters of the raw output.
    pub excerpt: String,
}

impl MalformedOutput {
    /// Creates the error, keeping only the head of the raw text.
    #[must_use]
    pub fn new(reason: impl Into<String>, raw: &str) -> Self {
        Self {
            reason: reason.into(),
            excerpt: raw.chars().take(EXCERPT_CHARS).collect(),
        }
    }
}

/// Errors returned by [`Orchestrator::ask`](crate::Orchestrator::ask).
///
/// Every variant produced after at least one round-trip carries the attempt
/// count and the usage accumulated so far, so callers can still account for
/// the tokens spent on a failed call.
#[derive(Debug, Error)]
pub enum AskError {
    /// The backend failed permanently, or transient failures exhausted the retry bound.
    #[error("LLM provider error after {attempts} attempt(s): {source}")]
    Provider {
        /// The last transport failure.
        #[source]
        source: TransportError,
        /// Network round-trips made.
        attempts: u32,
        /// Usage accumulated across all attempts.
        usage: Usage,
    },

    /// Corrective rounds were exhausted without valid structured output.
    #[error("Model did not return valid JSON after {max_attempts} attempts")]
    InvalidStructuredOutput {
        /// Configured maximum of structured attempts (`max_retry_json + 1`).
        max_attempts: u32,
        /// Network round-trips made, including transient retries.
        attempts: u32,
        /// The malformed output seen on the final attempt.
        last: MalformedOutput,
        /// Usage accumulated across all attempts.
        usage: Usage,
    },

    /// The resolved backend has no transport registered.
    #[error("No transport configured for backend {0}")]
    BackendNotConfigured(Backend),

    /// Schema validation is enabled and the requested schema does not compile.
    #[error("Invalid JSON schema: {0}")]
    InvalidSchema(String),
}

impl AskError {
    /// Network round-trips made before failing.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        match self {
            Self::Provider { attempts, .. } | Self::InvalidStructuredOutput { attempts, .. } => {
                *attempts
            }
            Self::BackendNotConfigured(_) | Self::InvalidSchema(_) => 0,
        }
    }

    /// Usage accumulated before failing.
    #[must_use]
    pub fn usage(&self) -> Usage {
        match self {
            Self::Provider { usage, .. } | Self::InvalidStructuredOutput { usage, .. } => *usage,
            Self::BackendNotConfigured(_) | Self::InvalidSchema(_) => Usage::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_output_truncates_excerpt() {
        let raw = "x".repeat(1000);
        let err = MalformedOutput::new("no JSON found", &raw);
        assert_eq!(err.excerpt.chars().count(), EXCERPT_CHARS);
        assert!(err.to_string().starts_with("Invalid JSON from LLM: no JSON found"));
    }

    #[test]
    fn test_malformed_output_truncates_on_char_boundary() {
        let raw = "ж".repeat(400);
        let err = MalformedOutput::new("parse error", &raw);
        assert_eq!(err.excerpt.chars().count(), EXCERPT_CHARS);
    }

    #[test]
    fn test_transport_error_classification() {
        assert!(TransportError::from_status(429, "Too Many Requests").is_transient());
        assert!(!TransportError::from_status(401, "Unauthorized").is_transient());
        assert!(TransportError::timeout(Duration::from_secs(1)).is_transient());
        assert!(TransportError::from_message("502 Bad Gateway").is_transient());
        assert!(!TransportError::from_message("invalid api key").is_transient());
    }

    #[test]
    fn test_ask_error_reports_attempts() {
        let err = AskError::InvalidStructuredOutput {
            max_attempts: 3,
            attempts: 3,
            last: MalformedOutput::new("no JSON found", "hello"),
            usage: Usage::new(1, 2),
        };
        assert_eq!(err.attempts(), 3);
        assert_eq!(err.usage().total_tokens(), 3);
        assert_eq!(
            err.to_string(),
            "Model did not return valid JSON after 3 attempts"
        );
    }
}
