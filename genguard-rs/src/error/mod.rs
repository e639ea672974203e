//! Error handling for GenGuard
//!
//! This module provides the error system shared by every component:
//! - Categorizes remote failures (network, auth, rate limit, service)
//! - Separates locally detected conditions (timeouts, malformed output)
//! - Classifies every error into a [`FailureKind`] for retry decisions
//! - Provides a convenient Result type alias

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

pub mod mapping;

/// Result type for GenGuard operations
pub type Result<T> = std::result::Result<T, GenGuardError>;

/// Message surfaced to end users when a generation request cannot be completed
pub const TRY_AGAIN_MESSAGE: &str =
    "Something went wrong while generating your content. Please try again.";

/// Coarse classification used by retry policies and pipeline events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The remote service failed in a way that may succeed on retry
    TransientRemote,

    /// A deadline elapsed before the remote call resolved
    Timeout,

    /// The remote service rejected the request itself
    Permanent,

    /// The reply arrived but no usable structure could be recovered
    MalformedOutput,

    /// All attempts were used up
    Exhausted,

    /// Configuration, persistence or internal failures on this side
    Local,
}

impl FailureKind {
    /// Whether a failure of this kind is worth retrying under a transient-only policy
    pub fn is_transient(self) -> bool {
        matches!(self, FailureKind::TransientRemote | FailureKind::Timeout)
    }
}

/// Main error type for GenGuard
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GenGuardError {
    /// Network or connection errors
    #[error("Network error: {0}")]
    Network(String),

    /// Service-side failures (5xx and unclassified statuses)
    #[error("Service error: {0}")]
    Service(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Authentication or authorization errors
    #[error("Authentication error: {0}")]
    Authentication(String),

    /// The request was rejected as invalid
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Response parsing errors
    #[error("Parsing error: {0}")]
    Parsing(String),

    /// A deadline elapsed
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// No recoverable structure could be extracted from a reply
    #[error("Malformed output: no recoverable structure in {} chars of reply", .raw.chars().count())]
    MalformedOutput {
        /// The reply exactly as received
        raw: String,
    },

    /// Every attempt failed
    #[error("Gave up after {attempts} attempt(s): {last_error}")]
    Exhausted {
        /// Number of attempts made
        attempts: u32,

        /// Failure reported by the final attempt
        last_error: Box<GenGuardError>,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Artifact persistence errors
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Unexpected or internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GenGuardError {
    /// Create a new network error
    pub fn network<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Network(msg.into())
    }

    /// Create a new service error
    pub fn service<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Service(msg.into())
    }

    /// Create a new rate limit error
    pub fn rate_limit<S: Into<String>>(msg: S) -> Self {
        GenGuardError::RateLimit(msg.into())
    }

    /// Create a new authentication error
    pub fn authentication<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Authentication(msg.into())
    }

    /// Create a new invalid input error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        GenGuardError::InvalidInput(msg.into())
    }

    /// Create a new parsing error
    pub fn parsing<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Parsing(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Timeout(msg.into())
    }

    /// Create a timeout error for an elapsed deadline
    pub fn timeout_after(deadline: Duration) -> Self {
        GenGuardError::Timeout(format!("no reply within {:?}", deadline))
    }

    /// Create a malformed output error carrying the raw reply
    pub fn malformed_output<S: Into<String>>(raw: S) -> Self {
        GenGuardError::MalformedOutput { raw: raw.into() }
    }

    /// Create an exhausted error wrapping the final attempt's failure
    pub fn exhausted(attempts: u32, last_error: GenGuardError) -> Self {
        GenGuardError::Exhausted {
            attempts,
            last_error: Box::new(last_error),
        }
    }

    /// Create a new configuration error
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Configuration(msg.into())
    }

    /// Create a new persistence error
    pub fn persistence<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Persistence(msg.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        GenGuardError::Internal(msg.into())
    }

    /// Classify this error
    pub fn kind(&self) -> FailureKind {
        match self {
            GenGuardError::Network(_)
            | GenGuardError::Service(_)
            | GenGuardError::RateLimit(_)
            | GenGuardError::Parsing(_) => FailureKind::TransientRemote,
            GenGuardError::Timeout(_) => FailureKind::Timeout,
            GenGuardError::Authentication(_) | GenGuardError::InvalidInput(_) => {
                FailureKind::Permanent
            }
            GenGuardError::MalformedOutput { .. } => FailureKind::MalformedOutput,
            GenGuardError::Exhausted { .. } => FailureKind::Exhausted,
            GenGuardError::Configuration(_)
            | GenGuardError::Persistence(_)
            | GenGuardError::Internal(_) => FailureKind::Local,
        }
    }

    /// Check if this error is transient
    pub fn is_retryable(&self) -> bool {
        self.kind().is_transient()
    }

    /// The failure reported by the last attempt, looking through [`GenGuardError::Exhausted`]
    pub fn root_cause(&self) -> &GenGuardError {
        match self {
            GenGuardError::Exhausted { last_error, .. } => last_error.root_cause(),
            other => other,
        }
    }

    /// Message suitable for showing to end users
    pub fn user_message(&self) -> &'static str {
        TRY_AGAIN_MESSAGE
    }
}

/// Convert reqwest errors to GenGuardError
impl From<reqwest::Error> for GenGuardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GenGuardError::timeout(format!("Request timed out: {}", err))
        } else if err.is_connect() {
            GenGuardError::network(format!("Connection error: {}", err))
        } else if err.is_decode() {
            GenGuardError::parsing(format!("Failed to decode response: {}", err))
        } else if let Some(status) = err.status() {
            mapping::map_status(status, &err.to_string())
        } else {
            GenGuardError::network(format!("Request failed: {}", err))
        }
    }
}

/// Convert serde_json errors to GenGuardError
impl From<serde_json::Error> for GenGuardError {
    fn from(err: serde_json::Error) -> Self {
        GenGuardError::parsing(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(GenGuardError::service("boom").kind(), FailureKind::TransientRemote);
        assert_eq!(GenGuardError::timeout_after(Duration::from_secs(45)).kind(), FailureKind::Timeout);
        assert_eq!(GenGuardError::authentication("nope").kind(), FailureKind::Permanent);
        assert_eq!(GenGuardError::malformed_output("??").kind(), FailureKind::MalformedOutput);
        assert_eq!(GenGuardError::persistence("disk").kind(), FailureKind::Local);
    }

    #[test]
    fn test_exhausted_keeps_last_error() {
        let err = GenGuardError::exhausted(3, GenGuardError::rate_limit("slow down"));

        assert_eq!(err.kind(), FailureKind::Exhausted);
        assert!(!err.is_retryable());
        assert!(matches!(err.root_cause(), GenGuardError::RateLimit(_)));
        assert!(err.to_string().contains("3 attempt(s)"));
        assert_eq!(err.user_message(), TRY_AGAIN_MESSAGE);
    }

    #[test]
    fn test_malformed_output_display_omits_raw_text() {
        let err = GenGuardError::malformed_output("secret reply");
        assert_eq!(err.to_string(), "Malformed output: no recoverable structure in 12 chars of reply");
    }
}
