//! Harness error types
//!
//! Errors raised by the harness itself (transport, broker, fixture setup,
//! predicate evaluation). Assertion failures live in [`crate::assertions`].

use reqwest::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Result type for harness operations
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

/// Errors that can occur while driving the gateway or reading the event stream
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Transport-level HTTP failure (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Kafka client error from rdkafka
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// JSON encoding or decoding failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A fixture step got an unexpected status from the gateway
    #[error("{action} failed with status {status}: {body}")]
    Setup {
        action: &'static str,
        status: StatusCode,
        body: String,
    },

    /// A response body lacked a field the harness needs
    #[error("{context}: missing field '{field}'")]
    MissingField { context: String, field: String },

    /// A caller-supplied predicate could not evaluate a message
    #[error("predicate failed on {topic}@{offset}: {reason}")]
    Predicate {
        topic: String,
        offset: i64,
        reason: String,
    },

    /// The gateway never answered the health check
    #[error("service at {url} not ready after {waited:?} ({attempts} attempts)")]
    ServiceUnavailable {
        url: String,
        waited: Duration,
        attempts: u32,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl HarnessError {
    /// Build a [`HarnessError::MissingField`]
    pub fn missing(context: impl Into<String>, field: impl Into<String>) -> Self {
        HarnessError::MissingField {
            context: context.into(),
            field: field.into(),
        }
    }
}

/// Error returned by a message predicate
///
/// Kept separate from [`HarnessError`] so matchers stay independent of the
/// transport; the poller attaches topic and offset when it propagates one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct PredicateError(pub String);

impl PredicateError {
    pub fn new(reason: impl Into<String>) -> Self {
        PredicateError(reason.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_includes_body() {
        let err = HarnessError::Setup {
            action: "register",
            status: StatusCode::BAD_REQUEST,
            body: r#"{"error":"user with this login already exists"}"#.to_string(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("register failed with status 400"));
        assert!(msg.contains("already exists"));
    }
}
