//! Harness configuration
//!
//! Every setting comes from the environment with a default that matches the
//! docker-compose deployment of the social network stack.

use std::env;
use std::time::Duration;

use crate::error::{HarnessError, HarnessResult};

/// Gateway base URL when `API_GATEWAY_URL` is unset
pub const DEFAULT_API_GATEWAY_URL: &str = "http://api-gateway:8080";

/// Kafka bootstrap servers when `KAFKA_BROKER_URL` is unset
pub const DEFAULT_KAFKA_BROKER_URL: &str = "kafka:9092";

/// How long the readiness gate waits before aborting the run
pub const DEFAULT_READY_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between readiness checks
pub const DEFAULT_READY_INTERVAL: Duration = Duration::from_secs(1);

/// Default deadline for confirming an event on a topic
pub const DEFAULT_EVENT_DEADLINE: Duration = Duration::from_secs(5);

/// Default single poll step inside the confirmation window
pub const DEFAULT_EVENT_STEP: Duration = Duration::from_millis(200);

/// Configuration for one harness run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Base URL of the API gateway, without trailing slash
    pub api_gateway_url: String,
    /// Kafka bootstrap servers (e.g., "kafka:9092")
    pub kafka_broker_url: String,
    pub ready_timeout: Duration,
    pub ready_interval: Duration,
    /// Deadline passed to the event-confirmation poller
    pub event_deadline: Duration,
    /// Poll step passed to the event-confirmation poller
    pub event_step: Duration,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            api_gateway_url: DEFAULT_API_GATEWAY_URL.to_string(),
            kafka_broker_url: DEFAULT_KAFKA_BROKER_URL.to_string(),
            ready_timeout: DEFAULT_READY_TIMEOUT,
            ready_interval: DEFAULT_READY_INTERVAL,
            event_deadline: DEFAULT_EVENT_DEADLINE,
            event_step: DEFAULT_EVENT_STEP,
        }
    }
}

impl HarnessConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> HarnessResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> HarnessResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let api_gateway_url = get("API_GATEWAY_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_gateway_url);
        if !api_gateway_url.starts_with("http://") && !api_gateway_url.starts_with("https://") {
            return Err(HarnessError::Config(format!(
                "API_GATEWAY_URL must be an http(s) URL, got '{}'",
                api_gateway_url
            )));
        }

        let kafka_broker_url = get("KAFKA_BROKER_URL")
            .map(|v| v.trim().to_string())
            .unwrap_or(defaults.kafka_broker_url);

        let ready_timeout = match get("E2E_READY_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("E2E_READY_TIMEOUT_SECS", &raw)?),
            None => defaults.ready_timeout,
        };
        let event_deadline = match get("E2E_EVENT_DEADLINE_SECS") {
            Some(raw) => Duration::from_secs(parse_positive("E2E_EVENT_DEADLINE_SECS", &raw)?),
            None => defaults.event_deadline,
        };
        let event_step = match get("E2E_EVENT_STEP_MS") {
            Some(raw) => Duration::from_millis(parse_positive("E2E_EVENT_STEP_MS", &raw)?),
            None => defaults.event_step,
        };

        if event_step > event_deadline {
            return Err(HarnessError::Config(format!(
                "E2E_EVENT_STEP_MS ({:?}) exceeds E2E_EVENT_DEADLINE_SECS ({:?})",
                event_step, event_deadline
            )));
        }

        Ok(Self {
            api_gateway_url,
            kafka_broker_url,
            ready_timeout,
            ready_interval: defaults.ready_interval,
            event_deadline,
            event_step,
        })
    }
}

fn parse_positive(key: &str, raw: &str) -> HarnessResult<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(HarnessError::Config(format!("{} must be positive", key))),
        Ok(v) => Ok(v),
        Err(e) => Err(HarnessError::Config(format!(
            "{} must be an integer, got '{}': {}",
            key, raw, e
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = HarnessConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.api_gateway_url, "http://api-gateway:8080");
        assert_eq!(config.kafka_broker_url, "kafka:9092");
        assert_eq!(config.event_deadline, Duration::from_secs(5));
        assert_eq!(config.event_step, Duration::from_millis(200));
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = HarnessConfig::from_lookup(lookup(&[
            ("API_GATEWAY_URL", "http://localhost:8080/"),
            ("KAFKA_BROKER_URL", "localhost:29092"),
            ("E2E_READY_TIMEOUT_SECS", "60"),
            ("E2E_EVENT_STEP_MS", "50"),
        ]))
        .unwrap();
        assert_eq!(config.api_gateway_url, "http://localhost:8080");
        assert_eq!(config.kafka_broker_url, "localhost:29092");
        assert_eq!(config.ready_timeout, Duration::from_secs(60));
        assert_eq!(config.event_step, Duration::from_millis(50));
    }

    #[test]
    fn test_empty_value_falls_back_to_default() {
        let config = HarnessConfig::from_lookup(lookup(&[("KAFKA_BROKER_URL", "  ")])).unwrap();
        assert_eq!(config.kafka_broker_url, DEFAULT_KAFKA_BROKER_URL);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(HarnessConfig::from_lookup(lookup(&[("API_GATEWAY_URL", "api-gateway:8080")])).is_err());
        assert!(HarnessConfig::from_lookup(lookup(&[("E2E_READY_TIMEOUT_SECS", "soon")])).is_err());
        assert!(HarnessConfig::from_lookup(lookup(&[("E2E_EVENT_DEADLINE_SECS", "0")])).is_err());
        assert!(HarnessConfig::from_lookup(lookup(&[
            ("E2E_EVENT_DEADLINE_SECS", "1"),
            ("E2E_EVENT_STEP_MS", "1500"),
        ]))
        .is_err());
    }
}
