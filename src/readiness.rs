//! Readiness gate
//!
//! Blocks the run until the gateway answers its health check. The waiting
//! logic is a small state machine so the timeout contract can be tested with
//! paused tokio time and a scripted health check.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::{HarnessError, HarnessResult};
use crate::http::{ApiClient, ApiRequest};

/// Liveness endpoint exposed by the gateway
pub const HEALTH_PATH: &str = "/ping";

/// Exit status used when the gateway never becomes ready
pub const EXIT_SERVICE_UNAVAILABLE: i32 = 2;

/// Result of one health check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthOutcome {
    /// Check answered with a 2xx status
    Healthy,
    /// Check answered, but not with success
    Unhealthy(StatusCode),
    /// Connection refused, DNS failure, reset...
    Unreachable(String),
}

/// Readiness gate state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessState {
    Waiting,
    Ready,
    TimedOut,
}

/// Tracks health check attempts against a fixed deadline
#[derive(Debug)]
pub struct ReadinessGate {
    timeout: Duration,
    interval: Duration,
    started: Instant,
    attempts: u32,
    state: ReadinessState,
}

impl ReadinessGate {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self::starting_at(Instant::now(), timeout, interval)
    }

    pub fn starting_at(started: Instant, timeout: Duration, interval: Duration) -> Self {
        Self {
            timeout,
            interval,
            started,
            attempts: 0,
            state: ReadinessState::Waiting,
        }
    }

    pub fn state(&self) -> ReadinessState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Apply one health check outcome observed at `now`
    ///
    /// `Ready` and `TimedOut` are terminal; further observations are ignored.
    pub fn observe(&mut self, outcome: &HealthOutcome, now: Instant) -> ReadinessState {
        if self.state != ReadinessState::Waiting {
            return self.state;
        }
        self.attempts += 1;

        self.state = match outcome {
            HealthOutcome::Healthy => ReadinessState::Ready,
            _ if now.saturating_duration_since(self.started) >= self.timeout => {
                ReadinessState::TimedOut
            }
            _ => ReadinessState::Waiting,
        };
        self.state
    }

    /// Time to sleep before the next check, clipped to the deadline
    pub fn next_delay(&self, now: Instant) -> Duration {
        let remaining = self
            .timeout
            .saturating_sub(now.saturating_duration_since(self.started));
        self.interval.min(remaining)
    }

    /// Drive the gate to a terminal state with `check`
    pub async fn run<F, Fut>(mut self, mut check: F) -> (ReadinessState, u32)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = HealthOutcome>,
    {
        loop {
            let outcome = check().await;
            let now = Instant::now();
            match self.observe(&outcome, now) {
                ReadinessState::Waiting => {
                    debug!(attempt = self.attempts, ?outcome, "service not ready yet");
                    tokio::time::sleep(self.next_delay(now)).await;
                }
                terminal => return (terminal, self.attempts),
            }
        }
    }
}

/// Check the gateway health endpoint once
///
/// Transport errors are reported as [`HealthOutcome::Unreachable`], never as
/// an `Err`.
pub async fn check_health(api: &ApiClient) -> HealthOutcome {
    match api.send(ApiRequest::get(HEALTH_PATH)).await {
        Ok(resp) if resp.status.is_success() => HealthOutcome::Healthy,
        Ok(resp) => HealthOutcome::Unhealthy(resp.status),
        Err(e) => HealthOutcome::Unreachable(e.to_string()),
    }
}

/// Wait until the gateway is ready or `timeout` elapses
pub async fn wait_until_ready(
    api: &ApiClient,
    timeout: Duration,
    interval: Duration,
) -> HarnessResult<()> {
    info!(url = api.base_url(), ?timeout, "waiting for service");
    let started = Instant::now();
    let gate = ReadinessGate::starting_at(started, timeout, interval);
    let (state, attempts) = gate.run(|| check_health(api)).await;

    match state {
        ReadinessState::Ready => {
            info!(attempts, elapsed = ?started.elapsed(), "service ready");
            Ok(())
        }
        _ => {
            warn!(attempts, "service did not become ready");
            Err(HarnessError::ServiceUnavailable {
                url: api.url(HEALTH_PATH),
                waited: started.elapsed(),
                attempts,
            })
        }
    }
}
