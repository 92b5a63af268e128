//! Test session setup and teardown
//!
//! Provides `TestSession`, the process-wide scope of a run: configuration,
//! gateway client, readiness outcome and an optional event cursor.
//!
//! The cursor is a single mutable resource whose offsets every test
//! advances. It is only reachable through [`TestSession::lease_cursor`],
//! which needs `&mut self`: two tests cannot hold it at once, and every lease
//! starts fast-forwarded to the log end.

use std::ops::{Deref, DerefMut};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::HarnessConfig;
use crate::error::{HarnessError, HarnessResult};
use crate::http::ApiClient;
use crate::poller::{confirm, ConfirmOptions};
use crate::predicates::MessagePredicate;
use crate::readiness::wait_until_ready;
use crate::stream::kafka::ensure_topics;
use crate::stream::{EventSource, KafkaCursor, ALL_TOPICS};

/// Session-wide state shared by every test of a run
pub struct TestSession<S: EventSource = KafkaCursor> {
    config: HarnessConfig,
    api: ApiClient,
    cursor: Option<S>,
    leases: u64,
}

impl TestSession<KafkaCursor> {
    /// Wait for the gateway, then build a session without a cursor
    ///
    /// Returns [`HarnessError::ServiceUnavailable`] when the gateway never
    /// answers; the caller decides whether that aborts the run.
    pub async fn start(config: HarnessConfig) -> HarnessResult<Self> {
        let api = ApiClient::new(config.api_gateway_url.clone());
        wait_until_ready(&api, config.ready_timeout, config.ready_interval).await?;
        Ok(Self::new(config, api))
    }

    /// Bind a Kafka cursor to every observed topic
    ///
    /// Missing topics are created first. If the broker refuses, the cursor
    /// still binds them at their beginning.
    pub async fn connect_events(&mut self) -> HarnessResult<()> {
        let brokers = &self.config.kafka_broker_url;
        if let Err(e) = ensure_topics(brokers, &ALL_TOPICS).await {
            warn!(error = %e, "could not pre-create topics");
        }
        let cursor = KafkaCursor::connect(brokers, &ALL_TOPICS)?;
        info!(brokers = %self.config.kafka_broker_url, topics = ?ALL_TOPICS, "event cursor bound");
        self.attach_cursor(cursor);
        Ok(())
    }
}

impl<S: EventSource> TestSession<S> {
    /// Session over an already reachable gateway
    pub fn new(config: HarnessConfig, api: ApiClient) -> Self {
        Self {
            config,
            api,
            cursor: None,
            leases: 0,
        }
    }

    pub fn attach_cursor(&mut self, cursor: S) {
        self.cursor = Some(cursor);
    }

    pub fn has_cursor(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Confirmation window configured for this run
    pub fn confirm_options(&self) -> ConfirmOptions {
        ConfirmOptions::new(self.config.event_deadline, self.config.event_step)
    }

    /// Borrow the cursor for one test
    ///
    /// The cursor is fast-forwarded first, so the lease only observes
    /// messages produced after this call.
    pub fn lease_cursor(&mut self) -> HarnessResult<CursorLease<'_, S>> {
        let options = self.confirm_options();
        let api = &self.api;
        let cursor = self
            .cursor
            .as_mut()
            .ok_or_else(|| HarnessError::Config("no event cursor attached to session".into()))?;
        cursor.fast_forward()?;
        self.leases += 1;
        debug!(lease = self.leases, "cursor leased");

        Ok(CursorLease {
            api,
            cursor,
            options,
            lease: self.leases,
            acquired: Instant::now(),
        })
    }

    /// Tear the session down, releasing the cursor
    pub fn finish(self) {
        info!(leases = self.leases, "session finished");
    }
}

/// Exclusive, fast-forwarded access to the session cursor
///
/// Also lends the gateway client, so a test can trigger the action while
/// holding the lease.
pub struct CursorLease<'s, S: EventSource> {
    api: &'s ApiClient,
    cursor: &'s mut S,
    options: ConfirmOptions,
    lease: u64,
    acquired: Instant,
}

impl<'s, S: EventSource> CursorLease<'s, S> {
    pub fn api(&self) -> &'s ApiClient {
        self.api
    }

    pub fn options(&self) -> ConfirmOptions {
        self.options
    }

    /// [`confirm`] with the session's confirmation window
    pub fn confirm<P: MessagePredicate>(&mut self, topic: &str, predicate: P) -> HarnessResult<bool> {
        confirm(&mut *self.cursor, topic, predicate, self.options)
    }
}

impl<'s, S: EventSource> Deref for CursorLease<'s, S> {
    type Target = S;

    fn deref(&self) -> &S {
        &*self.cursor
    }
}

impl<'s, S: EventSource> DerefMut for CursorLease<'s, S> {
    fn deref_mut(&mut self) -> &mut S {
        &mut *self.cursor
    }
}

impl<'s, S: EventSource> Drop for CursorLease<'s, S> {
    fn drop(&mut self) {
        debug!(lease = self.lease, held = ?self.acquired.elapsed(), "cursor released");
    }
}
