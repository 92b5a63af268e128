//! Event stream access
//!
//! A cursor is bound to an explicit list of (topic, partition 0) pairs and
//! only ever moves forward. Before each test it is fast-forwarded to the log
//! end so a test observes nothing produced before it started.
//!
//! - `kafka.rs` - cursor over a real broker (rdkafka `BaseConsumer`)
//! - `memory.rs` - in-process log with the same contract, for self-tests

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::error::{HarnessResult, PredicateError};

pub mod kafka;
pub mod memory;

pub use kafka::KafkaCursor;
pub use memory::{MemoryCursor, MemoryLog};

/// Topic receiving one message per successful registration
pub const USER_REGISTRATIONS: &str = "user-registrations";
/// Topic receiving one message per post view
pub const POST_VIEWS: &str = "post-views";
/// Topic receiving like/unlike messages
pub const POST_LIKES: &str = "post-likes";
/// Topic receiving one message per added comment
pub const POST_COMMENTS: &str = "post-comments";

/// Every topic the harness observes
pub const ALL_TOPICS: [&str; 4] = [USER_REGISTRATIONS, POST_VIEWS, POST_LIKES, POST_COMMENTS];

/// The only partition the harness binds on each topic
pub const BOUND_PARTITION: i32 = 0;

/// A (topic, partition) pair
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TopicPartition {
    pub topic: String,
    pub partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// A message read from the stream
///
/// Key and value are decoded as UTF-8 (lossy); the harness only ever does
/// text or JSON matching on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventMessage {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub key: Option<String>,
    pub value: String,
}

impl EventMessage {
    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }

    /// Parse the value as a JSON document
    pub fn value_json(&self) -> Result<serde_json::Value, PredicateError> {
        serde_json::from_str(&self.value).map_err(|e| {
            PredicateError::new(format!("value is not JSON ({}): {:.80}", e, self.value))
        })
    }
}

/// Messages returned by one poll, grouped and ordered per partition
pub type PollBatch = BTreeMap<TopicPartition, Vec<EventMessage>>;

/// Group messages into a [`PollBatch`], preserving per-partition order
pub fn batch_from(messages: impl IntoIterator<Item = EventMessage>) -> PollBatch {
    let mut batch = PollBatch::new();
    for msg in messages {
        batch.entry(msg.topic_partition()).or_default().push(msg);
    }
    batch
}

/// A forward-only reader over a fixed set of topic partitions
pub trait EventSource {
    /// The (topic, partition) pairs this source is bound to
    fn bindings(&self) -> &[TopicPartition];

    /// Move every bound partition to its current log end
    fn fast_forward(&mut self) -> HarnessResult<()>;

    /// Return messages that became available since the last poll
    ///
    /// Waits at most `timeout` for the first message and never longer.
    fn poll(&mut self, timeout: Duration) -> HarnessResult<PollBatch>;
}

impl<S: EventSource + ?Sized> EventSource for Box<S> {
    fn bindings(&self) -> &[TopicPartition] {
        (**self).bindings()
    }

    fn fast_forward(&mut self) -> HarnessResult<()> {
        (**self).fast_forward()
    }

    fn poll(&mut self, timeout: Duration) -> HarnessResult<PollBatch> {
        (**self).poll(timeout)
    }
}

/// Bindings for `topics`, each pinned to partition 0
pub fn bind_partition_zero(topics: &[&str]) -> Vec<TopicPartition> {
    topics
        .iter()
        .map(|t| TopicPartition::new(*t, BOUND_PARTITION))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(topic: &str, offset: i64) -> EventMessage {
        EventMessage {
            topic: topic.to_string(),
            partition: 0,
            offset,
            key: None,
            value: format!("{{\"n\":{}}}", offset),
        }
    }

    #[test]
    fn test_batch_groups_and_keeps_order() {
        let batch = batch_from(vec![msg(POST_VIEWS, 3), msg(POST_LIKES, 1), msg(POST_VIEWS, 4)]);
        assert_eq!(batch.len(), 2);
        let views = &batch[&TopicPartition::new(POST_VIEWS, 0)];
        assert_eq!(views.iter().map(|m| m.offset).collect::<Vec<_>>(), vec![3, 4]);
    }

    #[test]
    fn test_bindings_pin_partition_zero() {
        let bindings = bind_partition_zero(&ALL_TOPICS);
        assert_eq!(bindings.len(), 4);
        assert!(bindings.iter().all(|tp| tp.partition == 0));
        assert_eq!(bindings[0].to_string(), "user-registrations-0");
    }

    #[test]
    fn test_value_json_error() {
        let mut m = msg(POST_COMMENTS, 0);
        m.value = "\u{0}\u{0}\u{0}\u{0}\u{7}avro".to_string();
        assert!(m.value_json().is_err());
    }
}
