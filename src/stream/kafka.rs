//! Kafka-backed event cursor
//!
//! Uses manual partition assignment only. The consumer never subscribes and
//! never joins its group, so concurrent harness runs cannot rebalance each
//! other or replay each other's history.

use rdkafka::admin::{AdminClient, AdminOptions, NewTopic, TopicReplication, TopicResult};
use rdkafka::client::DefaultClientContext;
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::{KafkaError, KafkaResult, RDKafkaErrorCode};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::{Offset, TopicPartitionList};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{bind_partition_zero, EventMessage, EventSource, PollBatch, TopicPartition};
use crate::error::{HarnessError, HarnessResult};

/// Timeout for watermark queries while fast-forwarding
pub const WATERMARK_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for topic creation on the broker
pub const ADMIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Upper bound on messages drained by a single `poll`
const MAX_DRAIN: usize = 500;

/// Create a consumer suitable for manual assignment
pub fn create_assign_only_consumer(brokers: &str) -> HarnessResult<BaseConsumer> {
    let group_id = format!("social-e2e-{}", &Uuid::new_v4().to_string()[..8]);
    let consumer: BaseConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", &group_id)
        .set("enable.auto.commit", "false")
        .set("enable.auto.offset.store", "false")
        .set("auto.offset.reset", "latest")
        .set("broker.address.family", "v4")
        .create()?;
    Ok(consumer)
}

/// Create an admin client for topic management
fn create_admin_client(brokers: &str) -> HarnessResult<AdminClient<DefaultClientContext>> {
    let admin: AdminClient<DefaultClientContext> = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("broker.address.family", "v4")
        .create()?;
    Ok(admin)
}

/// Make sure every topic exists with one partition
///
/// The services only create their topics on first write, so on a fresh
/// deployment some of them are missing. A topic that already exists counts
/// as success.
pub async fn ensure_topics(brokers: &str, topics: &[&str]) -> HarnessResult<()> {
    let admin = create_admin_client(brokers)?;
    let new_topics: Vec<NewTopic<'_>> = topics
        .iter()
        .map(|topic| NewTopic::new(topic, 1, TopicReplication::Fixed(1)))
        .collect();
    let opts = AdminOptions::new().operation_timeout(Some(ADMIN_TIMEOUT));

    for result in admin.create_topics(&new_topics, &opts).await? {
        if let Some(topic) = topic_created(result)? {
            info!(topic = %topic, "topic created");
        }
    }
    Ok(())
}

/// Outcome of one topic creation: `Some(name)` if it was created now,
/// `None` if it already existed
fn topic_created(result: TopicResult) -> HarnessResult<Option<String>> {
    match result {
        Ok(topic) => Ok(Some(topic)),
        Err((_, RDKafkaErrorCode::TopicAlreadyExists)) => Ok(None),
        Err((topic, code)) => {
            warn!(topic = %topic, error = %code, "topic creation failed");
            Err(HarnessError::Kafka(KafkaError::AdminOp(code)))
        }
    }
}

/// Offset a fast-forward assigns, given the partition's watermarks
///
/// A topic that does not exist yet is bound at its beginning: everything
/// written to it later is newer than the fast-forward.
fn start_offset(watermarks: KafkaResult<(i64, i64)>) -> KafkaResult<Offset> {
    match watermarks {
        Ok((_low, high)) => Ok(Offset::Offset(high)),
        Err(e) if is_missing_topic(&e) => Ok(Offset::Beginning),
        Err(e) => Err(e),
    }
}

fn is_missing_topic(error: &KafkaError) -> bool {
    matches!(
        error.rdkafka_error_code(),
        Some(
            RDKafkaErrorCode::UnknownTopicOrPartition
                | RDKafkaErrorCode::UnknownTopic
                | RDKafkaErrorCode::UnknownPartition
        )
    )
}

fn to_event(msg: &BorrowedMessage<'_>) -> EventMessage {
    EventMessage {
        topic: msg.topic().to_string(),
        partition: msg.partition(),
        offset: msg.offset(),
        key: msg.key().map(|k| String::from_utf8_lossy(k).into_owned()),
        value: msg
            .payload()
            .map(|v| String::from_utf8_lossy(v).into_owned())
            .unwrap_or_default(),
    }
}

/// Drain one batch from `next`, which polls the consumer for at most the
/// given wait
///
/// Waits up to `timeout` for the first message, then only takes what is
/// already buffered. Errors are logged and skipped; before the first message
/// the wait shrinks to what is left of `timeout`, after it the drain stops.
fn drain<F>(timeout: Duration, mut next: F) -> PollBatch
where
    F: FnMut(Duration) -> Option<KafkaResult<EventMessage>>,
{
    let deadline = Instant::now() + timeout;
    let mut batch = PollBatch::new();
    let mut drained = 0;
    let mut wait = timeout;

    while drained < MAX_DRAIN {
        match next(wait) {
            Some(Ok(event)) => {
                batch.entry(event.topic_partition()).or_default().push(event);
                drained += 1;
                wait = Duration::ZERO;
            }
            Some(Err(e)) => {
                warn!("consumer error while polling: {}", e);
                if drained > 0 {
                    break;
                }
                wait = deadline.saturating_duration_since(Instant::now());
                if wait.is_zero() {
                    break;
                }
            }
            None => break,
        }
    }

    if drained > 0 {
        debug!(drained, partitions = batch.len(), "poll");
    }
    batch
}

/// Cursor over a fixed set of Kafka topic partitions
pub struct KafkaCursor {
    consumer: BaseConsumer,
    bindings: Vec<TopicPartition>,
}

impl KafkaCursor {
    /// Bind `topics` (partition 0 each) and start at the log end
    pub fn connect(brokers: &str, topics: &[&str]) -> HarnessResult<Self> {
        let consumer = create_assign_only_consumer(brokers)?;
        let mut cursor = Self {
            consumer,
            bindings: bind_partition_zero(topics),
        };
        cursor.fast_forward()?;
        Ok(cursor)
    }

    /// Offset at which new messages will land on one partition
    fn log_end(&self, tp: &TopicPartition) -> HarnessResult<Offset> {
        let watermarks = self
            .consumer
            .fetch_watermarks(&tp.topic, tp.partition, WATERMARK_TIMEOUT);
        Ok(start_offset(watermarks)?)
    }
}

impl EventSource for KafkaCursor {
    fn bindings(&self) -> &[TopicPartition] {
        &self.bindings
    }

    /// Re-assign every partition at its high watermark
    ///
    /// The watermark is resolved eagerly; `Offset::End` would be resolved on
    /// the first fetch and could skip messages produced in between. Missing
    /// topics stay assigned at their beginning.
    fn fast_forward(&mut self) -> HarnessResult<()> {
        let mut assignment = TopicPartitionList::new();
        for tp in &self.bindings {
            let end = self.log_end(tp)?;
            debug!(topic_partition = %tp, offset = ?end, "fast-forward");
            assignment.add_partition_offset(&tp.topic, tp.partition, end)?;
        }
        self.consumer.assign(&assignment)?;
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> HarnessResult<PollBatch> {
        let consumer = &self.consumer;
        Ok(drain(timeout, |wait| {
            consumer.poll(wait).map(|r| r.map(|msg| to_event(&msg)))
        }))
    }
}
