//! In-process event log
//!
//! Same contract as the Kafka cursor, backed by a shared vector per
//! partition. Producers may append from any thread; a polling cursor is woken
//! as soon as something lands on a partition it is bound to.

use parking_lot::{Condvar, Mutex};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::{bind_partition_zero, batch_from, EventMessage, EventSource, PollBatch, TopicPartition};
use crate::error::HarnessResult;

#[derive(Default)]
struct LogState {
    partitions: HashMap<TopicPartition, Vec<EventMessage>>,
}

/// Shared append-only log, cheap to clone
#[derive(Clone, Default)]
pub struct MemoryLog {
    inner: Arc<(Mutex<LogState>, Condvar)>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message to partition 0 of `topic`, returning its offset
    pub fn produce(&self, topic: &str, key: Option<&str>, value: impl Into<String>) -> i64 {
        self.produce_to(topic, 0, key, value)
    }

    pub fn produce_to(
        &self,
        topic: &str,
        partition: i32,
        key: Option<&str>,
        value: impl Into<String>,
    ) -> i64 {
        let (lock, cvar) = &*self.inner;
        let mut state = lock.lock();
        let log = state
            .partitions
            .entry(TopicPartition::new(topic, partition))
            .or_default();
        let offset = log.len() as i64;
        log.push(EventMessage {
            topic: topic.to_string(),
            partition,
            offset,
            key: key.map(str::to_string),
            value: value.into(),
        });
        cvar.notify_all();
        offset
    }

    /// Cursor bound to partition 0 of each topic, starting at the log end
    pub fn cursor(&self, topics: &[&str]) -> MemoryCursor {
        let mut cursor = MemoryCursor {
            log: self.clone(),
            bindings: bind_partition_zero(topics),
            positions: HashMap::new(),
        };
        cursor.seek_to_end();
        cursor
    }
}

/// Cursor over a [`MemoryLog`]
pub struct MemoryCursor {
    log: MemoryLog,
    bindings: Vec<TopicPartition>,
    positions: HashMap<TopicPartition, i64>,
}

impl MemoryCursor {
    /// Current read position on a bound partition
    pub fn position(&self, tp: &TopicPartition) -> Option<i64> {
        self.positions.get(tp).copied()
    }

    fn seek_to_end(&mut self) {
        let (lock, _) = &*self.log.inner;
        let state = lock.lock();
        for tp in &self.bindings {
            let end = state.partitions.get(tp).map(|l| l.len() as i64).unwrap_or(0);
            self.positions.insert(tp.clone(), end);
        }
    }

    fn take_available(&mut self, state: &LogState) -> Vec<EventMessage> {
        let mut out = Vec::new();
        for tp in &self.bindings {
            let Some(log) = state.partitions.get(tp) else {
                continue;
            };
            let pos = self.positions.entry(tp.clone()).or_insert(0);
            let start = (*pos).max(0) as usize;
            if start < log.len() {
                out.extend_from_slice(&log[start..]);
                *pos = log.len() as i64;
            }
        }
        out
    }
}

impl EventSource for MemoryCursor {
    fn bindings(&self) -> &[TopicPartition] {
        &self.bindings
    }

    fn fast_forward(&mut self) -> HarnessResult<()> {
        self.seek_to_end();
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> HarnessResult<PollBatch> {
        let deadline = Instant::now() + timeout;
        let log = self.log.clone();
        let (lock, cvar) = &*log.inner;
        let mut state = lock.lock();

        loop {
            let available = self.take_available(&state);
            if !available.is_empty() {
                return Ok(batch_from(available));
            }
            if cvar.wait_until(&mut state, deadline).timed_out() {
                let available = self.take_available(&state);
                return Ok(batch_from(available));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::{POST_LIKES, POST_VIEWS};
    use std::thread;

    #[test]
    fn test_cursor_starts_at_log_end() {
        let log = MemoryLog::new();
        log.produce(POST_VIEWS, None, "old-1");
        log.produce(POST_VIEWS, None, "old-2");

        let mut cursor = log.cursor(&[POST_VIEWS]);
        assert_eq!(cursor.position(&TopicPartition::new(POST_VIEWS, 0)), Some(2));
        assert!(cursor.poll(Duration::from_millis(10)).unwrap().is_empty());

        log.produce(POST_VIEWS, None, "new");
        let batch = cursor.poll(Duration::from_millis(10)).unwrap();
        let msgs = &batch[&TopicPartition::new(POST_VIEWS, 0)];
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].value, "new");
        assert_eq!(msgs[0].offset, 2);
    }

    #[test]
    fn test_fast_forward_skips_backlog() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS, POST_LIKES]);
        log.produce(POST_VIEWS, None, "stale");
        log.produce(POST_LIKES, None, "stale");

        cursor.fast_forward().unwrap();
        assert!(cursor.poll(Duration::from_millis(10)).unwrap().is_empty());
    }

    #[test]
    fn test_unbound_topics_invisible() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        log.produce(POST_LIKES, None, "elsewhere");
        log.produce_to(POST_VIEWS, 1, None, "other partition");
        assert!(cursor.poll(Duration::from_millis(10)).unwrap().is_empty());
    }

    #[test]
    fn test_poll_wakes_on_produce() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);

        let producer = log.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            producer.produce(POST_VIEWS, Some("k"), "late");
        });

        let start = Instant::now();
        let batch = cursor.poll(Duration::from_secs(2)).unwrap();
        handle.join().unwrap();

        assert_eq!(batch.values().map(Vec::len).sum::<usize>(), 1);
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_poll_never_exceeds_timeout() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        let start = Instant::now();
        assert!(cursor.poll(Duration::from_millis(100)).unwrap().is_empty());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(100));
        assert!(elapsed < Duration::from_millis(400), "poll took {:?}", elapsed);
    }
}
