//! Common utilities shared across the scenario suites

use crate::session::TestSession;
use tokio::task::block_in_place;

/// Test result type alias for cleaner function signatures
pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Session type the scenario suites run against
pub type Session = TestSession;

/// Print a step marker, as every scenario does between requests
pub fn step(message: &str) {
    println!("{}...", message);
}

/// Run a synchronous cursor call without stalling the runtime
///
/// Confirmation polls the broker with blocking waits. Needs the
/// multi-threaded runtime.
pub fn blocking<T>(f: impl FnOnce() -> T) -> T {
    block_in_place(f)
}

/// Print a passed check
pub fn ok(message: &str) {
    println!("✅ {}", message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assertions::assert_event;
    use crate::poller::ConfirmOptions;
    use crate::predicates::field_equals;
    use crate::stream::{EventSource, MemoryLog, POST_LIKES};
    use std::time::Duration;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_blocking_confirm_leaves_runtime_free() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_LIKES]);
        cursor.fast_forward().unwrap();

        // Produced by a task on the same runtime while the confirm waits
        let producer = log.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            producer.produce(POST_LIKES, None, r#"{"post_id":"7"}"#);
        });

        let options = ConfirmOptions::new(Duration::from_secs(2), Duration::from_millis(20));
        let result = blocking(|| {
            assert_event(&mut cursor, POST_LIKES, field_equals("post_id", "7"), options, "post 7")
        });
        assert!(result.is_ok());
        task.await.unwrap();
    }
}
