// Session and lease tests against the in-memory event log

use social_e2e::predicates::{has_value, key_equals};
use social_e2e::stream::{ALL_TOPICS, POST_COMMENTS, USER_REGISTRATIONS};
use social_e2e::{assert_event, assert_no_event, HarnessConfig, MemoryCursor, MemoryLog, TestSession};
use social_e2e::http::ApiClient;
use std::thread;
use std::time::Duration;

fn session(log: &MemoryLog) -> TestSession<MemoryCursor> {
    let config = HarnessConfig {
        event_deadline: Duration::from_millis(300),
        event_step: Duration::from_millis(25),
        ..HarnessConfig::default()
    };
    let mut session = TestSession::new(config, ApiClient::new("http://api-gateway:8080"));
    session.attach_cursor(log.cursor(&ALL_TOPICS));
    session
}

#[test]
fn test_event_produced_by_another_thread_is_confirmed() {
    let log = MemoryLog::new();
    let mut session = session(&log);
    let mut lease = session.lease_cursor().unwrap();
    let options = lease.options();

    let producer = log.clone();
    let handle = thread::spawn(move || {
        thread::sleep(Duration::from_millis(50));
        producer.produce(USER_REGISTRATIONS, Some("u-7"), r#"{"user_id":"u-7"}"#);
    });

    assert_event(&mut *lease, USER_REGISTRATIONS, key_equals("u-7"), options, "key u-7").unwrap();
    handle.join().unwrap();
}

#[test]
fn test_backlog_from_previous_test_is_skipped() {
    let log = MemoryLog::new();
    let mut session = session(&log);

    // A previous test left an unread comment event behind
    log.produce(POST_COMMENTS, None, r#"{"comment_id":"c-1","text":"hello kafka"}"#);

    let mut lease = session.lease_cursor().unwrap();
    let options = lease.options();
    assert_no_event(&mut *lease, POST_COMMENTS, has_value("c-1"), options, "comment c-1").unwrap();
}
