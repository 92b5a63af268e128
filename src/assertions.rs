//! Custom test assertions
//!
//! Provides domain-specific assertions for gateway responses and confirmed
//! events. Each failure carries what was expected and what was observed.

use reqwest::StatusCode;
use std::fmt;

use crate::error::HarnessResult;
use crate::http::ApiResponse;
use crate::poller::{confirm, ConfirmOptions};
use crate::predicates::MessagePredicate;
use crate::stream::EventSource;

/// Custom assertion error with detailed information
#[derive(Debug)]
pub struct AssertionError {
    pub message: String,
    pub expected: String,
    pub actual: String,
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\n  Expected: {}\n  Actual: {}",
            self.message, self.expected, self.actual
        )
    }
}

impl std::error::Error for AssertionError {}

impl AssertionError {
    pub fn new(
        message: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            message: message.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// Assert that a response has exactly `expected` status
pub fn assert_status(
    resp: &ApiResponse,
    expected: StatusCode,
    context: &str,
) -> Result<(), AssertionError> {
    if resp.status != expected {
        return Err(AssertionError::new(
            format!("{}: unexpected status (body: {})", context, resp.body),
            expected.to_string(),
            resp.status.to_string(),
        ));
    }
    Ok(())
}

/// Assert that a response status is one of `allowed`
pub fn assert_status_in(
    resp: &ApiResponse,
    allowed: &[StatusCode],
    context: &str,
) -> Result<(), AssertionError> {
    if !allowed.contains(&resp.status) {
        let expected = allowed
            .iter()
            .map(|s| s.as_u16().to_string())
            .collect::<Vec<_>>()
            .join(" or ");
        return Err(AssertionError::new(
            format!("{}: unexpected status (body: {})", context, resp.body),
            expected,
            resp.status.to_string(),
        ));
    }
    Ok(())
}

/// Assert that the JSON value at `pointer` equals `expected`
pub fn assert_json_eq(
    doc: &serde_json::Value,
    pointer: &str,
    expected: &serde_json::Value,
    context: &str,
) -> Result<(), AssertionError> {
    match doc.pointer(pointer) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(AssertionError::new(
            format!("{}: field {} mismatch", context, pointer),
            expected.to_string(),
            actual.to_string(),
        )),
        None => Err(AssertionError::new(
            format!("{}: field {} missing", context, pointer),
            expected.to_string(),
            "absent",
        )),
    }
}

/// Assert that `pointer` exists and holds an array; returns it
pub fn assert_json_array<'a>(
    doc: &'a serde_json::Value,
    pointer: &str,
    context: &str,
) -> Result<&'a Vec<serde_json::Value>, AssertionError> {
    match doc.pointer(pointer) {
        Some(serde_json::Value::Array(items)) => Ok(items),
        Some(other) => Err(AssertionError::new(
            format!("{}: field {} is not a list", context, pointer),
            "array",
            other.to_string(),
        )),
        None => Err(AssertionError::new(
            format!("{}: field {} missing", context, pointer),
            "array",
            "absent",
        )),
    }
}

/// Assert that an event matching `predicate` shows up on `topic` in time
///
/// `expectation` describes the awaited event for the failure message.
pub fn assert_event<S, P>(
    cursor: &mut S,
    topic: &str,
    predicate: P,
    options: ConfirmOptions,
    expectation: &str,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: EventSource + ?Sized,
    P: MessagePredicate,
{
    if !confirm(cursor, topic, predicate, options)? {
        return Err(Box::new(AssertionError::new(
            format!("Event not found on topic '{}'", topic),
            expectation.to_string(),
            format!("no matching message within {:?}", options.deadline),
        )));
    }
    Ok(())
}

/// Assert that no event matching `predicate` shows up on `topic` in time
pub fn assert_no_event<S, P>(
    cursor: &mut S,
    topic: &str,
    predicate: P,
    options: ConfirmOptions,
    expectation: &str,
) -> Result<(), Box<dyn std::error::Error>>
where
    S: EventSource + ?Sized,
    P: MessagePredicate,
{
    let seen: HarnessResult<bool> = confirm(cursor, topic, predicate, options);
    if seen? {
        return Err(Box::new(AssertionError::new(
            format!("Unexpected event on topic '{}'", topic),
            format!("no message where {}", expectation),
            "matching message observed",
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicates::field_equals;
    use crate::stream::{MemoryLog, USER_REGISTRATIONS};
    use serde_json::json;
    use std::time::Duration;

    fn resp(status: StatusCode, body: &str) -> ApiResponse {
        ApiResponse {
            status,
            body: body.to_string(),
        }
    }

    #[test]
    fn test_status_assertions() {
        let created = resp(StatusCode::CREATED, "{}");
        assert!(assert_status(&created, StatusCode::CREATED, "signup").is_ok());
        assert!(assert_status_in(&created, &[StatusCode::OK, StatusCode::CREATED], "x").is_ok());

        let err = assert_status(&resp(StatusCode::BAD_REQUEST, "oops"), StatusCode::CREATED, "signup")
            .unwrap_err();
        assert_eq!(err.expected, "201 Created");
        assert_eq!(err.actual, "400 Bad Request");
        assert!(err.message.contains("oops"));

        let err = assert_status_in(&resp(StatusCode::NOT_FOUND, ""), &[StatusCode::OK, StatusCode::NO_CONTENT], "del")
            .unwrap_err();
        assert_eq!(err.expected, "200 or 204");
    }

    #[test]
    fn test_json_assertions() {
        let doc = json!({"user": {"login": "user_1"}, "posts": []});
        assert!(assert_json_eq(&doc, "/user/login", &json!("user_1"), "signup").is_ok());
        assert!(assert_json_eq(&doc, "/user/login", &json!("user_2"), "signup").is_err());
        assert!(assert_json_eq(&doc, "/user/email", &json!("x"), "signup").is_err());
        assert!(assert_json_array(&doc, "/posts", "list").unwrap().is_empty());
        assert!(assert_json_array(&doc, "/user", "list").is_err());
    }

    #[test]
    fn test_event_assertion_names_topic() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[USER_REGISTRATIONS]);
        let options = ConfirmOptions::new(Duration::from_millis(60), Duration::from_millis(20));

        let err = assert_event(
            &mut cursor,
            USER_REGISTRATIONS,
            field_equals("user_id", "u-9"),
            options,
            "user_id == u-9",
        )
        .unwrap_err();
        assert!(err.to_string().contains("user-registrations"));
        assert!(err.to_string().contains("user_id == u-9"));

        log.produce(USER_REGISTRATIONS, None, r#"{"user_id":"u-9"}"#);
        assert!(assert_event(
            &mut cursor,
            USER_REGISTRATIONS,
            field_equals("user_id", "u-9"),
            options,
            "user_id == u-9",
        )
        .is_ok());
        assert!(assert_no_event(
            &mut cursor,
            USER_REGISTRATIONS,
            field_equals("user_id", "u-9"),
            options,
            "user_id == u-9",
        )
        .is_ok());
    }
}
