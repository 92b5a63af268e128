//! Event-confirmation poller
//!
//! Confirms that an asynchronous side effect (a message on a topic) followed
//! a synchronous API call. The poller drains the cursor in small steps until
//! a caller-supplied predicate matches or an absolute deadline passes.
//!
//! Messages on other topics are consumed and dropped. A predicate error is
//! propagated, never folded into "not found".

use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{DEFAULT_EVENT_DEADLINE, DEFAULT_EVENT_STEP};
use crate::error::{HarnessError, HarnessResult};
use crate::predicates::MessagePredicate;
use crate::stream::{EventMessage, EventSource};

/// Deadline and step for one confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmOptions {
    /// Total time allowed, measured from the start of `confirm`
    pub deadline: Duration,
    /// Longest single wait on the cursor
    pub step: Duration,
}

impl Default for ConfirmOptions {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_EVENT_DEADLINE,
            step: DEFAULT_EVENT_STEP,
        }
    }
}

impl ConfirmOptions {
    pub fn new(deadline: Duration, step: Duration) -> Self {
        Self { deadline, step }
    }
}

/// Poller state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollState {
    /// Deadline not reached, no match yet
    Waiting,
    /// A message on the target topic satisfied the predicate
    Matched(EventMessage),
    /// Deadline reached without a match
    Exhausted,
}

impl PollState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PollState::Waiting)
    }
}

/// One confirmation in progress
pub struct EventPoller<'c, S: EventSource + ?Sized> {
    cursor: &'c mut S,
    topic: String,
    deadline: Instant,
    step: Duration,
    state: PollState,
    polls: u32,
    drained: usize,
    inspected: usize,
}

impl<'c, S: EventSource + ?Sized> EventPoller<'c, S> {
    /// Start a confirmation; the deadline is fixed now
    pub fn new(cursor: &'c mut S, topic: impl Into<String>, options: ConfirmOptions) -> Self {
        Self {
            cursor,
            topic: topic.into(),
            deadline: Instant::now() + options.deadline,
            step: options.step,
            state: PollState::Waiting,
            polls: 0,
            drained: 0,
            inspected: 0,
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    /// Number of cursor polls made
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Messages seen on any topic
    pub fn drained(&self) -> usize {
        self.drained
    }

    /// Messages handed to the predicate
    pub fn inspected(&self) -> usize {
        self.inspected
    }

    /// Advance by one cursor poll
    ///
    /// Terminal states are sticky. The poll waits `min(step, remaining)`, so
    /// the deadline is never overshot by more than one step.
    pub fn poll_once<P>(&mut self, predicate: &P) -> HarnessResult<&PollState>
    where
        P: MessagePredicate + ?Sized,
    {
        if self.state.is_terminal() {
            return Ok(&self.state);
        }

        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            self.state = PollState::Exhausted;
            return Ok(&self.state);
        }

        let batch = self.cursor.poll(self.step.min(remaining))?;
        self.polls += 1;

        for (tp, messages) in batch {
            self.drained += messages.len();
            if tp.topic != self.topic {
                continue;
            }
            for msg in messages {
                self.inspected += 1;
                let matched = predicate.matches(&msg).map_err(|e| HarnessError::Predicate {
                    topic: msg.topic.clone(),
                    offset: msg.offset,
                    reason: e.to_string(),
                })?;
                if matched {
                    self.state = PollState::Matched(msg);
                    return Ok(&self.state);
                }
            }
        }

        if Instant::now() >= self.deadline {
            self.state = PollState::Exhausted;
        }
        Ok(&self.state)
    }

    /// Poll until a terminal state is reached
    pub fn run<P>(mut self, predicate: &P) -> HarnessResult<PollState>
    where
        P: MessagePredicate + ?Sized,
    {
        while !self.poll_once(predicate)?.is_terminal() {}
        debug!(
            topic = %self.topic,
            polls = self.polls,
            drained = self.drained,
            inspected = self.inspected,
            matched = matches!(self.state, PollState::Matched(_)),
            "confirmation finished"
        );
        Ok(self.state)
    }
}

/// Wait for a message on `topic` satisfying `predicate`
///
/// Returns `Ok(true)` on the first match, `Ok(false)` once the deadline has
/// passed. Absence is evidence, not an error; the caller decides whether it
/// fails the test.
pub fn confirm<S, P>(
    cursor: &mut S,
    topic: &str,
    predicate: P,
    options: ConfirmOptions,
) -> HarnessResult<bool>
where
    S: EventSource + ?Sized,
    P: MessagePredicate,
{
    let state = EventPoller::new(cursor, topic, options).run(&predicate)?;
    if let PollState::Matched(msg) = &state {
        info!(topic, offset = msg.offset, "event confirmed");
    } else {
        info!(topic, deadline = ?options.deadline, "event not observed");
    }
    Ok(matches!(state, PollState::Matched(_)))
}

/// Like [`confirm`], but returns the matching message
pub fn find_event<S, P>(
    cursor: &mut S,
    topic: &str,
    predicate: P,
    options: ConfirmOptions,
) -> HarnessResult<Option<EventMessage>>
where
    S: EventSource + ?Sized,
    P: MessagePredicate,
{
    match EventPoller::new(cursor, topic, options).run(&predicate)? {
        PollState::Matched(msg) => Ok(Some(msg)),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PredicateError;
    use crate::predicates::{field_equals, value_contains};
    use crate::stream::{MemoryLog, POST_LIKES, POST_VIEWS, USER_REGISTRATIONS};
    use std::thread;

    fn never_matches(_: &EventMessage) -> Result<bool, PredicateError> {
        Ok(false)
    }

    fn fast() -> ConfirmOptions {
        ConfirmOptions::new(Duration::from_millis(300), Duration::from_millis(50))
    }

    #[test]
    fn test_matches_message_produced_after_fast_forward() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[USER_REGISTRATIONS]);
        cursor.fast_forward().unwrap();
        log.produce(USER_REGISTRATIONS, Some("u-1"), r#"{"user_id":"u-1"}"#);

        let start = Instant::now();
        let found = confirm(&mut cursor, USER_REGISTRATIONS, field_equals("user_id", "u-1"), fast()).unwrap();
        assert!(found);
        assert!(start.elapsed() < Duration::from_millis(100));
    }

    #[test]
    fn test_stale_message_invisible_after_fast_forward() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        log.produce(POST_VIEWS, None, r#"{"post_id":"p-1"}"#);
        cursor.fast_forward().unwrap();

        let found = confirm(&mut cursor, POST_VIEWS, field_equals("post_id", "p-1"), fast()).unwrap();
        assert!(!found);
    }

    #[test]
    fn test_no_duplicate_visibility() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        log.produce(POST_VIEWS, None, r#"{"post_id":"p-2"}"#);
        assert!(confirm(&mut cursor, POST_VIEWS, field_equals("post_id", "p-2"), fast()).unwrap());

        cursor.fast_forward().unwrap();
        assert!(!confirm(&mut cursor, POST_VIEWS, field_equals("post_id", "p-2"), fast()).unwrap());
    }

    #[test]
    fn test_returns_within_deadline_plus_step() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        let options = fast();

        let start = Instant::now();
        let found = confirm(&mut cursor, POST_VIEWS, never_matches, options).unwrap();
        let elapsed = start.elapsed();

        assert!(!found);
        assert!(elapsed >= options.deadline);
        // Scheduler slack on top of the single-step bound
        assert!(
            elapsed < options.deadline + options.step + Duration::from_millis(150),
            "confirm took {:?}",
            elapsed
        );
    }

    #[test]
    fn test_late_message_within_deadline() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_LIKES]);
        let producer = log.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(120));
            producer.produce(POST_LIKES, None, r#"{"post_id":"p-3"}"#);
        });

        let found = confirm(&mut cursor, POST_LIKES, field_equals("post_id", "p-3"), fast()).unwrap();
        handle.join().unwrap();
        assert!(found);
    }

    #[test]
    fn test_other_topics_drained_not_inspected() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS, POST_LIKES]);
        log.produce(POST_LIKES, None, r#"{"post_id":"p-4"}"#);

        let mut poller = EventPoller::new(&mut cursor, POST_VIEWS, fast());
        let state = poller.poll_once(&value_contains("p-4")).unwrap().clone();
        assert_eq!(state, PollState::Waiting);
        assert_eq!(poller.drained(), 1);
        assert_eq!(poller.inspected(), 0);

        // The like was consumed and is not replayed for a later confirmation
        assert!(!confirm(&mut cursor, POST_LIKES, value_contains("p-4"), fast()).unwrap());
    }

    #[test]
    fn test_early_exit_on_first_match() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        for i in 0..5 {
            log.produce(POST_VIEWS, None, format!(r#"{{"post_id":"p-{}"}}"#, i));
        }

        let found = find_event(&mut cursor, POST_VIEWS, field_equals("post_id", "p-1"), fast())
            .unwrap()
            .expect("event");
        assert_eq!(found.offset, 1);
    }

    #[test]
    fn test_predicate_error_propagates() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        log.produce(POST_VIEWS, None, "not json at all");

        let err = confirm(&mut cursor, POST_VIEWS, field_equals("post_id", "x"), fast()).unwrap_err();
        match err {
            HarnessError::Predicate { topic, offset, .. } => {
                assert_eq!(topic, POST_VIEWS);
                assert_eq!(offset, 0);
            }
            other => panic!("expected predicate error, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_predicate_error_not_masked() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        log.produce(POST_VIEWS, None, "{}");

        let failing = |_: &EventMessage| -> Result<bool, PredicateError> {
            Err(PredicateError::new("index out of range"))
        };
        assert!(confirm(&mut cursor, POST_VIEWS, failing, fast()).is_err());
    }

    #[test]
    fn test_terminal_state_is_sticky() {
        let log = MemoryLog::new();
        let mut cursor = log.cursor(&[POST_VIEWS]);
        let options = ConfirmOptions::new(Duration::from_millis(20), Duration::from_millis(10));
        let never = never_matches;

        let mut poller = EventPoller::new(&mut cursor, POST_VIEWS, options);
        while !poller.poll_once(&never).unwrap().is_terminal() {}
        let polls = poller.polls();
        assert_eq!(poller.poll_once(&never).unwrap(), &PollState::Exhausted);
        assert_eq!(poller.polls(), polls);
    }
}
