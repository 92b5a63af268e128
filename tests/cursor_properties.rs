// Property-based tests for the cursor and confirmation contract
//
// These run the public poller API against the in-memory log and check that
// a confirmation only ever sees messages produced after a fast-forward.

#[cfg(test)]
mod cursor_properties {
    use proptest::prelude::*;
    use social_e2e::predicates::field_equals;
    use social_e2e::stream::{POST_LIKES, POST_VIEWS};
    use social_e2e::{confirm, find_event, ConfirmOptions, EventSource, MemoryLog};
    use std::time::Duration;

    fn short() -> ConfirmOptions {
        ConfirmOptions::new(Duration::from_millis(40), Duration::from_millis(10))
    }

    fn view(id: &str) -> String {
        serde_json::json!({ "post_id": id }).to_string()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(24))]

        #[test]
        fn test_backlog_never_visible(backlog in prop::collection::vec("[a-z0-9]{1,6}", 0..8), fresh in "[A-Z]{3}") {
            // Property: only the message produced after fast_forward can match
            let log = MemoryLog::new();
            let mut cursor = log.cursor(&[POST_VIEWS]);
            for id in &backlog {
                log.produce(POST_VIEWS, None, view(id));
            }
            cursor.fast_forward().unwrap();
            log.produce(POST_VIEWS, None, view(&fresh));

            for id in &backlog {
                prop_assert!(!confirm(&mut cursor, POST_VIEWS, field_equals("post_id", id.as_str()), short()).unwrap());
            }

            cursor.fast_forward().unwrap();
            log.produce(POST_VIEWS, None, view(&fresh));
            let found = find_event(&mut cursor, POST_VIEWS, field_equals("post_id", fresh.as_str()), short()).unwrap();
            prop_assert_eq!(found.map(|m| m.offset), Some(backlog.len() as i64 + 1));
        }

        #[test]
        fn test_other_topic_never_matches(ids in prop::collection::vec("[a-z0-9]{4}", 1..6)) {
            // Property: a message on another bound topic never satisfies the target
            let log = MemoryLog::new();
            let mut cursor = log.cursor(&[POST_VIEWS, POST_LIKES]);
            for id in &ids {
                log.produce(POST_LIKES, None, view(id));
            }
            for id in &ids {
                prop_assert!(!confirm(&mut cursor, POST_VIEWS, field_equals("post_id", id.as_str()), short()).unwrap());
            }
        }
    }
}
