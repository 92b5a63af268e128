//! social_e2e: end-to-end harness for the social network gateway
//!
//! Drives the API gateway over HTTP and confirms the events the services
//! publish to Kafka:
//! - Readiness gate on `GET /ping` before any test runs
//! - Fresh fixtures per test (user → token → post → comment)
//! - A session-owned cursor bound to partition 0 of each topic, leased to one
//!   test at a time and fast-forwarded on every lease
//! - Deadline-bounded confirmation of events with structured predicates
//!
//! ## Test Categories
//!
//! - **gateway**: Health endpoint (1 test)
//! - **users**: Signup, login, logout, profile, deletion (7 tests)
//! - **posts**: CRUD, listings, replies (8 tests)
//! - **events**: Registration, view, like and comment events (4 tests)
//!
//! ## Usage
//!
//! ```bash
//! # Run all tests
//! cargo run --release
//!
//! # Run specific category
//! cargo run --release -- --category posts
//!
//! # Run single test
//! cargo run --release -- --test test_delete_user
//!
//! # JSON output for CI
//! cargo run --release -- --json
//! ```

// Infrastructure modules
pub mod assertions;
pub mod common;
pub mod config;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod poller;
pub mod predicates;
pub mod readiness;
pub mod session;
pub mod stream;

// Test modules
pub mod events;
pub mod gateway;
pub mod posts;
pub mod users;

// Re-export infrastructure
pub use assertions::*;
pub use common::TestResult;
pub use config::HarnessConfig;
pub use error::{HarnessError, HarnessResult, PredicateError};
pub use fixtures::*;
pub use poller::{confirm, find_event, ConfirmOptions, EventPoller, PollState};
pub use session::{CursorLease, TestSession};
pub use stream::{EventMessage, EventSource, KafkaCursor, MemoryCursor, MemoryLog};

// Re-export test functions for convenience
pub use events::{
    test_comment_emits_event, test_like_and_unlike_emits_event,
    test_user_registration_emits_event, test_view_post_emits_event,
};
pub use gateway::test_ping;
pub use posts::{
    test_create_post, test_delete_post, test_get_post_by_id, test_list_all_public_posts,
    test_list_my_posts, test_list_public_posts_by_user, test_replies_listing, test_update_post,
};
pub use users::{
    test_delete_user, test_duplicate_signup, test_get_profile_with_invalid_token,
    test_get_user_profile, test_logout, test_signup_and_login, test_update_user_profile,
};
