//! Event confirmation tests
//!
//! Each test leases the session cursor (fast-forwarded to the log end),
//! triggers an action through the gateway and confirms the resulting
//! message on its topic:
//! - `user-registrations` after signup
//! - `post-views` after a view, with no duplicate visibility
//! - `post-likes` after like/unlike
//! - `post-comments` after a comment

mod posts;
mod users;

pub use posts::{
    test_comment_emits_event, test_like_and_unlike_emits_event, test_view_post_emits_event,
};
pub use users::test_user_registration_emits_event;
