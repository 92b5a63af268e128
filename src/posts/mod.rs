//! Post API tests
//!
//! Tests for posts and comments through the gateway:
//! - Create, read, update and delete
//! - Own, public and per-user listings
//! - Threaded replies

mod comments;
mod crud;
mod list;

pub use comments::test_replies_listing;
pub use crud::{test_create_post, test_delete_post, test_get_post_by_id, test_update_post};
pub use list::{test_list_all_public_posts, test_list_my_posts, test_list_public_posts_by_user};
