//! User API tests
//!
//! Tests for the user surface of the gateway:
//! - Signup, login and logout
//! - Duplicate signup rejection
//! - Profile read, update and invalid-token access
//! - Account deletion

mod auth;
mod delete;
mod profile;

pub use auth::{test_duplicate_signup, test_logout, test_signup_and_login};
pub use delete::test_delete_user;
pub use profile::{
    test_get_profile_with_invalid_token, test_get_user_profile, test_update_user_profile,
};
