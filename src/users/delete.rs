//! Account deletion test

use reqwest::StatusCode;

use crate::assertions::{assert_status, assert_status_in, AssertionError};
use crate::common::{ok, step, Session, TestResult};
use crate::fixtures::logged_in_user;
use crate::http::ApiRequest;

/// A deleted account is gone for every other caller
///
/// Two users are created; the first deletes itself and the second then gets
/// `404 Not Found` for the first one's profile.
pub async fn test_delete_user(session: &mut Session) -> TestResult {
    println!("=== Test: Delete User ===\n");
    let api = session.api();
    let doomed = logged_in_user(api).await?;
    let witness = logged_in_user(api).await?;
    if doomed.id() == witness.id() {
        return Err(Box::new(AssertionError::new(
            "fixtures: two registrations share an id",
            "distinct ids",
            doomed.id(),
        )));
    }
    let path = format!("/user/{}", doomed.login());

    step(&format!("Deleting '{}'", doomed.login()));
    let resp = api
        .send(ApiRequest::delete(path.as_str()).bearer(&doomed.token))
        .await?;
    assert_status_in(&resp, &[StatusCode::OK, StatusCode::NO_CONTENT], "delete user")?;
    ok("Account deleted");

    step("Fetching the deleted profile as another user");
    let resp = api.send(ApiRequest::get(path).bearer(&witness.token)).await?;
    assert_status(&resp, StatusCode::NOT_FOUND, "get deleted profile")?;
    ok("Profile not found");

    println!("\n✅ Delete user test PASSED\n");
    Ok(())
}
