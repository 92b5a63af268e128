//! Signup, login and logout tests

use reqwest::StatusCode;
use serde_json::json;

use crate::assertions::{assert_json_eq, assert_status, assert_status_in, AssertionError};
use crate::common::{ok, step, Session, TestResult};
use crate::fixtures::{login_request, logged_in_user, new_identity, signup_request};
use crate::http::ApiRequest;

/// Register a fresh identity, then log in with it
///
/// The signup response must echo the login, and the login response must
/// carry a non-empty token.
pub async fn test_signup_and_login(session: &mut Session) -> TestResult {
    println!("=== Test: Signup and Login ===\n");
    let api = session.api();
    let identity = new_identity();

    step(&format!("Registering '{}'", identity.login));
    let resp = api.send(signup_request(&identity)?).await?;
    assert_status(&resp, StatusCode::CREATED, "signup")?;
    let body = resp.json_value()?;
    assert_json_eq(&body, "/user/login", &json!(identity.login), "signup")?;
    ok("User registered");

    step("Logging in");
    let resp = api.send(login_request(&identity)).await?;
    assert_status(&resp, StatusCode::OK, "login")?;
    let body = resp.json_value()?;
    match body.get("token").and_then(|t| t.as_str()) {
        Some(t) if !t.is_empty() => ok("Token issued"),
        other => {
            return Err(Box::new(AssertionError::new(
                "login: token missing",
                "non-empty token",
                format!("{:?}", other),
            )))
        }
    }

    println!("\n✅ Signup and login test PASSED\n");
    Ok(())
}

/// Registering the same identity twice is rejected with 400
pub async fn test_duplicate_signup(session: &mut Session) -> TestResult {
    println!("=== Test: Duplicate Signup ===\n");
    let api = session.api();
    let identity = new_identity();

    step("First registration");
    let resp = api.send(signup_request(&identity)?).await?;
    assert_status(&resp, StatusCode::CREATED, "first signup")?;
    ok("Accepted");

    step("Second registration with the same identity");
    let resp = api.send(signup_request(&identity)?).await?;
    assert_status(&resp, StatusCode::BAD_REQUEST, "duplicate signup")?;
    ok("Rejected");

    println!("\n✅ Duplicate signup test PASSED\n");
    Ok(())
}

/// Logout with a valid token succeeds
pub async fn test_logout(session: &mut Session) -> TestResult {
    println!("=== Test: Logout ===\n");
    let api = session.api();
    let user = logged_in_user(api).await?;

    step("Logging out");
    let resp = api
        .send(ApiRequest::get("/user/logout").bearer(&user.token))
        .await?;
    assert_status_in(&resp, &[StatusCode::OK, StatusCode::NO_CONTENT], "logout")?;
    ok("Logged out");

    println!("\n✅ Logout test PASSED\n");
    Ok(())
}
