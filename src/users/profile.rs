//! Profile read and update tests

use reqwest::StatusCode;
use serde_json::json;

use crate::assertions::{assert_json_eq, assert_status, assert_status_in};
use crate::common::{ok, step, Session, TestResult};
use crate::fixtures::{logged_in_user, new_identity, register};
use crate::http::ApiRequest;

fn profile_path(login: &str) -> String {
    format!("/user/{}", login)
}

/// The owner of a token sees the full profile, email included
pub async fn test_get_user_profile(session: &mut Session) -> TestResult {
    println!("=== Test: Get User Profile ===\n");
    let api = session.api();
    let user = logged_in_user(api).await?;

    step("Fetching own profile");
    let resp = api
        .send(ApiRequest::get(profile_path(user.login())).bearer(&user.token))
        .await?;
    assert_status(&resp, StatusCode::OK, "get profile")?;
    assert_json_eq(
        &resp.json_value()?,
        "/email",
        &json!(user.user.identity.email),
        "get profile",
    )?;
    ok("Email matches");

    println!("\n✅ Get profile test PASSED\n");
    Ok(())
}

/// A garbage bearer token is refused
pub async fn test_get_profile_with_invalid_token(session: &mut Session) -> TestResult {
    println!("=== Test: Profile With Invalid Token ===\n");
    let api = session.api();
    let user = register(api, new_identity()).await?;

    step("Fetching profile with an invalid token");
    let resp = api
        .send(ApiRequest::get(profile_path(&user.identity.login)).bearer("invalidtoken"))
        .await?;
    assert_status_in(
        &resp,
        &[StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN],
        "invalid token",
    )?;
    ok("Access refused");

    println!("\n✅ Invalid token test PASSED\n");
    Ok(())
}

/// Updating the profile is visible on the next read
pub async fn test_update_user_profile(session: &mut Session) -> TestResult {
    println!("=== Test: Update User Profile ===\n");
    let api = session.api();
    let user = logged_in_user(api).await?;
    let identity = &user.user.identity;
    let path = profile_path(user.login());

    let new_email = format!("updated_{}", identity.email);
    let update = json!({
        "email": new_email,
        "firstname": identity.firstname,
        "surname": identity.surname,
        "phone": "+1234567890",
        "bio": "Updated biography text",
    });

    step("Updating profile");
    let resp = api
        .send(ApiRequest::put(path.as_str()).bearer(&user.token).json(&update)?)
        .await?;
    assert_status_in(&resp, &[StatusCode::OK, StatusCode::NO_CONTENT], "update profile")?;
    ok("Profile updated");

    step("Re-reading profile");
    let resp = api.send(ApiRequest::get(path).bearer(&user.token)).await?;
    assert_status(&resp, StatusCode::OK, "get updated profile")?;
    assert_json_eq(&resp.json_value()?, "/email", &json!(new_email), "get updated profile")?;
    ok("New email visible");

    println!("\n✅ Update profile test PASSED\n");
    Ok(())
}
