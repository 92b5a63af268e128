//! Post event tests

use reqwest::StatusCode;

use crate::assertions::{assert_event, assert_no_event, assert_status_in};
use crate::common::{blocking, ok, step, Session, TestResult};
use crate::fixtures::{post_fixture, CommentBuilder};
use crate::http::ApiRequest;
use crate::predicates::{all_of, boxed, has_value};
use crate::stream::{EventSource, POST_COMMENTS, POST_LIKES, POST_VIEWS};

const COMMENT_TEXT: &str = "hello kafka";

/// A view is published once and never seen again after a fast-forward
pub async fn test_view_post_emits_event(session: &mut Session) -> TestResult {
    println!("=== Test: View Event ===\n");
    let (post, user) = post_fixture(session.api()).await?;
    let mut lease = session.lease_cursor()?;
    let options = lease.options();

    step(&format!("Viewing post {}", post.id));
    let resp = lease
        .api()
        .send(ApiRequest::post(format!("/posts/{}/view", post.id)).bearer(&user.token))
        .await?;
    assert_status_in(
        &resp,
        &[StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT],
        "view post",
    )?;

    let expectation = format!("post id {} present", post.id);
    blocking(|| {
        assert_event(
            &mut *lease,
            POST_VIEWS,
            has_value(post.id.as_str()),
            options,
            &expectation,
        )
    })?;
    ok("View event confirmed");

    step("Fast-forwarding and re-checking");
    blocking(|| lease.fast_forward())?;
    blocking(|| {
        assert_no_event(
            &mut *lease,
            POST_VIEWS,
            has_value(post.id.as_str()),
            options,
            &expectation,
        )
    })?;
    ok("View event not visible twice");

    println!("\n✅ View event test PASSED\n");
    Ok(())
}

pub async fn test_like_and_unlike_emits_event(session: &mut Session) -> TestResult {
    println!("=== Test: Like Event ===\n");
    let (post, user) = post_fixture(session.api()).await?;
    let mut lease = session.lease_cursor()?;
    let api = lease.api();
    let path = format!("/posts/{}/like", post.id);

    step("Liking and unliking");
    let resp = api
        .send(ApiRequest::post(path.as_str()).bearer(&user.token))
        .await?;
    assert_status_in(
        &resp,
        &[StatusCode::OK, StatusCode::CREATED, StatusCode::NO_CONTENT],
        "like",
    )?;
    let resp = api.send(ApiRequest::delete(path).bearer(&user.token)).await?;
    assert_status_in(&resp, &[StatusCode::OK, StatusCode::NO_CONTENT], "unlike")?;

    let options = lease.options();
    blocking(|| {
        assert_event(
            &mut *lease,
            POST_LIKES,
            has_value(post.id.as_str()),
            options,
            &format!("post id {} present", post.id),
        )
    })?;
    ok("Like event confirmed");

    println!("\n✅ Like event test PASSED\n");
    Ok(())
}

/// The comment event names both the comment and its text
pub async fn test_comment_emits_event(session: &mut Session) -> TestResult {
    println!("=== Test: Comment Event ===\n");
    let (post, user) = post_fixture(session.api()).await?;
    let mut lease = session.lease_cursor()?;

    step("Commenting");
    let comment = CommentBuilder::new(&user, post.id.as_str(), COMMENT_TEXT)
        .build(lease.api())
        .await?;
    ok(&format!("Comment id={}", comment.id));

    let options = lease.options();
    blocking(|| {
        assert_event(
            &mut *lease,
            POST_COMMENTS,
            all_of(vec![
                boxed(has_value(comment.id.clone())),
                boxed(has_value(COMMENT_TEXT)),
            ]),
            options,
            &format!("comment id {} with text '{}'", comment.id, COMMENT_TEXT),
        )
    })?;
    ok("Comment event confirmed");

    println!("\n✅ Comment event test PASSED\n");
    Ok(())
}
