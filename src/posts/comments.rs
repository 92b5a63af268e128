//! Threaded comment tests

use reqwest::StatusCode;
use std::collections::BTreeSet;

use crate::assertions::{assert_json_array, assert_status, AssertionError};
use crate::common::{ok, step, Session, TestResult};
use crate::fixtures::{post_fixture, CommentBuilder};
use crate::http::ApiRequest;

const REPLY_TEXTS: [&str; 2] = ["r1", "r2"];

/// Replies to a comment are listed under it, each naming its parent
pub async fn test_replies_listing(session: &mut Session) -> TestResult {
    println!("=== Test: Replies Listing ===\n");
    let api = session.api();
    let (post, user) = post_fixture(api).await?;

    step("Adding parent comment");
    let parent = CommentBuilder::new(&user, post.id.as_str(), "parent")
        .build(api)
        .await?;
    ok(&format!("Parent comment id={}", parent.id));

    for text in REPLY_TEXTS {
        step(&format!("Replying '{}'", text));
        let reply = CommentBuilder::new(&user, post.id.as_str(), text)
            .reply_to(parent.id.as_str())
            .build(api)
            .await?;
        if reply.parent_comment_id.as_deref() != Some(parent.id.as_str()) {
            return Err(Box::new(AssertionError::new(
                "reply: wrong parent",
                parent.id.clone(),
                format!("{:?}", reply.parent_comment_id),
            )));
        }
    }
    ok("Replies created");

    step("Listing replies");
    let resp = api
        .send(
            ApiRequest::get(format!("/posts/{}/comments/{}/replies", post.id, parent.id))
                .bearer(&user.token),
        )
        .await?;
    assert_status(&resp, StatusCode::OK, "list replies")?;
    let body = resp.json_value()?;
    let comments = assert_json_array(&body, "/comments", "list replies")?;

    let texts: BTreeSet<&str> = comments
        .iter()
        .filter_map(|c| c.get("text").and_then(|t| t.as_str()))
        .collect();
    let expected: BTreeSet<&str> = REPLY_TEXTS.into_iter().collect();
    if comments.len() != REPLY_TEXTS.len() || texts != expected {
        return Err(Box::new(AssertionError::new(
            "list replies: unexpected replies",
            format!("{:?}", expected),
            format!("{:?}", texts),
        )));
    }
    for comment in comments {
        let parent_id = comment
            .get("parent_comment_id")
            .map(|v| v.as_str().map_or_else(|| v.to_string(), str::to_string));
        if parent_id.as_deref() != Some(parent.id.as_str()) {
            return Err(Box::new(AssertionError::new(
                "list replies: reply without parent id",
                parent.id.clone(),
                comment.to_string(),
            )));
        }
    }
    ok("Exactly the two replies listed, each under the parent");

    println!("\n✅ Replies listing test PASSED\n");
    Ok(())
}
