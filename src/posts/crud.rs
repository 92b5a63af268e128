//! Post create/read/update/delete tests

use reqwest::StatusCode;
use serde_json::json;

use crate::assertions::{assert_json_eq, assert_status, assert_status_in, AssertionError};
use crate::common::{ok, step, Session, TestResult};
use crate::fixtures::{logged_in_user, PostBuilder, PostFixture, UserSession};
use crate::error::HarnessResult;
use crate::http::{ApiClient, ApiRequest};

const FIRST_POST_TITLE: &str = "Мой первый пост";

/// The post every CRUD test starts from
async fn first_post(api: &ApiClient) -> HarnessResult<(PostFixture, UserSession)> {
    let user = logged_in_user(api).await?;
    let post = PostBuilder::new(&user)
        .title(FIRST_POST_TITLE)
        .description("Это содержимое поста, созданного для тестирования.")
        .tags(["тест", "golang", "api"])
        .build(api)
        .await?;
    Ok((post, user))
}

pub async fn test_create_post(session: &mut Session) -> TestResult {
    println!("=== Test: Create Post ===\n");
    step("Creating post");
    let (post, _user) = first_post(session.api()).await?;
    assert_json_eq(&post.body, "/title", &json!(FIRST_POST_TITLE), "create post")?;
    ok(&format!("Post created with id={}", post.id));

    println!("\n✅ Create post test PASSED\n");
    Ok(())
}

pub async fn test_get_post_by_id(session: &mut Session) -> TestResult {
    println!("=== Test: Get Post By Id ===\n");
    let api = session.api();
    let (post, user) = first_post(api).await?;

    step(&format!("Fetching post {}", post.id));
    let resp = api
        .send(ApiRequest::get(format!("/posts/{}", post.id)).bearer(&user.token))
        .await?;
    assert_status(&resp, StatusCode::OK, "get post")?;
    let id = resp.str_at("/id")?;
    if id != post.id {
        return Err(Box::new(AssertionError::new("get post: id mismatch", post.id, id)));
    }
    ok("Id matches");

    println!("\n✅ Get post test PASSED\n");
    Ok(())
}

/// Turning a post private keeps it editable by its owner
pub async fn test_update_post(session: &mut Session) -> TestResult {
    println!("=== Test: Update Post ===\n");
    let api = session.api();
    let (post, user) = first_post(api).await?;

    let update = json!({
        "title": "Обновленный заголовок поста",
        "description": "Это обновленное описание. Пост теперь приватный!",
        "is_private": true,
        "tags": ["тест", "обновление", "приватность"],
    });

    step("Updating post");
    let resp = api
        .send(
            ApiRequest::put(format!("/posts/{}", post.id))
                .bearer(&user.token)
                .json(&update)?,
        )
        .await?;
    assert_status(&resp, StatusCode::OK, "update post")?;
    assert_json_eq(&resp.json_value()?, "/title", &update["title"], "update post")?;
    ok("Title updated");

    println!("\n✅ Update post test PASSED\n");
    Ok(())
}

pub async fn test_delete_post(session: &mut Session) -> TestResult {
    println!("=== Test: Delete Post ===\n");
    let api = session.api();
    let (post, user) = first_post(api).await?;
    let path = format!("/posts/{}", post.id);

    step("Deleting post");
    let resp = api
        .send(ApiRequest::delete(path.as_str()).bearer(&user.token))
        .await?;
    assert_status_in(&resp, &[StatusCode::OK, StatusCode::NO_CONTENT], "delete post")?;
    ok("Post deleted");

    step("Fetching deleted post");
    let resp = api.send(ApiRequest::get(path).bearer(&user.token)).await?;
    assert_status(&resp, StatusCode::NOT_FOUND, "get deleted post")?;
    ok("Post not found");

    println!("\n✅ Delete post test PASSED\n");
    Ok(())
}
