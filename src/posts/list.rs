//! Post listing tests

use reqwest::StatusCode;

use crate::assertions::{assert_json_array, assert_status};
use crate::common::{ok, step, Session, TestResult};
use crate::fixtures::{logged_in_user, post_fixture, PostBuilder};
use crate::http::{ApiRequest, ApiResponse};

fn page(request: ApiRequest, page_size: u32) -> ApiRequest {
    request.param("page", 1).param("page_size", page_size)
}

fn expect_posts(resp: &ApiResponse, context: &str) -> TestResult {
    assert_status(resp, StatusCode::OK, context)?;
    let body = resp.json_value()?;
    let posts = assert_json_array(&body, "/posts", context)?;
    ok(&format!("{} posts returned", posts.len()));
    Ok(())
}

pub async fn test_list_my_posts(session: &mut Session) -> TestResult {
    println!("=== Test: List My Posts ===\n");
    let api = session.api();
    let user = logged_in_user(api).await?;

    step("Creating 3 posts");
    for i in 0..3 {
        PostBuilder::new(&user)
            .title(format!("Пост {}", i))
            .description(format!("Описание поста {}", i))
            .tags(["list", "my"])
            .build(api)
            .await?;
    }
    ok("Posts created");

    step("Listing own posts");
    let resp = api
        .send(page(ApiRequest::get("/posts/list/my"), 3).bearer(&user.token))
        .await?;
    expect_posts(&resp, "list my posts")?;

    println!("\n✅ List my posts test PASSED\n");
    Ok(())
}

pub async fn test_list_all_public_posts(session: &mut Session) -> TestResult {
    println!("=== Test: List Public Posts ===\n");
    let api = session.api();
    let user = logged_in_user(api).await?;

    step("Listing public posts");
    let resp = api
        .send(page(ApiRequest::get("/posts/list/public"), 15).bearer(&user.token))
        .await?;
    expect_posts(&resp, "list public posts")?;

    println!("\n✅ List public posts test PASSED\n");
    Ok(())
}

/// Another user can list the public posts of an author by id
pub async fn test_list_public_posts_by_user(session: &mut Session) -> TestResult {
    println!("=== Test: List Public Posts By User ===\n");
    let api = session.api();
    let (_post, author) = post_fixture(api).await?;
    let reader = logged_in_user(api).await?;

    step(&format!("Listing public posts of user {}", author.id()));
    let resp = api
        .send(
            page(ApiRequest::get(format!("/posts/list/public/{}", author.id())), 4)
                .bearer(&reader.token),
        )
        .await?;
    expect_posts(&resp, "list public posts by user")?;

    println!("\n✅ List public posts by user test PASSED\n");
    Ok(())
}
