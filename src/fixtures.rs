//! Test fixtures and data builders
//!
//! Every fixture is created through the gateway itself and is fresh per
//! test: user → login → post → comment, each step building on the previous.
//! Nothing is cached across tests; unique suffixes keep concurrent runs
//! apart.

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use crate::error::{HarnessError, HarnessResult};
use crate::http::{ApiClient, ApiRequest, ApiResponse};

/// Password accepted by the gateway's password validator
pub const TEST_PASSWORD: &str = "TestPass123";

/// Length of the random suffix appended to identity fields
pub const SUFFIX_LEN: usize = 8;

const SUFFIX_ALPHABET: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase alphanumeric suffix for fixture names
///
/// Base 36 over a v4 UUID gives ~41 random bits in eight characters, enough
/// to keep tens of thousands of identities per run collision-free.
pub fn unique_suffix() -> String {
    let mut bits = Uuid::new_v4().as_u128();
    let mut suffix = String::with_capacity(SUFFIX_LEN);
    for _ in 0..SUFFIX_LEN {
        suffix.push(SUFFIX_ALPHABET[(bits % 36) as usize] as char);
        bits /= 36;
    }
    suffix
}

/// A user that has not been registered yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub login: String,
    pub firstname: String,
    pub surname: String,
    pub email: String,
    pub password: String,
}

impl UserIdentity {
    /// Fresh identity with a random suffix on every name field
    pub fn generate() -> Self {
        Self::with_suffix(&unique_suffix())
    }

    pub fn with_suffix(suffix: &str) -> Self {
        Self {
            login: format!("user_{}", suffix),
            firstname: format!("First_{}", suffix),
            surname: format!("Last_{}", suffix),
            email: format!("user_{}@example.com", suffix),
            password: TEST_PASSWORD.to_string(),
        }
    }
}

/// Generate a fresh [`UserIdentity`]
pub fn new_identity() -> UserIdentity {
    UserIdentity::generate()
}

/// A user the gateway accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredUser {
    pub identity: UserIdentity,
    /// Identifier assigned by the user service
    pub id: String,
}

/// A logged-in user and its bearer token
#[derive(Debug, Clone)]
pub struct UserSession {
    pub user: RegisteredUser,
    pub token: String,
}

impl UserSession {
    pub fn login(&self) -> &str {
        &self.user.identity.login
    }

    pub fn id(&self) -> &str {
        &self.user.id
    }
}

/// Fail a setup step unless the response has `expected` status
fn expect_status(
    action: &'static str,
    resp: &ApiResponse,
    expected: StatusCode,
) -> HarnessResult<()> {
    if resp.status != expected {
        return Err(HarnessError::Setup {
            action,
            status: resp.status,
            body: resp.body.clone(),
        });
    }
    Ok(())
}

/// Signup request for `identity`, without status checks
pub fn signup_request(identity: &UserIdentity) -> HarnessResult<ApiRequest> {
    ApiRequest::post("/user").json(identity)
}

/// Register `identity`; anything but `201 Created` fails the setup
pub async fn register(api: &ApiClient, identity: UserIdentity) -> HarnessResult<RegisteredUser> {
    let resp = api.send(signup_request(&identity)?).await?;
    expect_status("register", &resp, StatusCode::CREATED)?;
    let id = resp.str_at("/user/id")?;
    debug!(login = %identity.login, id = %id, "user registered");
    Ok(RegisteredUser { identity, id })
}

/// Login request for `identity`, without status checks
pub fn login_request(identity: &UserIdentity) -> ApiRequest {
    ApiRequest::get("/user/login")
        .param("login", &identity.login)
        .param("password", &identity.password)
}

/// Exchange credentials for a bearer token
pub async fn login(api: &ApiClient, user: RegisteredUser) -> HarnessResult<UserSession> {
    let resp = api.send(login_request(&user.identity)).await?;
    expect_status("login", &resp, StatusCode::OK)?;
    let token = resp.str_at("/token")?;
    if token.is_empty() {
        return Err(HarnessError::missing("login response", "token"));
    }
    Ok(UserSession { user, token })
}

/// Register a fresh identity and log it in
pub async fn logged_in_user(api: &ApiClient) -> HarnessResult<UserSession> {
    let user = register(api, new_identity()).await?;
    login(api, user).await
}

/// A post created through the gateway
#[derive(Debug, Clone)]
pub struct PostFixture {
    pub id: String,
    pub title: String,
    pub is_private: bool,
    /// Raw creation response
    pub body: serde_json::Value,
}

/// Builder for test posts
pub struct PostBuilder<'a> {
    session: &'a UserSession,
    title: String,
    description: String,
    is_private: bool,
    tags: Vec<String>,
}

impl<'a> PostBuilder<'a> {
    pub fn new(session: &'a UserSession) -> Self {
        Self {
            session,
            title: "t".to_string(),
            description: "d".to_string(),
            is_private: false,
            tags: Vec::new(),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn private(mut self, is_private: bool) -> Self {
        self.is_private = is_private;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Request payload for this post
    pub fn payload(&self) -> serde_json::Value {
        json!({
            "title": self.title,
            "description": self.description,
            "is_private": self.is_private,
            "tags": self.tags,
        })
    }

    pub async fn build(self, api: &ApiClient) -> HarnessResult<PostFixture> {
        let request = ApiRequest::post("/posts")
            .bearer(&self.session.token)
            .json(&self.payload())?;
        let resp = api.send(request).await?;
        expect_status("create post", &resp, StatusCode::CREATED)?;

        let id = resp.str_at("/id")?;
        Ok(PostFixture {
            id,
            title: self.title,
            is_private: self.is_private,
            body: resp.json_value()?,
        })
    }
}

/// Log in a fresh user and create one public post for it
pub async fn post_fixture(api: &ApiClient) -> HarnessResult<(PostFixture, UserSession)> {
    let session = logged_in_user(api).await?;
    let post = PostBuilder::new(&session).build(api).await?;
    Ok((post, session))
}

/// A comment created through the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentFixture {
    pub id: String,
    pub post_id: String,
    pub parent_comment_id: Option<String>,
    pub text: String,
}

/// Builder for comments and replies
pub struct CommentBuilder<'a> {
    session: &'a UserSession,
    post_id: String,
    text: String,
    parent_comment_id: Option<String>,
}

impl<'a> CommentBuilder<'a> {
    pub fn new(session: &'a UserSession, post_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            session,
            post_id: post_id.into(),
            text: text.into(),
            parent_comment_id: None,
        }
    }

    /// Make this comment a reply
    pub fn reply_to(mut self, parent_comment_id: impl Into<String>) -> Self {
        self.parent_comment_id = Some(parent_comment_id.into());
        self
    }

    pub fn payload(&self) -> serde_json::Value {
        match &self.parent_comment_id {
            Some(parent) => json!({ "parent_comment_id": parent, "text": self.text }),
            None => json!({ "text": self.text }),
        }
    }

    pub async fn build(self, api: &ApiClient) -> HarnessResult<CommentFixture> {
        let request = ApiRequest::post(format!("/posts/{}/comments", self.post_id))
            .bearer(&self.session.token)
            .json(&self.payload())?;
        let resp = api.send(request).await?;
        expect_status("create comment", &resp, StatusCode::CREATED)?;

        let id = resp.str_at("/comment/id")?;
        let parent_comment_id = match &self.parent_comment_id {
            Some(_) => Some(resp.str_at("/comment/parent_comment_id")?),
            None => None,
        };
        Ok(CommentFixture {
            id,
            post_id: self.post_id,
            parent_comment_id,
            text: self.text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    #[test]
    fn test_identity_shape() {
        let id = UserIdentity::with_suffix("abcd1234");
        assert_eq!(id.login, "user_abcd1234");
        assert_eq!(id.firstname, "First_abcd1234");
        assert_eq!(id.surname, "Last_abcd1234");
        assert_eq!(id.email, "user_abcd1234@example.com");
        assert_eq!(id.password, TEST_PASSWORD);
    }

    #[test]
    fn test_suffix_is_eight_alphanumerics() {
        let suffix = unique_suffix();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    }

    #[test]
    fn test_identities_never_collide() {
        let mut logins = HashSet::new();
        let mut emails = HashSet::new();
        for _ in 0..10_000 {
            let id = new_identity();
            assert!(logins.insert(id.login), "login collision");
            assert!(emails.insert(id.email), "email collision");
        }
    }

    #[test]
    fn test_signup_payload_fields() {
        let req = signup_request(&UserIdentity::with_suffix("s")).unwrap();
        let body: serde_json::Value = serde_json::from_str(req.body().unwrap()).unwrap();
        for field in ["login", "firstname", "surname", "email", "password"] {
            assert!(body.get(field).is_some(), "missing {}", field);
        }
        assert_eq!(req.path(), "/user");
    }

    #[test]
    fn test_comment_payload() {
        let session = UserSession {
            user: RegisteredUser {
                identity: UserIdentity::with_suffix("c"),
                id: "1".to_string(),
            },
            token: "tok".to_string(),
        };
        let top = CommentBuilder::new(&session, "p", "parent");
        assert_eq!(top.payload(), json!({"text": "parent"}));
        let reply = CommentBuilder::new(&session, "p", "r1").reply_to("c-1");
        assert_eq!(reply.payload(), json!({"parent_comment_id": "c-1", "text": "r1"}));

        let post = PostBuilder::new(&session).title("x").tags(["a", "b"]).private(true);
        assert_eq!(post.payload()["tags"], json!(["a", "b"]));
        assert_eq!(post.payload()["is_private"], json!(true));
    }

    proptest! {
        #[test]
        fn prop_suffix_lands_in_every_field(suffix in "[a-z0-9]{8}") {
            let id = UserIdentity::with_suffix(&suffix);
            prop_assert!(id.login.ends_with(&suffix));
            prop_assert!(id.firstname.ends_with(&suffix));
            prop_assert!(id.surname.ends_with(&suffix));
            prop_assert!(id.email.contains(&suffix));
        }
    }
}
