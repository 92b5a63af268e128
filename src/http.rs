//! Gateway HTTP client
//!
//! Thin wrapper over `reqwest` that logs every request and response. It never
//! retries and never interprets status codes; callers inspect
//! [`ApiResponse::status`] themselves.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

use crate::error::{HarnessError, HarnessResult};

/// `Authorization: Bearer <token>` header pair
pub fn auth_header(token: &str) -> (String, String) {
    (AUTHORIZATION.to_string(), format!("Bearer {}", token))
}

/// An outbound gateway request
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    params: Vec<(String, String)>,
    body: Option<String>,
    headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            params: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Append a query parameter
    pub fn param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.params.push((key.into(), value.to_string()));
        self
    }

    /// Serialize `body` to JSON and mark the request as `application/json`
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> HarnessResult<Self> {
        self.body = Some(serde_json::to_string(body)?);
        self.headers
            .push((CONTENT_TYPE.to_string(), "application/json".to_string()));
        Ok(self)
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Attach a bearer token
    pub fn bearer(self, token: &str) -> Self {
        let (name, value) = auth_header(token);
        self.header(name, value)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    fn header_map(&self) -> HarnessResult<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| HarnessError::Config(format!("bad header name '{}': {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| HarnessError::Config(format!("bad header value for {}: {}", name, e)))?;
            map.append(name, value);
        }
        Ok(map)
    }
}

/// An inbound gateway response with its body fully read
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: String,
}

impl ApiResponse {
    /// Decode the body into `T`
    pub fn json<T: DeserializeOwned>(&self) -> HarnessResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Decode the body as an untyped JSON document
    pub fn json_value(&self) -> HarnessResult<serde_json::Value> {
        self.json()
    }

    /// Read a scalar at a JSON pointer (e.g. `/user/id`) as a string
    ///
    /// Numeric identifiers are rendered in decimal.
    pub fn str_at(&self, pointer: &str) -> HarnessResult<String> {
        let doc = self.json_value()?;
        doc.pointer(pointer)
            .and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .ok_or_else(|| HarnessError::missing(format!("response {}", self.status), pointer))
    }
}

/// Client bound to one gateway base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a gateway path
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{}", self.base_url, path)
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Send a request and read the whole response body
    pub async fn send(&self, request: ApiRequest) -> HarnessResult<ApiResponse> {
        let url = self.url(request.path());
        info!(
            method = %request.method,
            url = %url,
            params = ?request.params,
            body = request.body().unwrap_or(""),
            headers = ?request.headers,
            "Request"
        );

        let mut builder = self
            .http
            .request(request.method.clone(), &url)
            .headers(request.header_map()?);
        if !request.params.is_empty() {
            builder = builder.query(&request.params);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;
        info!(status = status.as_u16(), body = %body, "Response");

        Ok(ApiResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_body_sets_content_type() {
        let req = ApiRequest::post("/user")
            .json(&json!({"login": "user_abc"}))
            .unwrap();
        assert_eq!(req.body(), Some(r#"{"login":"user_abc"}"#));
        let headers = req.header_map().unwrap();
        assert_eq!(headers.get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[test]
    fn test_bearer_header() {
        let req = ApiRequest::get("/user/logout").bearer("tok");
        let headers = req.header_map().unwrap();
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer tok");
    }

    #[test]
    fn test_url_join() {
        let api = ApiClient::new("http://api-gateway:8080/");
        assert_eq!(api.url("/ping"), "http://api-gateway:8080/ping");
        assert_eq!(api.url("posts/1"), "http://api-gateway:8080/posts/1");
    }

    #[test]
    fn test_str_at_pointer() {
        let resp = ApiResponse {
            status: StatusCode::CREATED,
            body: r#"{"user":{"id":"42","login":"u"},"token":"t"}"#.to_string(),
        };
        assert_eq!(resp.str_at("/user/id").unwrap(), "42");
        assert!(matches!(
            resp.str_at("/user/email"),
            Err(HarnessError::MissingField { .. })
        ));
    }
}
