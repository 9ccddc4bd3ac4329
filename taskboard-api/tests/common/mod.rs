/// Common test utilities for API integration tests
///
/// Builds the full router over an in-memory store with a cheap Argon2
/// configuration, and offers helpers to drive it with `oneshot` requests.

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::password::{Argon2Hasher, HashParams};
use taskboard_shared::notify::NoopNotifier;
use taskboard_shared::repository::InMemoryStore;
use tower::ServiceExt;

pub const PASSWORD: &str = "hunter22";

/// A registered and logged-in account
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub email: String,
    pub token: String,
}

impl TestUser {
    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub struct TestContext {
    pub app: axum::Router,
}

impl TestContext {
    pub fn new() -> Self {
        let state = AppState::with_hasher(
            Arc::new(InMemoryStore::new()),
            Config::for_testing(),
            Arc::new(NoopNotifier),
            Arc::new(Argon2Hasher::with_params(HashParams::light())),
        );

        Self {
            app: build_router(state),
        }
    }

    /// Sends a request and returns the status and the JSON body (`Null` when empty)
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        auth: Option<&TestUser>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = auth {
            builder = builder.header("authorization", user.auth_header());
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let (status, _, json) = self.send_request(request).await;
        (status, json)
    }

    /// Sends a prepared request and also returns the response headers
    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
        let response = self.app.clone().oneshot(request).await.expect("router call");
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");

        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                panic!("non-JSON body ({}): {}", status, String::from_utf8_lossy(&bytes))
            })
        };

        (status, headers, json)
    }

    /// Registers `name` with a unique email and logs in
    pub async fn user(&self, name: &str) -> TestUser {
        let email = format!("{}-{}@example.com", name.to_lowercase(), uuid::Uuid::new_v4());

        let (status, body) = self
            .send(
                "POST",
                "/v1/auth/register",
                None,
                Some(json!({ "name": name, "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        let (status, body) = self
            .send(
                "POST",
                "/v1/auth/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().expect("user id").to_string(),
            email,
            token: body["token"].as_str().expect("token").to_string(),
        }
    }

    /// Creates a task as `creator` and returns its id
    pub async fn task(&self, creator: &TestUser, title: &str, assignees: &[&TestUser]) -> String {
        let users: Vec<Value> = assignees.iter().map(|u| json!({ "id": u.id })).collect();
        let (status, body) = self
            .send(
                "POST",
                "/v1/tasks",
                Some(creator),
                Some(json!({ "title": title, "users": users })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create task failed: {}", body);

        body["id"].as_str().expect("task id").to_string()
    }
}
