/// Common test utilities for integration tests
///
/// Builds the full router over an in-memory repository so the HTTP surface
/// can be exercised without a database. The repository handle is kept so
/// tests can seed tasks and count queries.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;
use userdesk_api::app::{build_router, AppState};
use userdesk_api::config::Config;
use userdesk_shared::repository::InMemoryUserRepository;

/// Test context containing the app and its backing store
pub struct TestContext {
    pub repo: Arc<InMemoryUserRepository>,
    pub app: axum::Router,
}

/// Status code and decoded JSON body (`Value::Null` when empty)
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestContext {
    pub fn new() -> Self {
        let repo = Arc::new(InMemoryUserRepository::new());
        let app = build_router(AppState::new(repo.clone(), Config::in_memory()));
        Self { repo, app }
    }

    /// Sends a request, with an optional JSON body
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        TestResponse { status, body }
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, body: Value) -> TestResponse {
        self.send(Method::PATCH, uri, Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.send(Method::DELETE, uri, None).await
    }

    /// Creates a user through the API and returns its id
    pub async fn create_user(&self, username: &str, password: &str) -> i64 {
        let response = self
            .post(
                "/users",
                serde_json::json!({ "username": username, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{}", response.body);
        response.body["id"].as_i64().unwrap()
    }
}
