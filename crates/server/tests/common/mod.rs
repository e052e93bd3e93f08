//! Common test utilities for API testing with a mock provider.
//!
//! This module provides a test fixture that creates an in-process router
//! over a resolver wired to `MockProvider`, so the HTTP surface can be
//! exercised without a real IPTV backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use streamfind_core::{
    testing::MockProvider, CacheConfig, CacheStore, Config, ProviderConfig, Resolver,
    ResolverConfig,
};
use streamfind_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use streamfind_core::testing::fixtures;

/// Test fixture for API testing with a mock provider.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_resolve() {
///     let fixture = TestFixture::new().await;
///     fixture.provider.set_catalog(CatalogKind::Series, fixtures::office_catalog()).await;
///
///     let response = fixture.post("/api/v1/resolve/episode", json!({
///         "title": "The Office", "season": 1, "episode": 1
///     })).await;
///
///     assert_eq!(response.status, StatusCode::NOT_FOUND);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock provider - configure catalogs and episode payloads
    pub provider: MockProvider,
    /// Resolver behind the router
    pub resolver: Arc<Resolver>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default resolver settings.
    pub async fn new() -> Self {
        let credentials = fixtures::credentials();
        let config = Config {
            provider: Some(ProviderConfig {
                base_url: credentials.base_url.clone(),
                username: credentials.username.clone(),
                password: credentials.password.clone(),
                timeout_secs: 5,
            }),
            ..Config::default()
        };

        let provider = MockProvider::new();
        let resolver = Arc::new(Resolver::new(
            ResolverConfig::default(),
            Arc::new(provider.clone()),
            credentials,
            Arc::new(CacheStore::in_memory(&CacheConfig::default())),
        ));

        let state = Arc::new(AppState::new(config, Arc::clone(&resolver)));
        let router = create_router(state);

        Self {
            router,
            provider,
            resolver,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        self.request("GET", path, None).await
    }

    /// Send a POST request with JSON body.
    pub async fn post(&self, path: &str, body: Value) -> TestResponse {
        self.request("POST", path, Some(body)).await
    }

    /// Send a request and return the raw body text.
    pub async fn get_text(&self, path: &str) -> (StatusCode, String) {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Send a request to the test server.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let request_builder = Request::builder().method(method).uri(path);

        let request = match body {
            Some(json) => request_builder
                .header("Content-Type", "application/json")
                .body(Body::from(serde_json::to_string(&json).unwrap()))
                .unwrap(),
            None => request_builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse { status, body }
    }
}
