#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use bistro_core::roles::{ROLE_ADMIN, ROLE_SALES};
use bistro_core::store::{InMemoryRecordStore, RecordStore};
use bistro_core::submit::{NoopNotifier, SubmitGuard};
use bistro_core::types::DbId;
use bistro_events::EventBus;
use http_body_util::BodyExt;
use tower::ServiceExt;

use bistro_api::auth::jwt::{generate_access_token, JwtConfig};
use bistro_api::config::ServerConfig;
use bistro_api::router::build_app_router;
use bistro_api::state::AppState;

pub const SALES_USER: DbId = 10;
pub const OTHER_SALES_USER: DbId = 11;
pub const ADMIN_USER: DbId = 1;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "bistro-integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
        },
    }
}

/// Application under test plus handles on its collaborators.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryRecordStore>,
    pub event_bus: Arc<EventBus>,
}

impl TestApp {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryRecordStore::new());
        let event_bus = Arc::new(EventBus::default());
        let dyn_store: Arc<dyn RecordStore> = store.clone();
        let config = test_config();

        let state = AppState {
            store: Arc::clone(&dyn_store),
            config: Arc::new(config.clone()),
            submit_guard: SubmitGuard::new(dyn_store, Arc::new(NoopNotifier)),
            event_bus: Arc::clone(&event_bus),
        };

        Self {
            router: build_app_router(state, &config),
            store,
            event_bus,
        }
    }

    /// Send one request through the full middleware stack.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response<Body> {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: serde_json::Value) -> Response<Body> {
        self.send(Method::PATCH, uri, Some(token), Some(body)).await
    }

    /// Create a record as `token`'s user and return its id.
    pub async fn create_record(&self, token: &str) -> String {
        let response = self.send(Method::POST, "/api/v1/onboarding", Some(token), None).await;
        assert_eq!(response.status(), 201);
        body_json(response).await["data"]["id"]
            .as_str()
            .unwrap()
            .to_string()
    }
}

pub fn token_for(user_id: DbId, role: &str) -> String {
    generate_access_token(user_id, role, &test_config().jwt).unwrap()
}

pub fn sales_token() -> String {
    token_for(SALES_USER, ROLE_SALES)
}

pub fn other_sales_token() -> String {
    token_for(OTHER_SALES_USER, ROLE_SALES)
}

pub fn admin_token() -> String {
    token_for(ADMIN_USER, ROLE_ADMIN)
}

/// Collect a response body and parse it as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// The `Location` header of a redirect.
pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .expect("redirect must carry a Location header")
        .to_str()
        .unwrap()
        .to_string()
}
