//! Common test utilities for API integration tests
//!
//! Builds the full router against the PostgreSQL instance named by
//! `DATABASE_URL` and drives it in-process with `tower::ServiceExt::oneshot`.
//! When `DATABASE_URL` is unset the context is `None` and tests return early.

#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::Value;
use sqlx::PgPool;
use tower::ServiceExt;
use trellis_api::app::{build_router, AppState};
use trellis_api::config::Config;
use trellis_shared::db::migrations::{ensure_database_exists, run_migrations};
use trellis_shared::services::analysis::Summarizer;
use uuid::Uuid;

pub const TEST_SECRET: &str = "test-secret-key-at-least-32-bytes-long";
pub const TEST_PASSWORD: &str = "correct-horse-1";

/// Test context containing the router and its pool
pub struct TestContext {
    pub db: PgPool,
    pub app: axum::Router,
}

/// A registered user as seen by the API
pub struct TestUser {
    pub id: Uuid,
    pub email: String,
    pub token: String,
}

impl TestUser {
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

pub fn test_config(database_url: &str) -> Config {
    Config::from_lookup(|key| match key {
        "DATABASE_URL" => Some(database_url.to_string()),
        "JWT_SECRET" => Some(TEST_SECRET.to_string()),
        "JWT_TTL_MINUTES" => Some("5".to_string()),
        _ => None,
    })
    .expect("Invalid test configuration")
}

impl TestContext {
    pub async fn new() -> Option<Self> {
        Self::with_summarizer(None).await
    }

    pub async fn with_summarizer(summarizer: Option<Arc<dyn Summarizer>>) -> Option<Self> {
        let url = match std::env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => url,
            _ => {
                eprintln!("DATABASE_URL not set; skipping API integration test");
                return None;
            }
        };

        ensure_database_exists(&url).await.expect("Failed to create database");
        let db = PgPool::connect(&url).await.expect("Failed to connect");
        run_migrations(&db).await.expect("Migrations failed");

        let state = AppState::with_summarizer(db.clone(), test_config(&url), summarizer);
        let app = build_router(state);

        Some(Self { db, app })
    }

    /// Sends one request and returns status plus parsed JSON body
    ///
    /// An empty body comes back as `Value::Null`.
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some(bearer) = bearer {
            builder = builder.header(header::AUTHORIZATION, bearer);
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).to_string())
            })
        };

        (status, json)
    }

    pub async fn get(&self, uri: &str, user: &TestUser) -> (StatusCode, Value) {
        self.send(Method::GET, uri, Some(&user.bearer()), None).await
    }

    pub async fn post(&self, uri: &str, user: &TestUser, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(&user.bearer()), Some(body)).await
    }

    /// Registers a fresh user through the API
    pub async fn register(&self, prefix: &str) -> TestUser {
        let email = format!("{}-{}@example.com", prefix, Uuid::new_v4());

        let (status, body) = self
            .send(
                Method::POST,
                "/v1/auth/register",
                None,
                Some(serde_json::json!({ "email": email, "password": TEST_PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);

        TestUser {
            id: body["user"]["id"].as_str().unwrap().parse().unwrap(),
            email,
            token: body["access_token"].as_str().unwrap().to_string(),
        }
    }

    /// Creates a project owned by `admin` and returns its id
    pub async fn create_project(&self, admin: &TestUser, name: &str) -> String {
        let (status, body) = self
            .post("/v1/projects", admin, serde_json::json!({ "name": name }))
            .await;
        assert_eq!(status, StatusCode::CREATED, "create project failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }
}
