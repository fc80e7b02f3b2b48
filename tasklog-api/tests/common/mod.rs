//! Common test utilities for integration tests
//!
//! Every test gets a fresh router over its own [`MemoryStore`], seeded
//! with two regular users and one administrator, plus session tokens for
//! each of them.
#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tasklog_api::app::{build_router, AppState};
use tasklog_api::config::Config;
use tasklog_shared::auth::jwt::{create_token, Claims};
use tasklog_shared::auth::password::hash_password;
use tasklog_shared::models::task::{CreateTask, Task, TaskStatus};
use tasklog_shared::models::user::{CreateUser, Role, User};
use tasklog_shared::store::{MemoryStore, Store};
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-at-least-32-bytes";
pub const TEST_PASSWORD: &str = "correct-horse-battery";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,

    pub user: User,
    pub user_token: String,

    pub other: User,
    pub other_token: String,

    pub admin: User,
    pub admin_token: String,
}

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestContext {
    pub async fn new() -> anyhow::Result<Self> {
        let config = Config::for_memory_store(TEST_SECRET);
        let store = Arc::new(MemoryStore::new());
        let password_hash = hash_password(TEST_PASSWORD)?;

        let user = seed_user(&store, "ana@example.com", Some("Ana"), Role::User, &password_hash).await?;
        let other = seed_user(&store, "ben@example.com", Some("Ben"), Role::User, &password_hash).await?;
        let admin = seed_user(&store, "root@example.com", Some("Root"), Role::Admin, &password_hash).await?;

        let token = |user: &User| {
            create_token(
                &Claims::for_user(user, config.jwt.expiration()),
                &config.jwt.secret,
            )
        };
        let user_token = token(&user)?;
        let other_token = token(&other)?;
        let admin_token = token(&admin)?;

        let app = build_router(AppState::new(store.clone(), config.clone()));

        Ok(TestContext {
            store,
            app,
            config,
            user,
            user_token,
            other,
            other_token,
            admin,
            admin_token,
        })
    }

    /// Sends a request, optionally with a bearer token and a JSON body
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_request(request).await
    }

    /// Sends a prebuilt request (e.g. one carrying a cookie)
    pub async fn send_request(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::POST, uri, Some(token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.send(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.send(Method::DELETE, uri, Some(token), None).await
    }

    /// Inserts a task directly, bypassing duplicate detection
    pub async fn seed_task(
        &self,
        owner: &User,
        description: &str,
        category: &str,
        ticket: Option<&str>,
        status: TaskStatus,
    ) -> Task {
        self.store
            .create_task(CreateTask {
                user_id: owner.id,
                description: description.to_string(),
                category: category.to_string(),
                ticket_number: ticket.map(str::to_string),
                status,
                date: chrono::Utc::now(),
            })
            .await
            .unwrap()
    }
}

async fn seed_user(
    store: &MemoryStore,
    email: &str,
    name: Option<&str>,
    role: Role,
    password_hash: &str,
) -> anyhow::Result<User> {
    Ok(store
        .create_user(CreateUser {
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.map(str::to_string),
            role,
        })
        .await?)
}
