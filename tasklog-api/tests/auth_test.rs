/// Integration tests for registration, login, logout and the profile route

mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{TestContext, TEST_PASSWORD};
use serde_json::json;
use tasklog_shared::store::Store;

fn session_cookie(headers: &axum::http::HeaderMap) -> String {
    headers
        .get(header::SET_COOKIE)
        .expect("Set-Cookie header")
        .to_str()
        .unwrap()
        .to_string()
}

#[tokio::test]
async fn test_register_creates_user_account() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "email": "Cleo@Example.com",
                "password": "long-enough-password",
                "name": "Cleo"
            })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    assert_eq!(res.body["user"]["email"], "cleo@example.com");
    assert_eq!(res.body["user"]["role"], "USER");
    assert!(res.body["user"].get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_email_conflicts() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "ANA@example.com", "password": "long-enough-password" })),
        )
        .await;

    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.body["message"], "Email already exists");
}

#[tokio::test]
async fn test_register_validates_input() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .send(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({ "email": "not-an-email", "password": "short" })),
        )
        .await;

    assert_eq!(res.status, StatusCode::UNPROCESSABLE_ENTITY);
    let fields: Vec<&str> = res.body["details"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["field"].as_str().unwrap())
        .collect();
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_login_sets_session_cookie_and_records_login() {
    let ctx = TestContext::new().await.unwrap();
    assert!(ctx.user.last_login.is_none());

    let res = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["user"]["id"], ctx.user.id.to_string());
    assert!(res.body.get("token").is_none());

    let cookie = session_cookie(&res.headers);
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("Max-Age=86400"));

    let stored = ctx.store.find_user(ctx.user.id).await.unwrap().unwrap();
    assert!(stored.last_login.is_some());

    // The cookie alone authenticates the profile route
    let token_pair = cookie.split(';').next().unwrap().to_string();
    let me = ctx
        .send_request(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::COOKIE, token_pair)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["email"], "ana@example.com");
    assert!(me.body["lastLogin"].is_string());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials_uniformly() {
    let ctx = TestContext::new().await.unwrap();

    let wrong_password = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "not-the-password" })),
        )
        .await;
    let unknown_email = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "nobody@example.com", "password": TEST_PASSWORD })),
        )
        .await;

    assert_eq!(wrong_password.status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_email.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password.body["message"], unknown_email.body["message"]);
}

#[tokio::test]
async fn test_login_missing_fields() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .send(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "ana@example.com", "password": "" })),
        )
        .await;

    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx.send(Method::POST, "/api/auth/logout", None, None).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["success"], true);
    let cookie = session_cookie(&res.headers);
    assert!(cookie.starts_with("token="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_me_requires_session() {
    let ctx = TestContext::new().await.unwrap();

    let anonymous = ctx.send(Method::GET, "/api/auth/me", None, None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
    assert_eq!(anonymous.body["error"], "unauthorized");

    let forged = ctx.get("/api/auth/me", "not.a.token").await;
    assert_eq!(forged.status, StatusCode::UNAUTHORIZED);

    let ok = ctx.get("/api/auth/me", &ctx.admin_token).await;
    assert_eq!(ok.status, StatusCode::OK);
    assert_eq!(ok.body["role"], "ADMIN");
}

#[tokio::test]
async fn test_stale_cookie_does_not_block_bearer_token() {
    let ctx = TestContext::new().await.unwrap();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/api/auth/me")
        .header(header::COOKIE, "token=expired.session.cookie")
        .header(header::AUTHORIZATION, format!("Bearer {}", ctx.user_token))
        .body(Body::empty())
        .unwrap();
    let res = ctx.send_request(request).await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], "ana@example.com");
}

#[tokio::test]
async fn test_me_for_deleted_account() {
    let ctx = TestContext::new().await.unwrap();
    ctx.store.delete_user(ctx.other.id).await.unwrap();

    let res = ctx.get("/api/auth/me", &ctx.other_token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx.send(Method::GET, "/health", None, None).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["status"], "healthy");
    assert_eq!(res.body["database"], "connected");
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx.get("/api/nothing-here", &ctx.user_token).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body["error"], "not_found");
}
