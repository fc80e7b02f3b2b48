/// Integration tests for page redirects driven by the session cookie

mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use common::{TestContext, TestResponse};

async fn visit(ctx: &TestContext, path: &str, token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().uri(path);
    if let Some(token) = token {
        builder = builder.header(header::COOKIE, format!("token={}", token));
    }
    ctx.send_request(builder.body(Body::empty()).unwrap()).await
}

fn location(res: &TestResponse) -> &str {
    res.headers
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let ctx = TestContext::new().await.unwrap();

    let res = visit(&ctx, "/dashboard", None).await;
    assert_eq!(res.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), "/login");
}

#[tokio::test]
async fn test_expired_or_forged_cookie_counts_as_no_session() {
    let ctx = TestContext::new().await.unwrap();

    let res = visit(&ctx, "/admin", Some("forged.token.value")).await;
    assert_eq!(res.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&res), "/admin/login");
}

#[tokio::test]
async fn test_admin_area_by_role() {
    let ctx = TestContext::new().await.unwrap();

    let user = visit(&ctx, "/admin/users", Some(&ctx.user_token)).await;
    assert_eq!(user.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&user), "/dashboard");

    // Admins get through the gate; no page is served there
    let admin = visit(&ctx, "/admin/users", Some(&ctx.admin_token)).await;
    assert_eq!(admin.status, StatusCode::NOT_FOUND);

    let admin_login = visit(&ctx, "/admin/login", Some(&ctx.admin_token)).await;
    assert_eq!(admin_login.status, StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&admin_login), "/admin");
}

#[tokio::test]
async fn test_signed_in_users_skip_public_pages() {
    let ctx = TestContext::new().await.unwrap();

    let user = visit(&ctx, "/login", Some(&ctx.user_token)).await;
    assert_eq!(location(&user), "/dashboard");

    let admin = visit(&ctx, "/", Some(&ctx.admin_token)).await;
    assert_eq!(location(&admin), "/admin");

    let anonymous = visit(&ctx, "/register", None).await;
    assert_eq!(anonymous.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_api_is_never_redirected() {
    let ctx = TestContext::new().await.unwrap();

    let res = visit(&ctx, "/api/tasks", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
    assert!(res.headers.get(header::LOCATION).is_none());
}
