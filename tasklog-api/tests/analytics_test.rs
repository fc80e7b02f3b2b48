/// Integration tests for the analytics endpoint

mod common;

use axum::http::StatusCode;
use common::TestContext;
use tasklog_shared::models::task::TaskStatus;

#[tokio::test]
async fn test_analytics_for_any_signed_in_user() {
    let ctx = TestContext::new().await.unwrap();
    ctx.seed_task(&ctx.user, "A", "Axios", Some("AX-1"), TaskStatus::Completed)
        .await;
    ctx.seed_task(&ctx.user, "B", "Axios", Some("AX-2"), TaskStatus::Pending)
        .await;
    ctx.seed_task(&ctx.other, "C", "Side Project", None, TaskStatus::Pending)
        .await;

    let res = ctx.get("/api/analytics", &ctx.other_token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["currentUserId"], ctx.other.id.to_string());

    let stats = &res.body["globalStats"];
    assert_eq!(stats["Axios"], 2);
    assert_eq!(stats["Whatsapp"], 0);
    assert_eq!(stats["Monitoring"], 0);
    assert_eq!(stats["Side Project"], 1);

    // Ordered by display name: Ana, Ben, Root
    let activity = res.body["userActivity"].as_array().unwrap();
    let names: Vec<&str> = activity.iter().map(|a| a["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Ana", "Ben", "Root"]);
    assert_eq!(activity[0]["totalTasks"], 2);
    assert_eq!(activity[0]["tasks"].as_array().unwrap().len(), 2);
    assert_eq!(activity[2]["totalTasks"], 0);
}

#[tokio::test]
async fn test_analytics_requires_session() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .send(axum::http::Method::GET, "/api/analytics", None, None)
        .await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}
