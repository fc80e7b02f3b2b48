/// Integration tests for the admin API

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use tasklog_shared::auth::password::verify_password;
use tasklog_shared::models::task::TaskStatus;
use tasklog_shared::models::user::Role;
use tasklog_shared::store::Store;

#[tokio::test]
async fn test_admin_routes_reject_regular_users() {
    let ctx = TestContext::new().await.unwrap();

    for uri in ["/api/admin/users", "/api/admin/stats", "/api/admin/tasks", "/api/admin/audit"] {
        let res = ctx.get(uri, &ctx.user_token).await;
        assert_eq!(res.status, StatusCode::FORBIDDEN, "{}", uri);
        assert_eq!(res.body["error"], "forbidden");
    }

    let anonymous = ctx
        .send(axum::http::Method::GET, "/api/admin/users", None, None)
        .await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_list_users_with_task_digest() {
    let ctx = TestContext::new().await.unwrap();
    ctx.seed_task(&ctx.user, "Triage", "Axios", Some("AX-1"), TaskStatus::Completed)
        .await;

    let res = ctx.get("/api/admin/users", &ctx.admin_token).await;
    assert_eq!(res.status, StatusCode::OK);

    let users = res.body.as_array().unwrap();
    assert_eq!(users.len(), 3);
    // Newest account first
    assert_eq!(users[0]["email"], "root@example.com");
    assert!(users.iter().all(|u| u.get("passwordHash").is_none()));

    let ana = users.iter().find(|u| u["email"] == "ana@example.com").unwrap();
    assert_eq!(ana["role"], "USER");
    assert_eq!(ana["tasks"][0]["status"], "COMPLETED");
    assert_eq!(ana["tasks"][0]["category"], "Axios");
    assert!(ana["tasks"][0].get("description").is_none());
}

#[tokio::test]
async fn test_create_user_with_role() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .post(
            "/api/admin/users",
            &ctx.admin_token,
            json!({ "email": "Dana@Example.com", "password": "long-enough-pw", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["email"], "dana@example.com");
    assert_eq!(res.body["role"], "ADMIN");

    let duplicate = ctx
        .post(
            "/api/admin/users",
            &ctx.admin_token,
            json!({ "email": "dana@example.com", "password": "long-enough-pw" }),
        )
        .await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_update_user_fields() {
    let ctx = TestContext::new().await.unwrap();
    let uri = format!("/api/admin/users/{}", ctx.user.id);

    let res = ctx
        .put(
            &uri,
            &ctx.admin_token,
            json!({ "name": "Ana Maria", "password": "brand-new-password", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["name"], "Ana Maria");
    assert_eq!(res.body["role"], "ADMIN");

    let stored = ctx.store.find_user(ctx.user.id).await.unwrap().unwrap();
    assert!(verify_password("brand-new-password", &stored.password_hash).unwrap());

    // Taking another account's email conflicts
    let clash = ctx
        .put(&uri, &ctx.admin_token, json!({ "email": "ben@example.com" }))
        .await;
    assert_eq!(clash.status, StatusCode::CONFLICT);

    let missing = ctx
        .put(
            &format!("/api/admin/users/{}", uuid::Uuid::new_v4()),
            &ctx.admin_token,
            json!({ "name": "Ghost" }),
        )
        .await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_user_cascades_and_protects_self() {
    let ctx = TestContext::new().await.unwrap();
    let task = ctx
        .seed_task(&ctx.user, "Triage", "Releases", None, TaskStatus::Pending)
        .await;

    let own = ctx
        .delete(&format!("/api/admin/users/{}", ctx.admin.id), &ctx.admin_token)
        .await;
    assert_eq!(own.status, StatusCode::BAD_REQUEST);

    let res = ctx
        .delete(&format!("/api/admin/users/{}", ctx.user.id), &ctx.admin_token)
        .await;
    assert_eq!(res.status, StatusCode::OK);

    assert!(ctx.store.find_user(ctx.user.id).await.unwrap().is_none());
    assert!(ctx.store.find_task(task.id).await.unwrap().is_none());

    let again = ctx
        .delete(&format!("/api/admin/users/{}", ctx.user.id), &ctx.admin_token)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_batch_delete_skips_caller_and_audits() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .post(
            "/api/admin/users/batch",
            &ctx.admin_token,
            json!({
                "userIds": [ctx.user.id, ctx.other.id, ctx.admin.id],
                "action": "DELETE"
            }),
        )
        .await;

    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 2);
    assert!(ctx.store.find_user(ctx.admin.id).await.unwrap().is_some());
    assert!(ctx.store.find_user(ctx.user.id).await.unwrap().is_none());

    let audit = ctx.get("/api/admin/audit", &ctx.admin_token).await;
    assert_eq!(audit.status, StatusCode::OK);
    let entries = audit.body.as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["action"], "BATCH_DELETE");
    assert_eq!(entries[0]["details"], "Deleted 2 users");
    assert_eq!(entries[0]["user"]["email"], "root@example.com");
}

#[tokio::test]
async fn test_batch_role_change() {
    let ctx = TestContext::new().await.unwrap();

    let missing_role = ctx
        .post(
            "/api/admin/users/batch",
            &ctx.admin_token,
            json!({ "userIds": [ctx.user.id], "action": "CHANGE_ROLE" }),
        )
        .await;
    assert_eq!(missing_role.status, StatusCode::BAD_REQUEST);

    let res = ctx
        .post(
            "/api/admin/users/batch",
            &ctx.admin_token,
            json!({ "userIds": [ctx.user.id, ctx.other.id], "action": "CHANGE_ROLE", "role": "ADMIN" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["count"], 2);

    let promoted = ctx.store.find_user(ctx.other.id).await.unwrap().unwrap();
    assert_eq!(promoted.role, Role::Admin);

    let audit = ctx.get("/api/admin/audit", &ctx.admin_token).await;
    assert_eq!(audit.body[0]["action"], "BATCH_ROLE_CHANGE");
    assert_eq!(audit.body[0]["details"], "Changed role to ADMIN for 2 users");
}

#[tokio::test]
async fn test_batch_requires_users() {
    let ctx = TestContext::new().await.unwrap();

    let res = ctx
        .post(
            "/api/admin/users/batch",
            &ctx.admin_token,
            json!({ "userIds": [], "action": "DELETE" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_totals_and_reports() {
    let ctx = TestContext::new().await.unwrap();
    ctx.seed_task(&ctx.user, "A", "Axios", Some("AX-1"), TaskStatus::Completed)
        .await;
    ctx.seed_task(&ctx.user, "B", "Releases", None, TaskStatus::Pending)
        .await;
    ctx.seed_task(&ctx.other, "C", "Custom Work", None, TaskStatus::InProgress)
        .await;
    ctx.store.record_login(ctx.other.id).await.unwrap();

    let res = ctx.get("/api/admin/stats", &ctx.admin_token).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["totalTasks"], 3);
    assert_eq!(res.body["pendingTasks"], 1);
    assert_eq!(res.body["inProgressTasks"], 1);
    assert_eq!(res.body["completedTasks"], 1);

    let categories = res.body["categoryStats"].as_array().unwrap();
    assert_eq!(categories.len(), 5);
    assert_eq!(categories[0], json!({ "name": "Axios", "value": 1 }));

    // USER accounts only, most recent login first
    let reports = res.body["userReports"].as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["email"], "ben@example.com");
    assert_eq!(reports[0]["totalTasks"], 1);
    assert!(reports[1]["lastLogin"].is_null());

    let ben_chart = reports[0]["chartData"].as_array().unwrap();
    assert!(ben_chart.contains(&json!({ "name": "Custom Work", "value": 1 })));
}

#[tokio::test]
async fn test_stats_date_range() {
    let ctx = TestContext::new().await.unwrap();
    ctx.seed_task(&ctx.user, "A", "Axios", None, TaskStatus::Completed)
        .await;

    let past = ctx
        .get("/api/admin/stats?startDate=2001-01-01&endDate=2001-12-31", &ctx.admin_token)
        .await;
    assert_eq!(past.status, StatusCode::OK);
    assert_eq!(past.body["totalTasks"], 0);

    let bad = ctx.get("/api/admin/stats?startDate=someday", &ctx.admin_token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_master_task_feed() {
    let ctx = TestContext::new().await.unwrap();
    ctx.seed_task(&ctx.user, "A", "Axios", None, TaskStatus::Completed)
        .await;
    ctx.seed_task(&ctx.other, "B", "Releases", None, TaskStatus::Pending)
        .await;

    let all = ctx.get("/api/admin/tasks?status=ALL", &ctx.admin_token).await;
    assert_eq!(all.status, StatusCode::OK);
    let tasks = all.body.as_array().unwrap();
    assert_eq!(tasks.len(), 2);
    assert!(tasks.iter().all(|t| t["user"]["email"].is_string()));

    let completed = ctx
        .get("/api/admin/tasks?status=COMPLETED", &ctx.admin_token)
        .await;
    let tasks = completed.body.as_array().unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["user"]["name"], "Ana");

    let bad = ctx.get("/api/admin/tasks?status=DONE", &ctx.admin_token).await;
    assert_eq!(bad.status, StatusCode::BAD_REQUEST);
}
