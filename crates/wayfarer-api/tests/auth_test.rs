//! Session, identity and admin gate integration tests.
//!
//! Run with: `cargo test -p wayfarer-api --test auth_test`

mod helpers;

use helpers::{bearer, setup_test_app, MARKETING, OUTSIDER, SESSION_COOKIE, SUPPORT};
use serde_json::{json, Value};

#[tokio::test]
async fn test_health() {
    let app = setup_test_app().await;
    let response = app.client().get("/api/health").await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>(), json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_admin_routes_require_session_then_role() {
    let app = setup_test_app().await;
    let client = app.client();

    let anonymous = client.get("/api/admin/crm/leads").await;
    assert_eq!(anonymous.status_code(), 401);
    assert_eq!(anonymous.json::<Value>()["code"], "UNAUTHORIZED");

    let unknown = client
        .get("/api/admin/crm/leads")
        .add_header("Authorization", bearer("expired-token"))
        .await;
    assert_eq!(unknown.status_code(), 401);

    let outsider = client
        .get("/api/admin/crm/leads")
        .add_header("Authorization", bearer(OUTSIDER))
        .await;
    assert_eq!(outsider.status_code(), 403);
    assert_eq!(outsider.json::<Value>()["code"], "PERMISSION_DENIED");

    let support = client
        .get("/api/admin/crm/leads")
        .add_header("Authorization", bearer(SUPPORT))
        .await;
    assert_eq!(support.status_code(), 200);
}

#[tokio::test]
async fn test_session_cookie_is_accepted() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/api/users/me")
        .add_header("Cookie", format!("{}={}", SESSION_COOKIE, MARKETING))
        .await;
    assert_eq!(response.status_code(), 200);
    assert_eq!(response.json::<Value>()["id"], "marketing-1");
}

#[tokio::test]
async fn test_sign_in_sets_http_only_cookie() {
    let app = setup_test_app().await;
    let client = app.client();

    let missing = client.post("/api/sessions").json(&json!({})).await;
    assert_eq!(missing.status_code(), 400);

    let rejected = client
        .post("/api/sessions")
        .json(&json!({ "code": "bad-code" }))
        .await;
    assert_eq!(rejected.status_code(), 401);

    let response = client
        .post("/api/sessions")
        .json(&json!({ "code": "good-code" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let cookie = response.header("set-cookie");
    let cookie = cookie.to_str().unwrap();
    assert!(cookie.starts_with(&format!("{}=founder-token", SESSION_COOKIE)));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=None"));
    assert!(cookie.contains("Max-Age=5184000"));
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .get("/api/logout")
        .add_header("Cookie", format!("{}={}", SESSION_COOKIE, SUPPORT))
        .await;
    assert_eq!(response.status_code(), 200);
    let cookie = response.header("set-cookie");
    assert!(cookie.to_str().unwrap().contains("Max-Age=0"));
}

#[tokio::test]
async fn test_admin_check_reports_role() {
    let app = setup_test_app().await;
    let client = app.client();

    let support = client
        .get("/api/admin/check")
        .add_header("Authorization", bearer(SUPPORT))
        .await;
    assert_eq!(
        support.json::<Value>(),
        json!({ "is_admin": true, "role": "support" })
    );

    let outsider = client
        .get("/api/admin/check")
        .add_header("Authorization", bearer(OUTSIDER))
        .await;
    assert_eq!(
        outsider.json::<Value>(),
        json!({ "is_admin": false, "role": null })
    );

    let anonymous = client.get("/api/admin/check").await;
    assert_eq!(anonymous.status_code(), 401);
}

#[tokio::test]
async fn test_team_and_audit_logs_are_founder_only() {
    let app = setup_test_app().await;
    let client = app.client();

    for path in ["/api/admin/team", "/api/admin/audit-logs"] {
        let response = client
            .get(path)
            .add_header("Authorization", bearer(helpers::ADMIN))
            .await;
        assert_eq!(response.status_code(), 403, "{path}");

        let response = client
            .get(path)
            .add_header("Authorization", bearer(helpers::FOUNDER))
            .await;
        assert_eq!(response.status_code(), 200, "{path}");
    }
}

#[tokio::test]
async fn test_team_mutations_are_audited() {
    let app = setup_test_app().await;
    let client = app.client();
    let founder = bearer(helpers::FOUNDER);

    let created = client
        .post("/api/admin/team")
        .add_header("Authorization", founder.clone())
        .json(&json!({ "user_id": "bookings-7", "role": "bookings" }))
        .await;
    assert_eq!(created.status_code(), 201);
    let id = created.json::<Value>()["id"].as_str().unwrap().to_string();

    let duplicate = client
        .post("/api/admin/team")
        .add_header("Authorization", founder.clone())
        .json(&json!({ "user_id": "bookings-7", "role": "admin" }))
        .await;
    assert_eq!(duplicate.status_code(), 409);

    let removed = client
        .delete(&format!("/api/admin/team/{}", id))
        .add_header("Authorization", founder.clone())
        .await;
    assert_eq!(removed.status_code(), 204);

    let logs = client
        .get("/api/admin/audit-logs")
        .add_query_param("entity_type", "admin_role")
        .add_header("Authorization", founder)
        .await
        .json::<Vec<Value>>();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0]["action"], "delete");
    assert_eq!(logs[1]["action"], "create");
    assert_eq!(logs[1]["actor"], "founder-1");
}
