//! CRM lead pipeline integration tests.
//!
//! Run with: `cargo test -p wayfarer-api --test leads_test`

mod helpers;

use helpers::{bearer, setup_test_app, ADMIN, MARKETING, SUPPORT};
use serde_json::{json, Value};

async fn create_lead(server: &axum_test::TestServer, token: &str) -> Value {
    let response = server
        .post("/api/admin/crm/leads")
        .add_header("Authorization", bearer(token))
        .json(&json!({
            "name": "Asha Rao",
            "email": "asha@example.com",
            "phone": "+91 98765 43210",
            "destination_interest": "Bali",
            "source": "instagram"
        }))
        .await;
    assert_eq!(response.status_code(), 201);
    response.json()
}

#[tokio::test]
async fn test_create_lead_logs_note_and_audit() {
    let app = setup_test_app().await;
    let client = app.client();
    let lead = create_lead(client, SUPPORT).await;
    assert_eq!(lead["stage"], "New");
    assert_eq!(lead["version"], 1);

    let id = lead["id"].as_str().unwrap();
    let detail: Value = client
        .get(&format!("/api/admin/crm/leads/{}", id))
        .add_header("Authorization", bearer(SUPPORT))
        .await
        .json();
    let activities = detail["activities"].as_array().unwrap();
    assert_eq!(activities.len(), 1);
    assert_eq!(activities[0]["type"], "note");
    assert_eq!(activities[0]["payload"]["message"], "Lead created");
    assert_eq!(activities[0]["actor"], "support-1");

    let audit = app.store.audit_entries().unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].entity_type, "lead");
    assert_eq!(audit[0].actor, "support-1");
}

#[tokio::test]
async fn test_invalid_lead_is_rejected_before_writing() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .post("/api/admin/crm/leads")
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "name": "", "email": "not-an-email" }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert_eq!(response.json::<Value>()["code"], "VALIDATION_ERROR");
    assert!(app.store.audit_entries().unwrap().is_empty());
}

#[tokio::test]
async fn test_stage_change_and_stale_version() {
    let app = setup_test_app().await;
    let client = app.client();
    let lead = create_lead(client, SUPPORT).await;
    let path = format!("/api/admin/crm/leads/{}", lead["id"].as_str().unwrap());

    let updated = client
        .put(&path)
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "stage": "Hot", "version": 1 }))
        .await;
    assert_eq!(updated.status_code(), 200);
    let updated: Value = updated.json();
    assert_eq!(updated["stage"], "Hot");
    assert_eq!(updated["version"], 2);

    let stale = client
        .put(&path)
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "stage": "Cold", "version": 1 }))
        .await;
    assert_eq!(stale.status_code(), 409);

    let detail: Value = client
        .get(&path)
        .add_header("Authorization", bearer(SUPPORT))
        .await
        .json();
    assert_eq!(detail["stage"], "Hot");
    let changes: Vec<&Value> = detail["activities"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|a| a["type"] == "status_change")
        .collect();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["payload"], json!({ "from": "New", "to": "Hot" }));
}

#[tokio::test]
async fn test_marketing_reads_but_cannot_edit() {
    let app = setup_test_app().await;
    let client = app.client();
    let lead = create_lead(client, SUPPORT).await;
    let path = format!("/api/admin/crm/leads/{}", lead["id"].as_str().unwrap());

    let read = client
        .get(&path)
        .add_header("Authorization", bearer(MARKETING))
        .await;
    assert_eq!(read.status_code(), 200);

    let edit = client
        .put(&path)
        .add_header("Authorization", bearer(MARKETING))
        .json(&json!({ "stage": "Lost" }))
        .await;
    assert_eq!(edit.status_code(), 403);

    let note = client
        .post(&format!("{}/activities", path))
        .add_header("Authorization", bearer(MARKETING))
        .json(&json!({ "type": "note", "payload": { "message": "hi" } }))
        .await;
    assert_eq!(note.status_code(), 403);
}

#[tokio::test]
async fn test_manual_activities() {
    let app = setup_test_app().await;
    let client = app.client();
    let lead = create_lead(client, SUPPORT).await;
    let path = format!(
        "/api/admin/crm/leads/{}/activities",
        lead["id"].as_str().unwrap()
    );

    let call = client
        .post(&path)
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "type": "call", "payload": { "summary": "Wants 5 nights" } }))
        .await;
    assert_eq!(call.status_code(), 201);
    assert_eq!(call.json::<Value>()["type"], "call");

    let system = client
        .post(&path)
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "type": "converted", "payload": { "booking_code": "NSV1" } }))
        .await;
    assert_eq!(system.status_code(), 400);

    let missing = client
        .post("/api/admin/crm/leads/6f1c2a4e-0000-4000-8000-000000000000/activities")
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "type": "note", "payload": { "message": "hi" } }))
        .await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_conversion_requires_bookings_create_and_happens_once() {
    let app = setup_test_app().await;
    let client = app.client();
    let lead = create_lead(client, SUPPORT).await;
    let lead_id = lead["id"].as_str().unwrap();
    let path = format!("/api/admin/crm/leads/{}/convert", lead_id);
    let body = json!({ "total_amount": 85000, "travelers": [{ "name": "Asha Rao" }] });

    let support = client
        .post(&path)
        .add_header("Authorization", bearer(SUPPORT))
        .json(&body)
        .await;
    assert_eq!(support.status_code(), 403);

    let converted = client
        .post(&path)
        .add_header("Authorization", bearer(ADMIN))
        .json(&body)
        .await;
    assert_eq!(converted.status_code(), 201);
    let receipt: Value = converted.json();
    assert!(receipt["booking_code"].as_str().unwrap().starts_with("NSV"));
    assert_eq!(receipt["lead_id"], lead_id);

    let again = client
        .post(&path)
        .add_header("Authorization", bearer(ADMIN))
        .json(&body)
        .await;
    assert_eq!(again.status_code(), 409);

    let bookings = app.store.bookings().unwrap();
    assert_eq!(bookings.len(), 1);
    assert_eq!(bookings[0].currency, "INR");
}

#[tokio::test]
async fn test_conversion_rejects_amount_beyond_money_range() {
    let app = setup_test_app().await;
    let client = app.client();
    let lead = create_lead(client, SUPPORT).await;
    let path = format!("/api/admin/crm/leads/{}/convert", lead["id"].as_str().unwrap());

    let response = client
        .post(&path)
        .add_header("Authorization", bearer(ADMIN))
        .json(&json!({ "total_amount": 1e28 }))
        .await;
    assert_eq!(response.status_code(), 400);
    assert!(app.store.bookings().unwrap().is_empty());
}

#[tokio::test]
async fn test_list_filters_and_dashboard() {
    let app = setup_test_app().await;
    let client = app.client();
    create_lead(client, SUPPORT).await;
    client
        .post("/api/admin/crm/leads")
        .add_header("Authorization", bearer(SUPPORT))
        .json(&json!({ "name": "Ravi Menon", "source": "website" }))
        .await;

    let search: Vec<Value> = client
        .get("/api/admin/crm/leads")
        .add_query_param("search", "ASHA")
        .add_header("Authorization", bearer(SUPPORT))
        .await
        .json();
    assert_eq!(search.len(), 1);
    assert_eq!(search[0]["name"], "Asha Rao");

    let by_source: Vec<Value> = client
        .get("/api/admin/crm/leads")
        .add_query_param("source", "website")
        .add_header("Authorization", bearer(SUPPORT))
        .await
        .json();
    assert_eq!(by_source.len(), 1);

    let dashboard: Value = client
        .get("/api/admin/crm/dashboard")
        .add_header("Authorization", bearer(MARKETING))
        .await
        .json();
    let new_count = dashboard["stages"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["stage"] == "New")
        .map(|s| s["count"].clone());
    assert_eq!(new_count, Some(json!(2)));
    assert_eq!(dashboard["followups"]["overdue"], 0);
}
