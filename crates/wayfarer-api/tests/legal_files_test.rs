//! Legal documents, their PDF uploads and the file route that serves them.

mod helpers;

use axum_test::multipart::{MultipartForm, Part};
use helpers::{bearer, setup_test_app, ADMIN, MARKETING};
use serde_json::{json, Value};

fn pdf_form(file_name: &str, mime: &str) -> MultipartForm {
    let part = Part::bytes(bytes::Bytes::from_static(b"%PDF-1.4\n%%EOF\n"))
        .file_name(file_name)
        .mime_type(mime);
    MultipartForm::new().add_part("file", part)
}

#[tokio::test]
async fn test_update_then_read_publicly() {
    let app = setup_test_app().await;
    let client = app.client();

    let before = client.get("/api/legal/terms").await;
    assert_eq!(before.status_code(), 404);

    let updated = client
        .patch("/api/admin/legal/terms")
        .add_header("Authorization", bearer(ADMIN))
        .json(&json!({ "html_content": "<h1>Terms</h1>" }))
        .await;
    assert_eq!(updated.status_code(), 200);

    let doc: Value = client.get("/api/legal/terms").await.json();
    assert_eq!(doc["title"], "Terms & Conditions");
    assert_eq!(doc["html_content"], "<h1>Terms</h1>");
    assert_eq!(doc["use_pdf"], false);
    assert_eq!(doc["updated_by"], "admin-1");

    let audit = app.store.audit_entries().unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].changes, json!({ "html_content": "updated" }));
}

#[tokio::test]
async fn test_unknown_document_type() {
    let app = setup_test_app().await;
    let public = app.client().get("/api/legal/refunds").await;
    assert_eq!(public.status_code(), 400);

    let admin = app
        .client()
        .patch("/api/admin/legal/refunds")
        .add_header("Authorization", bearer(ADMIN))
        .json(&json!({ "title": "Refunds" }))
        .await;
    assert_eq!(admin.status_code(), 400);
}

#[tokio::test]
async fn test_marketing_cannot_edit_legal() {
    let app = setup_test_app().await;
    let response = app
        .client()
        .patch("/api/admin/legal/privacy")
        .add_header("Authorization", bearer(MARKETING))
        .json(&json!({ "use_pdf": true }))
        .await;
    assert_eq!(response.status_code(), 403);
}

#[tokio::test]
async fn test_pdf_upload_is_served_from_files() {
    let app = setup_test_app().await;
    let client = app.client();

    let uploaded = client
        .post("/api/admin/legal/cancellation/upload-pdf")
        .add_header("Authorization", bearer(ADMIN))
        .multipart(pdf_form("Cancellation Policy.pdf", "application/pdf"))
        .await;
    assert_eq!(uploaded.status_code(), 200);
    let uploaded: Value = uploaded.json();
    let url = uploaded["url"].as_str().unwrap().to_string();
    assert!(url.starts_with("/api/files/legal/cancellation/"));

    let doc: Value = client.get("/api/legal/cancellation").await.json();
    assert_eq!(doc["pdf_url"], url.as_str());
    assert_eq!(doc["title"], "Cancellation Policy");

    let file = client.get(&url).await;
    assert_eq!(file.status_code(), 200);
    assert_eq!(file.header("content-type"), "application/pdf");
    assert_eq!(file.as_bytes().as_ref(), b"%PDF-1.4\n%%EOF\n");
}

#[tokio::test]
async fn test_upload_rejections() {
    let app = setup_test_app().await;
    let client = app.client();

    let not_pdf = client
        .post("/api/admin/legal/terms/upload-pdf")
        .add_header("Authorization", bearer(ADMIN))
        .multipart(pdf_form("terms.docx", "application/msword"))
        .await;
    assert_eq!(not_pdf.status_code(), 400);

    let wrong_field = client
        .post("/api/admin/legal/terms/upload-pdf")
        .add_header("Authorization", bearer(ADMIN))
        .multipart(MultipartForm::new().add_text("note", "no file here"))
        .await;
    assert_eq!(wrong_field.status_code(), 400);

    let anonymous = client
        .post("/api/admin/legal/terms/upload-pdf")
        .multipart(pdf_form("terms.pdf", "application/pdf"))
        .await;
    assert_eq!(anonymous.status_code(), 401);
}

#[tokio::test]
async fn test_file_route_rejects_bad_keys() {
    let app = setup_test_app().await;
    let client = app.client();

    let traversal = client.get("/api/files/legal%2F..%2Fsecrets").await;
    assert_eq!(traversal.status_code(), 400);

    let missing = client.get("/api/files/legal/terms/missing.pdf").await;
    assert_eq!(missing.status_code(), 404);
}
