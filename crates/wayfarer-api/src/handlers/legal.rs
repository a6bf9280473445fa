//! Legal pages (privacy, terms, cancellation) and their PDF uploads.

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::auth::AdminContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::services::PdfUpload;
use crate::state::AppState;
use wayfarer_core::models::{LegalDocument, LegalDocumentType, LegalPdfUploaded, UpdateLegalDocument};
use wayfarer_core::{Action, AppError, Resource};

const FILE_FIELD: &str = "file";

#[utoipa::path(
    get,
    path = "/api/legal/{type}",
    params(("type" = String, Path, description = "privacy, terms or cancellation")),
    responses(
        (status = 200, description = "Published document", body = LegalDocument),
        (status = 400, description = "Unknown document type"),
        (status = 404, description = "Nothing published yet")
    ),
    tag = "legal"
)]
#[tracing::instrument(skip(state))]
pub async fn get_document(
    State(state): State<Arc<AppState>>,
    Path(document_type): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let document_type: LegalDocumentType = document_type.parse()?;
    Ok(Json(state.services.legal.get(document_type).await?))
}

/// Create or edit a legal document
#[utoipa::path(
    patch,
    path = "/api/admin/legal/{type}",
    params(("type" = String, Path, description = "privacy, terms or cancellation")),
    request_body = UpdateLegalDocument,
    responses(
        (status = 200, description = "Saved document", body = LegalDocument),
        (status = 400, description = "Unknown document type or invalid body")
    ),
    tag = "legal"
)]
#[tracing::instrument(skip(state, ctx, patch), fields(role = %ctx.role))]
pub async fn update_document(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(document_type): Path<String>,
    ValidatedJson(patch): ValidatedJson<UpdateLegalDocument>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let document_type: LegalDocumentType = document_type.parse()?;
    let audited = state
        .services
        .legal
        .update(document_type, patch, ctx.actor())
        .await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}

/// Upload the PDF version of a legal document
///
/// Multipart form with a single `file` field holding an `application/pdf`
/// of at most 10 MiB.
#[utoipa::path(
    post,
    path = "/api/admin/legal/{type}/upload-pdf",
    params(("type" = String, Path, description = "privacy, terms or cancellation")),
    request_body(content_type = "multipart/form-data", description = "`file`: the PDF"),
    responses(
        (status = 200, description = "Stored; document now links to it", body = LegalPdfUploaded),
        (status = 400, description = "Missing file or not a PDF"),
        (status = 413, description = "PDF larger than 10 MiB")
    ),
    tag = "legal"
)]
#[tracing::instrument(skip(state, ctx, multipart), fields(role = %ctx.role))]
pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(document_type): Path<String>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let document_type: LegalDocumentType = document_type.parse()?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let filename = field.file_name().unwrap_or("document.pdf").to_string();
        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_default();
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some(PdfUpload {
            filename,
            content_type,
            data,
        });
        break;
    }
    let upload =
        upload.ok_or_else(|| AppError::BadRequest("No file provided".to_string()))?;

    tracing::debug!(
        document_type = %document_type,
        filename = %upload.filename,
        size = upload.data.len(),
        "Legal PDF received"
    );
    let audited = state
        .services
        .legal
        .upload_pdf(document_type, upload, ctx.actor())
        .await?;
    Ok((
        StatusCode::OK,
        Json(state.audit.commit(ctx.actor(), audited).await),
    ))
}

fn multipart_error(err: MultipartError) -> HttpAppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        HttpAppError(AppError::PayloadTooLarge(err.body_text()))
    } else {
        HttpAppError(AppError::BadRequest(format!(
            "Invalid multipart body: {}",
            err.body_text()
        )))
    }
}
