use axum::{
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use std::sync::Arc;

use crate::error::HttpAppError;
use crate::state::AppState;

/// Serve a stored file (legal PDFs) with the content type it was uploaded with
#[utoipa::path(
    get,
    path = "/api/files/{key}",
    params(("key" = String, Path, description = "Storage key, may contain slashes")),
    responses(
        (status = 200, description = "File bytes"),
        (status = 400, description = "Invalid key"),
        (status = 404, description = "File not found")
    ),
    tag = "files"
)]
#[tracing::instrument(skip(state))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let object = state.services.legal.fetch_file(&key).await?;
    Ok((
        [
            (header::CONTENT_TYPE, object.content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        object.data,
    ))
}
