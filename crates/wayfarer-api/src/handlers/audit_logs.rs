use axum::{
    extract::State,
    response::{IntoResponse, Json},
};
use std::sync::Arc;

use crate::auth::AdminContext;
use crate::error::{ApiQuery, HttpAppError};
use crate::state::AppState;
use wayfarer_core::models::{AuditLogEntry, AuditLogQuery};
use wayfarer_core::{Action, Resource};

/// Read the audit trail, newest first
#[utoipa::path(
    get,
    path = "/api/admin/audit-logs",
    params(
        ("entity_type" = Option<String>, Query, description = "e.g. lead, booking, influencer_payout"),
        ("entity_id" = Option<String>, Query, description = "Entity id as recorded"),
        ("limit" = Option<i64>, Query, description = "Default 100, at most 500")
    ),
    responses(
        (status = 200, description = "Audit entries", body = Vec<AuditLogEntry>),
        (status = 403, description = "Not a founder")
    ),
    tag = "audit"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ApiQuery(query): ApiQuery<AuditLogQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::AuditLogs, Action::Read)?;
    Ok(Json(state.services.audit_logs.list(&query).await?))
}
