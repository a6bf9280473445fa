//! Admin team management. Founder only.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminContext;
use crate::error::{ApiJson, HttpAppError, ValidatedJson};
use crate::state::AppState;
use wayfarer_core::models::{AdminRoleAssignment, CreateAdminRole, UpdateAdminRole};
use wayfarer_core::{Action, Resource};

#[utoipa::path(
    get,
    path = "/api/admin/team",
    responses(
        (status = 200, description = "Role assignments", body = Vec<AdminRoleAssignment>),
        (status = 403, description = "Not a founder")
    ),
    tag = "team"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_team(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Team, Action::Read)?;
    Ok(Json(state.services.team.list().await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/team",
    request_body = CreateAdminRole,
    responses(
        (status = 201, description = "Role granted", body = AdminRoleAssignment),
        (status = 409, description = "User already holds a role")
    ),
    tag = "team"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn add_member(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ValidatedJson(request): ValidatedJson<CreateAdminRole>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Team, Action::Create)?;
    let audited = state.services.team.create(request).await?;
    let assignment = state.audit.commit(ctx.actor(), audited).await;
    Ok((StatusCode::CREATED, Json(assignment)))
}

#[utoipa::path(
    put,
    path = "/api/admin/team/{id}",
    params(("id" = Uuid, Path, description = "Role assignment id")),
    request_body = UpdateAdminRole,
    responses(
        (status = 200, description = "Role updated", body = AdminRoleAssignment),
        (status = 404, description = "Assignment not found")
    ),
    tag = "team"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn update_member(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<UpdateAdminRole>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Team, Action::Update)?;
    let audited = state.services.team.update(id, request).await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}

#[utoipa::path(
    delete,
    path = "/api/admin/team/{id}",
    params(("id" = Uuid, Path, description = "Role assignment id")),
    responses(
        (status = 204, description = "Role revoked"),
        (status = 404, description = "Assignment not found")
    ),
    tag = "team"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn remove_member(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Team, Action::Delete)?;
    let audited = state.services.team.delete(id).await?;
    state.audit.commit(ctx.actor(), audited).await;
    Ok(StatusCode::NO_CONTENT)
}
