//! CRM lead handlers: pipeline list, lead detail, edits, activities,
//! conversion to a booking, and the dashboard.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminContext;
use crate::error::{ApiJson, ApiQuery, HttpAppError, ValidatedJson};
use crate::state::AppState;
use wayfarer_core::models::{
    ConversionReceipt, ConvertLeadRequest, CreateActivityRequest, CreateLeadRequest, CrmDashboard,
    Lead, LeadDetail, LeadFilter, UpdateLeadRequest,
};
use wayfarer_core::{Action, Resource};

/// List leads, newest first
#[utoipa::path(
    get,
    path = "/api/admin/crm/leads",
    params(
        ("stage" = Option<String>, Query, description = "Pipeline stage, e.g. `Yet To Talk`"),
        ("source" = Option<String>, Query, description = "Lead source"),
        ("assigned_to" = Option<String>, Query, description = "Assignee user id"),
        ("search" = Option<String>, Query, description = "Substring of name, email or phone")
    ),
    responses(
        (status = 200, description = "Up to 100 matching leads", body = Vec<Lead>),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Role lacks leads:read")
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_leads(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ApiQuery(filter): ApiQuery<LeadFilter>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    let leads = state.services.leads.list(&filter).await?;
    Ok(Json(leads))
}

/// Get a lead with its activity timeline
#[utoipa::path(
    get,
    path = "/api/admin/crm/leads/{id}",
    params(("id" = Uuid, Path, description = "Lead id")),
    responses(
        (status = 200, description = "Lead and activities, newest first", body = LeadDetail),
        (status = 404, description = "Lead not found")
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn get_lead(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    let detail = state.services.leads.detail(id).await?;
    Ok(Json(detail))
}

/// Create a lead by hand
#[utoipa::path(
    post,
    path = "/api/admin/crm/leads",
    request_body = CreateLeadRequest,
    responses(
        (status = 201, description = "Lead created", body = Lead),
        (status = 400, description = "Validation failed"),
        (status = 403, description = "Role lacks leads:create")
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn create_lead(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ValidatedJson(request): ValidatedJson<CreateLeadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Create)?;
    let audited = state.services.leads.create(request, ctx.actor()).await?;
    let lead = state.audit.commit(ctx.actor(), audited).await;
    Ok((StatusCode::CREATED, Json(lead)))
}

/// Partially update a lead
///
/// Stage changes and new followup dates are recorded as activities. Sending
/// `version` makes the update fail with 409 when the lead has moved on.
#[utoipa::path(
    put,
    path = "/api/admin/crm/leads/{id}",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = UpdateLeadRequest,
    responses(
        (status = 200, description = "Updated lead", body = Lead),
        (status = 404, description = "Lead not found"),
        (status = 409, description = "Stale version")
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn update_lead(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateLeadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state.services.leads.update(id, request, ctx.actor()).await?;
    let lead = state.audit.commit(ctx.actor(), audited).await;
    Ok(Json(lead))
}

/// Log a call, message, email, note or followup against a lead
#[utoipa::path(
    post,
    path = "/api/admin/crm/leads/{id}/activities",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = CreateActivityRequest,
    responses(
        (status = 201, description = "Activity appended", body = Object),
        (status = 400, description = "System-only type or malformed payload"),
        (status = 404, description = "Lead not found")
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn add_activity(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<CreateActivityRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require_any(&[
        (Resource::LeadActivities, Action::Create),
        (Resource::Leads, Action::Update),
    ])?;
    let audited = state
        .services
        .leads
        .add_activity(id, request, ctx.actor())
        .await?;
    let activity = state.audit.commit(ctx.actor(), audited).await;
    Ok((StatusCode::CREATED, Json(activity)))
}

/// Convert a lead into a draft booking
#[utoipa::path(
    post,
    path = "/api/admin/crm/leads/{id}/convert",
    params(("id" = Uuid, Path, description = "Lead id")),
    request_body = ConvertLeadRequest,
    responses(
        (status = 201, description = "Booking created", body = ConversionReceipt),
        (status = 404, description = "Lead not found"),
        (status = 409, description = "Lead already converted or changed concurrently")
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn convert_lead(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<ConvertLeadRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Bookings, Action::Create)?;
    let receipt = state
        .services
        .conversion
        .convert(id, request, ctx.actor())
        .await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

/// Pipeline dashboard
#[utoipa::path(
    get,
    path = "/api/admin/crm/dashboard",
    responses(
        (status = 200, description = "Stage, followup, source and assignee counts", body = CrmDashboard)
    ),
    tag = "leads"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    let dashboard = state.services.leads.dashboard(Utc::now()).await?;
    Ok(Json(dashboard))
}
