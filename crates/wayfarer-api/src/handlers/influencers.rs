//! Influencer program: public applications and code checks, admin review,
//! influencer management, analytics and attribution approval.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminContext;
use crate::error::{ApiQuery, HttpAppError, ValidatedJson};
use crate::state::AppState;
use wayfarer_core::models::{
    AttributionListQuery, CreateInfluencer, Influencer, InfluencerAnalytics, InfluencerCreated,
    InfluencerRequest, ReferralAttribution, ReferralCodeCheck, RequestListQuery,
    ReviewInfluencerRequest, SubmitInfluencerRequest, UpdateInfluencer, ValidateCodeQuery,
};
use wayfarer_core::{Action, Resource};

/// Apply to the influencer program
#[utoipa::path(
    post,
    path = "/api/influencer/request",
    request_body = SubmitInfluencerRequest,
    responses(
        (status = 201, description = "Application recorded as pending", body = InfluencerRequest),
        (status = 400, description = "Validation failed")
    ),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, request))]
pub async fn submit_request(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<SubmitInfluencerRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let request = state.services.influencers.submit_request(request).await?;
    tracing::info!(request_id = %request.id, "Influencer application received");
    Ok((StatusCode::CREATED, Json(request)))
}

/// Check whether a referral code belongs to an active influencer
#[utoipa::path(
    get,
    path = "/api/influencer/validate",
    params(("code" = String, Query, description = "Referral code, any case")),
    responses(
        (status = 200, description = "Validity and influencer name", body = ReferralCodeCheck),
        (status = 400, description = "Missing code")
    ),
    tag = "influencers"
)]
#[tracing::instrument(skip(state))]
pub async fn validate_code(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<ValidateCodeQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let check = state
        .services
        .influencers
        .validate_code(query.code.as_deref())
        .await?;
    Ok(Json(check))
}

#[utoipa::path(
    get,
    path = "/api/admin/influencer-requests",
    params(("status" = Option<String>, Query, description = "pending, approved or rejected")),
    responses((status = 200, description = "Applications, newest first", body = Vec<InfluencerRequest>)),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_requests(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ApiQuery(query): ApiQuery<RequestListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    Ok(Json(
        state.services.influencers.list_requests(query.status).await?,
    ))
}

/// Approve or reject a pending application
#[utoipa::path(
    patch,
    path = "/api/admin/influencer-requests/{id}",
    params(("id" = Uuid, Path, description = "Application id")),
    request_body = ReviewInfluencerRequest,
    responses(
        (status = 200, description = "Reviewed application", body = InfluencerRequest),
        (status = 404, description = "Application not found"),
        (status = 409, description = "Application already reviewed")
    ),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx, review), fields(role = %ctx.role))]
pub async fn review_request(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ValidatedJson(review): ValidatedJson<ReviewInfluencerRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state
        .services
        .influencers
        .review(id, review, ctx.actor())
        .await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}

#[utoipa::path(
    get,
    path = "/api/admin/influencers",
    responses((status = 200, description = "All influencers", body = Vec<Influencer>)),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_influencers(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    Ok(Json(state.services.influencers.list_influencers().await?))
}

/// Enrol an influencer directly, skipping the application step
#[utoipa::path(
    post,
    path = "/api/admin/influencers",
    request_body = CreateInfluencer,
    responses(
        (status = 201, description = "Influencer created", body = InfluencerCreated),
        (status = 400, description = "Validation failed")
    ),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn create_influencer(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ValidatedJson(request): ValidatedJson<CreateInfluencer>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Create)?;
    let audited = state.services.influencers.create_influencer(request).await?;
    let created = state.audit.commit(ctx.actor(), audited).await;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    patch,
    path = "/api/admin/influencers/{id}",
    params(("id" = Uuid, Path, description = "Influencer id")),
    request_body = UpdateInfluencer,
    responses(
        (status = 200, description = "Updated influencer", body = Influencer),
        (status = 404, description = "Influencer not found")
    ),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn update_influencer(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateInfluencer>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state
        .services
        .influencers
        .update_influencer(id, request)
        .await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}

#[utoipa::path(
    get,
    path = "/api/admin/influencer-analytics",
    responses((status = 200, description = "Program totals and top influencers", body = InfluencerAnalytics)),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn analytics(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    Ok(Json(state.services.influencers.analytics().await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/referral-attributions",
    params(
        ("influencer_id" = Option<Uuid>, Query, description = "Only this influencer"),
        ("status" = Option<String>, Query, description = "tracked, eligible or paid")
    ),
    responses((status = 200, description = "Attributions, newest first", body = Vec<ReferralAttribution>)),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_attributions(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ApiQuery(query): ApiQuery<AttributionListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    Ok(Json(
        state.services.influencers.list_attributions(&query).await?,
    ))
}

/// Mark a booking attribution as eligible for payout
#[utoipa::path(
    patch,
    path = "/api/admin/referral-attributions/{id}/approve",
    params(("id" = Uuid, Path, description = "Attribution id")),
    responses(
        (status = 200, description = "Attribution now eligible", body = ReferralAttribution),
        (status = 404, description = "Attribution not found"),
        (status = 409, description = "Not a tracked booking attribution")
    ),
    tag = "influencers"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn approve_attribution(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state.services.influencers.approve_attribution(id).await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}
