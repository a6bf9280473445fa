//! Influencer commission payout batches.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminContext;
use crate::error::{ApiJson, ApiQuery, HttpAppError};
use crate::state::AppState;
use wayfarer_core::models::{
    CreatePayoutRequest, InfluencerPayout, MarkPayoutPaidRequest, PayoutListItem, PayoutListQuery,
    PayoutSettlement,
};
use wayfarer_core::{Action, Resource};

/// Batch an influencer's eligible booking commissions for a date range
#[utoipa::path(
    post,
    path = "/api/admin/influencer-payouts/create",
    request_body = CreatePayoutRequest,
    responses(
        (status = 201, description = "Pending payout batch", body = InfluencerPayout),
        (status = 400, description = "period_start after period_end"),
        (status = 404, description = "Influencer not found")
    ),
    tag = "payouts"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn create_payout(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ApiJson(request): ApiJson<CreatePayoutRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state.services.payouts.create(request).await?;
    let payout = state.audit.commit(ctx.actor(), audited).await;
    Ok((StatusCode::CREATED, Json(payout)))
}

/// Settle a payout batch
///
/// Idempotent: marking an already paid batch again only updates the notes.
#[utoipa::path(
    patch,
    path = "/api/admin/influencer-payouts/{id}/mark-paid",
    params(("id" = Uuid, Path, description = "Payout id")),
    request_body = MarkPayoutPaidRequest,
    responses(
        (status = 200, description = "Batch paid", body = PayoutSettlement),
        (status = 404, description = "Payout not found")
    ),
    tag = "payouts"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn mark_payout_paid(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<MarkPayoutPaidRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state.services.payouts.mark_paid(id, request.notes).await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}

#[utoipa::path(
    get,
    path = "/api/admin/influencer-payouts",
    params(("influencer_id" = Option<Uuid>, Query, description = "Only this influencer")),
    responses((status = 200, description = "Payouts with influencer names, newest first", body = Vec<PayoutListItem>)),
    tag = "payouts"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_payouts(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    ApiQuery(query): ApiQuery<PayoutListQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    Ok(Json(state.services.payouts.list(query.influencer_id).await?))
}
