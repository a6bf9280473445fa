//! Public enquiry form and the admin enquiry inbox.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use std::sync::Arc;
use uuid::Uuid;

use crate::auth::AdminContext;
use crate::error::{ApiJson, ApiQuery, HttpAppError, ValidatedJson};
use crate::state::AppState;
use wayfarer_core::models::{
    Enquiry, EnquiryReceipt, EnquiryReferral, MarkEnquiryRead, SubmitEnquiryRequest,
};
use wayfarer_core::{Action, Resource};

pub const REFERRAL_CODE_HEADER: &str = "x-referral-code";

/// Submit an enquiry from the website
///
/// Opens a `New` lead. A referral code from `?ref=` or the `X-Referral-Code`
/// header that belongs to an active influencer is recorded as an attribution.
#[utoipa::path(
    post,
    path = "/api/enquiries",
    params(
        ("ref" = Option<String>, Query, description = "Influencer referral code"),
        ("X-Referral-Code" = Option<String>, Header, description = "Referral code when not in the query")
    ),
    request_body = SubmitEnquiryRequest,
    responses(
        (status = 201, description = "Enquiry stored", body = EnquiryReceipt),
        (status = 400, description = "Validation failed")
    ),
    tag = "enquiries"
)]
#[tracing::instrument(skip(state, headers, request))]
pub async fn submit_enquiry(
    State(state): State<Arc<AppState>>,
    ApiQuery(referral): ApiQuery<EnquiryReferral>,
    headers: HeaderMap,
    ValidatedJson(request): ValidatedJson<SubmitEnquiryRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let referral_code = referral.referral_code.or_else(|| {
        headers
            .get(REFERRAL_CODE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    });
    let enquiry = state
        .services
        .enquiries
        .submit(request, referral_code)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(EnquiryReceipt {
            id: enquiry.id,
            lead_id: enquiry.lead_id,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/api/admin/enquiries",
    responses((status = 200, description = "Enquiries, newest first", body = Vec<Enquiry>)),
    tag = "enquiries"
)]
#[tracing::instrument(skip(state, ctx), fields(role = %ctx.role))]
pub async fn list_enquiries(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Read)?;
    Ok(Json(state.services.enquiries.list().await?))
}

#[utoipa::path(
    patch,
    path = "/api/admin/enquiries/{id}/read",
    params(("id" = Uuid, Path, description = "Enquiry id")),
    request_body = MarkEnquiryRead,
    responses(
        (status = 200, description = "Updated enquiry", body = Enquiry),
        (status = 404, description = "Enquiry not found")
    ),
    tag = "enquiries"
)]
#[tracing::instrument(skip(state, ctx, request), fields(role = %ctx.role))]
pub async fn mark_enquiry_read(
    State(state): State<Arc<AppState>>,
    ctx: AdminContext,
    Path(id): Path<Uuid>,
    ApiJson(request): ApiJson<MarkEnquiryRead>,
) -> Result<impl IntoResponse, HttpAppError> {
    ctx.require(Resource::Leads, Action::Update)?;
    let audited = state
        .services
        .enquiries
        .mark_read(id, request.is_read)
        .await?;
    Ok(Json(state.audit.commit(ctx.actor(), audited).await))
}
