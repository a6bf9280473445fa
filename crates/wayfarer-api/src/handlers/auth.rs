//! Sign-in flow against the identity service, the current user, and the
//! admin check used by the console.

use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap},
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::middleware::session_token;
use crate::auth::{CurrentUser, User};
use crate::error::{ApiJson, HttpAppError};
use crate::state::AppState;
use wayfarer_core::models::AdminCheck;
use wayfarer_core::AppError;

/// Session cookie lifetime: 60 days.
const SESSION_MAX_AGE_SECS: i64 = 60 * 24 * 60 * 60;

#[derive(Debug, Serialize, ToSchema)]
pub struct RedirectUrl {
    pub redirect_url: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: bool,
}

fn session_cookie(name: &str, value: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; Secure; SameSite=None",
        name, value, max_age_secs
    )
}

#[utoipa::path(
    get,
    path = "/api/oauth/google/redirect_url",
    responses(
        (status = 200, description = "Google sign-in URL", body = RedirectUrl),
        (status = 502, description = "Identity service unavailable")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state))]
pub async fn oauth_redirect_url(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, HttpAppError> {
    let redirect_url = state.identity.oauth_redirect_url().await?;
    Ok(Json(RedirectUrl { redirect_url }))
}

/// Exchange an OAuth authorization code for a session cookie
#[utoipa::path(
    post,
    path = "/api/sessions",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session cookie set", body = SuccessResponse),
        (status = 400, description = "No authorization code"),
        (status = 401, description = "Code rejected by the identity service")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, request))]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<CreateSessionRequest>,
) -> Result<impl IntoResponse, HttpAppError> {
    let code = request
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No authorization code provided".to_string()))?;
    let token = state.identity.exchange_code(&code).await?;

    let cookie = session_cookie(
        &state.settings.session_cookie_name,
        &token,
        SESSION_MAX_AGE_SECS,
    );
    Ok(([(SET_COOKIE, cookie)], Json(SuccessResponse { success: true })))
}

#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Signed-in user", body = User),
        (status = 401, description = "Not signed in")
    ),
    tag = "auth"
)]
pub async fn current_user(CurrentUser(user): CurrentUser) -> impl IntoResponse {
    Json(user)
}

/// Revoke the session and clear the cookie
#[utoipa::path(
    get,
    path = "/api/logout",
    responses((status = 200, description = "Signed out", body = SuccessResponse)),
    tag = "auth"
)]
#[tracing::instrument(skip(state, headers))]
pub async fn logout(State(state): State<Arc<AppState>>, headers: HeaderMap) -> impl IntoResponse {
    let cookie_name = &state.settings.session_cookie_name;
    if let Some(token) = session_token(&headers, cookie_name) {
        if let Err(e) = state.identity.revoke_session(&token).await {
            tracing::warn!(error = %e, "Failed to revoke session; clearing cookie anyway");
        }
    }
    (
        [(SET_COOKIE, session_cookie(cookie_name, "", 0))],
        Json(SuccessResponse { success: true }),
    )
}

/// Whether the signed-in user may use the admin console, and as what
#[utoipa::path(
    get,
    path = "/api/admin/check",
    responses(
        (status = 200, description = "Admin status", body = AdminCheck),
        (status = 401, description = "Not signed in")
    ),
    tag = "auth"
)]
#[tracing::instrument(skip(state, user))]
pub async fn admin_check(
    State(state): State<Arc<AppState>>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, HttpAppError> {
    Ok(Json(state.services.team.check(&user.id).await?))
}
