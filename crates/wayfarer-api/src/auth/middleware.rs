use crate::auth::models::{AdminContext, CurrentUser, User};
use crate::error::HttpAppError;
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use std::sync::Arc;
use wayfarer_core::AppError;

/// Session token from the session cookie, falling back to `Authorization: Bearer`.
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(cookie_name) {
        let value = cookie.value().trim();
        if !value.is_empty() {
            return Some(value.to_string());
        }
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(String::from)
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let token = session_token(headers, &state.settings.session_cookie_name)
        .ok_or_else(|| AppError::Unauthorized("Missing session".to_string()))?;

    state
        .identity
        .current_user(&token)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid or expired session".to_string()))
}

/// Requires a signed-in user and exposes it as [`CurrentUser`].
pub async fn session_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Requires a signed-in user holding an active admin role.
///
/// Permission checks for the specific route happen in the handler through
/// [`AdminContext::require`], before any data access.
pub async fn admin_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, HttpAppError> {
    let user = authenticate(&state, request.headers()).await?;

    let assignment = state
        .roles
        .find_role_by_user(&user.id)
        .await?
        .filter(|assignment| assignment.is_active);

    let Some(assignment) = assignment else {
        tracing::debug!(user_id = %user.id, "Rejected caller without an active admin role");
        return Err(AppError::PermissionDenied("Admin access required".to_string()).into());
    };

    request.extensions_mut().insert(AdminContext::new(
        user,
        assignment.role,
        state.policy.clone(),
    ));

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_cookie_wins_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; wayfarer_session=abc"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(
            session_token(&headers, "wayfarer_session").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_bearer_fallback_and_missing() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers, "wayfarer_session"), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(
            session_token(&headers, "wayfarer_session").as_deref(),
            Some("xyz")
        );
    }
}
