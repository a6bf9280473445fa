//! Route configuration and setup

use crate::api_doc::{get_openapi_spec, OPENAPI_JSON_PATH};
use crate::auth::middleware::{admin_middleware, session_middleware};
use crate::handlers;
use crate::state::AppState;
use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, HeaderValue, Method},
    routing::{get, patch, post, put},
    Json, Router,
};
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use wayfarer_core::constants::LEGAL_PDF_MAX_BYTES;

/// Multipart framing allowance on top of the PDF size cap.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Builds the full application router.
///
/// `cors_origins` containing `*` allows any origin without credentials;
/// otherwise the listed origins may send the session cookie.
pub fn setup_routes(
    cors_origins: &[String],
    state: Arc<AppState>,
) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(cors_origins)?;
    let concurrency_limit = state.settings.http_concurrency_limit;
    let body_limit = state
        .settings
        .max_upload_bytes
        .max(LEGAL_PDF_MAX_BYTES + MULTIPART_OVERHEAD_BYTES);

    let session_routes = session_routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        session_middleware,
    ));
    let admin_routes = admin_routes().route_layer(axum::middleware::from_fn_with_state(
        state.clone(),
        admin_middleware,
    ));

    let app = public_routes()
        .merge(session_routes)
        .merge(admin_routes)
        .route(OPENAPI_JSON_PATH, get(|| async { Json(get_openapi_spec()) }))
        .merge(utoipa_rapidoc::RapiDoc::new(OPENAPI_JSON_PATH).path("/docs"))
        .layer(ConcurrencyLimitLayer::new(concurrency_limit))
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(app)
}

fn setup_cors(origins: &[String]) -> Result<CorsLayer, anyhow::Error> {
    let methods = [
        Method::GET,
        Method::POST,
        Method::PUT,
        Method::PATCH,
        Method::DELETE,
        Method::OPTIONS,
    ];

    if origins.iter().any(|o| o == "*") {
        tracing::warn!("CORS configured to allow all origins - session cookies will not be sent");
        return Ok(CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any));
    }

    let origins = origins
        .iter()
        .map(|o| o.parse::<HeaderValue>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

    Ok(CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(methods)
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(handlers::enquiries::REFERRAL_CODE_HEADER),
        ])
        .allow_credentials(true))
}

/// Website-facing routes; no session required.
fn public_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/oauth/google/redirect_url",
            get(handlers::auth::oauth_redirect_url),
        )
        .route("/api/sessions", post(handlers::auth::create_session))
        .route("/api/logout", get(handlers::auth::logout))
        .route("/api/enquiries", post(handlers::enquiries::submit_enquiry))
        .route(
            "/api/influencer/request",
            post(handlers::influencers::submit_request),
        )
        .route(
            "/api/influencer/validate",
            get(handlers::influencers::validate_code),
        )
        .route("/api/legal/{type}", get(handlers::legal::get_document))
        .route("/api/files/{*key}", get(handlers::files::get_file))
}

/// Routes for any signed-in user.
fn session_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users/me", get(handlers::auth::current_user))
        .route("/api/admin/check", get(handlers::auth::admin_check))
}

/// Admin console routes. The middleware admits active admins only; each
/// handler then checks its own permission.
fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .merge(crm_routes())
        .merge(influencer_routes())
        .merge(team_routes())
        .route(
            "/api/admin/enquiries",
            get(handlers::enquiries::list_enquiries),
        )
        .route(
            "/api/admin/enquiries/{id}/read",
            patch(handlers::enquiries::mark_enquiry_read),
        )
        .route(
            "/api/admin/legal/{type}",
            patch(handlers::legal::update_document),
        )
        .route(
            "/api/admin/legal/{type}/upload-pdf",
            post(handlers::legal::upload_pdf)
                .layer(DefaultBodyLimit::max(LEGAL_PDF_MAX_BYTES + MULTIPART_OVERHEAD_BYTES)),
        )
        .route(
            "/api/admin/audit-logs",
            get(handlers::audit_logs::list_audit_logs),
        )
}

fn crm_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin/crm/leads",
            get(handlers::leads::list_leads).post(handlers::leads::create_lead),
        )
        .route(
            "/api/admin/crm/leads/{id}",
            get(handlers::leads::get_lead).put(handlers::leads::update_lead),
        )
        .route(
            "/api/admin/crm/leads/{id}/activities",
            post(handlers::leads::add_activity),
        )
        .route(
            "/api/admin/crm/leads/{id}/convert",
            post(handlers::leads::convert_lead),
        )
        .route("/api/admin/crm/dashboard", get(handlers::leads::dashboard))
}

fn influencer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin/influencer-requests",
            get(handlers::influencers::list_requests),
        )
        .route(
            "/api/admin/influencer-requests/{id}",
            patch(handlers::influencers::review_request),
        )
        .route(
            "/api/admin/influencers",
            get(handlers::influencers::list_influencers)
                .post(handlers::influencers::create_influencer),
        )
        .route(
            "/api/admin/influencers/{id}",
            patch(handlers::influencers::update_influencer),
        )
        .route(
            "/api/admin/influencer-analytics",
            get(handlers::influencers::analytics),
        )
        .route(
            "/api/admin/referral-attributions",
            get(handlers::influencers::list_attributions),
        )
        .route(
            "/api/admin/referral-attributions/{id}/approve",
            patch(handlers::influencers::approve_attribution),
        )
        .route(
            "/api/admin/influencer-payouts",
            get(handlers::payouts::list_payouts),
        )
        .route(
            "/api/admin/influencer-payouts/create",
            post(handlers::payouts::create_payout),
        )
        .route(
            "/api/admin/influencer-payouts/{id}/mark-paid",
            patch(handlers::payouts::mark_payout_paid),
        )
}

fn team_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/admin/team",
            get(handlers::team::list_team).post(handlers::team::add_member),
        )
        .route(
            "/api/admin/team/{id}",
            put(handlers::team::update_member).delete(handlers::team::remove_member),
        )
}
