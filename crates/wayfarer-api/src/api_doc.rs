//! OpenAPI documentation, served as JSON at [`OPENAPI_JSON_PATH`] and through
//! RapiDoc at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;
use wayfarer_core::models;

pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Wayfarer CRM API",
        version = "0.1.0",
        description = "Travel agency back office: lead pipeline, enquiries, bookings, influencer referrals and payouts, team roles and legal pages. Admin routes need a session cookie (or bearer token) and an active admin role."
    ),
    paths(
        // Auth
        handlers::auth::oauth_redirect_url,
        handlers::auth::create_session,
        handlers::auth::current_user,
        handlers::auth::logout,
        handlers::auth::admin_check,
        handlers::health::health,
        // Leads
        handlers::leads::list_leads,
        handlers::leads::get_lead,
        handlers::leads::create_lead,
        handlers::leads::update_lead,
        handlers::leads::add_activity,
        handlers::leads::convert_lead,
        handlers::leads::dashboard,
        // Enquiries
        handlers::enquiries::submit_enquiry,
        handlers::enquiries::list_enquiries,
        handlers::enquiries::mark_enquiry_read,
        // Influencers
        handlers::influencers::submit_request,
        handlers::influencers::validate_code,
        handlers::influencers::list_requests,
        handlers::influencers::review_request,
        handlers::influencers::list_influencers,
        handlers::influencers::create_influencer,
        handlers::influencers::update_influencer,
        handlers::influencers::analytics,
        handlers::influencers::list_attributions,
        handlers::influencers::approve_attribution,
        // Payouts
        handlers::payouts::create_payout,
        handlers::payouts::mark_payout_paid,
        handlers::payouts::list_payouts,
        // Team and audit
        handlers::team::list_team,
        handlers::team::add_member,
        handlers::team::update_member,
        handlers::team::remove_member,
        handlers::audit_logs::list_audit_logs,
        // Legal and files
        handlers::legal::get_document,
        handlers::legal::update_document,
        handlers::legal::upload_pdf,
        handlers::files::get_file,
    ),
    components(schemas(
        error::ErrorResponse,
        handlers::auth::RedirectUrl,
        handlers::auth::CreateSessionRequest,
        handlers::auth::SuccessResponse,
        handlers::health::HealthResponse,
        crate::auth::User,
        models::Lead,
        models::LeadStage,
        models::LeadDetail,
        models::CreateLeadRequest,
        models::UpdateLeadRequest,
        models::CreateActivityRequest,
        models::ActivityType,
        models::CrmDashboard,
        models::ConvertLeadRequest,
        models::ConversionReceipt,
        models::Enquiry,
        models::SubmitEnquiryRequest,
        models::EnquiryReceipt,
        models::MarkEnquiryRead,
        models::InfluencerRequest,
        models::SubmitInfluencerRequest,
        models::ReviewInfluencerRequest,
        models::Influencer,
        models::CreateInfluencer,
        models::UpdateInfluencer,
        models::InfluencerCreated,
        models::ReferralCodeCheck,
        models::InfluencerAnalytics,
        models::ReferralAttribution,
        models::InfluencerPayout,
        models::PayoutListItem,
        models::CreatePayoutRequest,
        models::MarkPayoutPaidRequest,
        models::PayoutSettlement,
        models::AdminRoleAssignment,
        models::CreateAdminRole,
        models::UpdateAdminRole,
        models::AdminCheck,
        models::AuditLogEntry,
        models::LegalDocument,
        models::LegalDocumentType,
        models::UpdateLegalDocument,
        models::LegalPdfUploaded,
    )),
    tags(
        (name = "auth", description = "Sign-in, session and admin check"),
        (name = "health", description = "Liveness"),
        (name = "leads", description = "CRM pipeline, activities and conversion"),
        (name = "enquiries", description = "Website enquiries"),
        (name = "influencers", description = "Influencer program and referral attributions"),
        (name = "payouts", description = "Commission payout batches"),
        (name = "team", description = "Admin role assignments (founder only)"),
        (name = "audit", description = "Audit trail (founder only)"),
        (name = "legal", description = "Legal pages and PDFs"),
        (name = "files", description = "Stored files"),
    )
)]
pub struct ApiDoc;
