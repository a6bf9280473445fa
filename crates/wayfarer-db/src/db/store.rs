//! Store traits the service layer is written against.
//!
//! Each multi-step operation is a single trait method so implementations can
//! make it atomic (a database transaction for PostgreSQL, clone-and-commit for
//! the in-memory store).

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;
use wayfarer_core::models::{
    ActivityPayload, AdminRoleAssignment, AttributionListQuery, AttributionStatus, AuditLogEntry,
    AuditLogQuery, Booking, Enquiry, Influencer, InfluencerAnalytics, InfluencerPayout,
    InfluencerRequest, Lead, LeadActivity, LeadAggregates, LeadChange, LeadFilter, LegalDocument,
    LegalDocumentType, NewAttribution, NewEnquiry, NewInfluencer, NewLead, PayoutListItem,
    PayoutSettlement, ReferralAttribution, RequestStatus, SubmitInfluencerRequest,
};
use wayfarer_core::{AppError, Role};

/// Everything a lead conversion writes, applied all-or-nothing.
#[derive(Debug, Clone)]
pub struct ConversionPlan {
    pub lead_id: Uuid,
    /// Version the caller read; the conversion fails with a conflict if it moved
    pub expected_version: i64,
    pub booking: Booking,
    /// Booking-sourced attribution earned by the conversion, if any
    pub attribution: Option<NewAttribution>,
    pub actor: String,
    /// Audit row written in the same transaction
    pub audit: AuditLogEntry,
}

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Newest first, capped at `limit`.
    async fn list_leads(&self, filter: &LeadFilter, limit: i64) -> Result<Vec<Lead>, AppError>;

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError>;

    /// Activities of a lead, newest first.
    async fn list_activities(&self, lead_id: Uuid) -> Result<Vec<LeadActivity>, AppError>;

    /// Inserts the lead together with its "Lead created" note and, when the
    /// lead was referred, its intake attribution.
    async fn create_lead(
        &self,
        lead: NewLead,
        attribution: Option<NewAttribution>,
        actor: &str,
    ) -> Result<Lead, AppError>;

    /// Writes `change.lead` if the stored version still equals `expected_version`,
    /// appending `change.activities` in the same transaction.
    async fn update_lead(
        &self,
        change: LeadChange,
        expected_version: i64,
        actor: &str,
    ) -> Result<Lead, AppError>;

    async fn append_activity(
        &self,
        lead_id: Uuid,
        payload: ActivityPayload,
        actor: &str,
    ) -> Result<LeadActivity, AppError>;

    /// Creates the booking, marks the lead converted, appends the `converted`
    /// activity, the optional attribution and the audit row atomically.
    async fn convert_lead(&self, plan: ConversionPlan) -> Result<Booking, AppError>;

    async fn lead_aggregates(&self) -> Result<LeadAggregates, AppError>;
}

#[async_trait]
pub trait EnquiryStore: Send + Sync {
    /// Inserts the enquiry, its lead and the optional enquiry attribution atomically.
    ///
    /// Attributions are only written while their influencer is still active;
    /// one paused in the meantime is skipped. The same holds for every store
    /// method that records an attribution.
    async fn submit_enquiry(
        &self,
        enquiry: NewEnquiry,
        attribution: Option<NewAttribution>,
    ) -> Result<Enquiry, AppError>;

    async fn list_enquiries(&self) -> Result<Vec<Enquiry>, AppError>;

    async fn mark_enquiry_read(&self, id: Uuid, is_read: bool) -> Result<Enquiry, AppError>;
}

#[async_trait]
pub trait ReferralStore: Send + Sync {
    /// Looks up an influencer by its (already normalized) code regardless of status.
    async fn find_influencer_by_code(&self, code: &str) -> Result<Option<Influencer>, AppError>;

    async fn get_influencer(&self, id: Uuid) -> Result<Option<Influencer>, AppError>;

    async fn list_influencers(&self) -> Result<Vec<Influencer>, AppError>;

    /// Fails with `AlreadyExists` when the referral code is taken.
    async fn create_influencer(&self, influencer: NewInfluencer) -> Result<Influencer, AppError>;

    /// Persists every mutable column of `influencer`.
    async fn save_influencer(&self, influencer: &Influencer) -> Result<Influencer, AppError>;

    async fn create_request(
        &self,
        request: SubmitInfluencerRequest,
    ) -> Result<InfluencerRequest, AppError>;

    async fn get_request(&self, id: Uuid) -> Result<Option<InfluencerRequest>, AppError>;

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<InfluencerRequest>, AppError>;

    /// Creates the influencer and flips the pending request to approved.
    /// A request that is no longer pending yields `Conflict`.
    async fn approve_request(
        &self,
        id: Uuid,
        influencer: NewInfluencer,
        reviewer: &str,
    ) -> Result<(InfluencerRequest, Influencer), AppError>;

    async fn reject_request(&self, id: Uuid, reviewer: &str)
        -> Result<InfluencerRequest, AppError>;

    async fn list_attributions(
        &self,
        query: &AttributionListQuery,
    ) -> Result<Vec<ReferralAttribution>, AppError>;

    /// Oldest `tracked` enquiry-sourced attribution of a lead.
    async fn find_enquiry_attribution(
        &self,
        lead_id: Uuid,
    ) -> Result<Option<ReferralAttribution>, AppError>;

    async fn get_attribution(&self, id: Uuid) -> Result<Option<ReferralAttribution>, AppError>;

    /// Moves an attribution from `from` to `to`; `Conflict` if it is no longer at `from`.
    async fn advance_attribution(
        &self,
        id: Uuid,
        from: AttributionStatus,
        to: AttributionStatus,
    ) -> Result<ReferralAttribution, AppError>;

    async fn influencer_analytics(&self, top: i64) -> Result<InfluencerAnalytics, AppError>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    /// Claims the influencer's unclaimed eligible booking attributions created
    /// within the inclusive period and records them as a pending batch.
    async fn create_payout(
        &self,
        influencer_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<InfluencerPayout, AppError>;

    /// Marks the batch paid and flips its claimed attributions still `eligible`.
    async fn mark_payout_paid(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<PayoutSettlement, AppError>;

    async fn get_payout(&self, id: Uuid) -> Result<Option<InfluencerPayout>, AppError>;

    async fn list_payouts(
        &self,
        influencer_id: Option<Uuid>,
    ) -> Result<Vec<PayoutListItem>, AppError>;
}

#[async_trait]
pub trait AuditLogStore: Send + Sync {
    async fn record(&self, entry: AuditLogEntry) -> Result<(), AppError>;

    async fn list_audit_logs(
        &self,
        query: &AuditLogQuery,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError>;
}

#[async_trait]
pub trait AdminRoleStore: Send + Sync {
    async fn find_role_by_user(&self, user_id: &str)
        -> Result<Option<AdminRoleAssignment>, AppError>;

    async fn list_roles(&self) -> Result<Vec<AdminRoleAssignment>, AppError>;

    /// Fails with `AlreadyExists` when the user already holds a role row.
    async fn create_role(&self, user_id: &str, role: Role)
        -> Result<AdminRoleAssignment, AppError>;

    async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        is_active: bool,
    ) -> Result<AdminRoleAssignment, AppError>;

    async fn delete_role(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait LegalDocumentStore: Send + Sync {
    async fn get_document(
        &self,
        document_type: LegalDocumentType,
    ) -> Result<Option<LegalDocument>, AppError>;

    /// Inserts or replaces the document of its type.
    async fn save_document(&self, document: &LegalDocument) -> Result<LegalDocument, AppError>;
}
