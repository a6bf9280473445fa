//! Lead pipeline operations: listing, detail, create, update, manual activities
//! and the CRM dashboard.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::constants::LEAD_LIST_LIMIT;
use wayfarer_core::models::{
    entity, ActivityPayload, AuditAction, AuditEvent, Audited, CreateActivityRequest,
    CreateLeadRequest, CrmDashboard, Lead, LeadActivity, LeadDetail, LeadFilter, NewAttribution,
    NewLead, UpdateLeadRequest,
};
use wayfarer_core::{AppError, FollowupCounts};
use wayfarer_db::{LeadStore, ReferralStore};

use super::influencers::resolve_active_referral;

#[derive(Clone)]
pub struct LeadService {
    leads: Arc<dyn LeadStore>,
    referrals: Arc<dyn ReferralStore>,
}

impl LeadService {
    pub fn new(leads: Arc<dyn LeadStore>, referrals: Arc<dyn ReferralStore>) -> Self {
        Self { leads, referrals }
    }

    pub async fn list(&self, filter: &LeadFilter) -> Result<Vec<Lead>, AppError> {
        self.leads.list_leads(filter, LEAD_LIST_LIMIT).await
    }

    async fn require_lead(&self, id: Uuid) -> Result<Lead, AppError> {
        self.leads
            .get_lead(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }

    pub async fn detail(&self, id: Uuid) -> Result<LeadDetail, AppError> {
        let lead = self.require_lead(id).await?;
        let activities = self.leads.list_activities(id).await?;
        Ok(LeadDetail { lead, activities })
    }

    /// Opens a lead by hand. A referral code of an active influencer is
    /// tracked the same way as on a website enquiry.
    pub async fn create(
        &self,
        request: CreateLeadRequest,
        actor: &str,
    ) -> Result<Audited<Lead>, AppError> {
        let new_lead = NewLead::from(request);
        let attribution = match &new_lead.referral_code {
            Some(code) => resolve_active_referral(self.referrals.as_ref(), code)
                .await?
                .map(|influencer| NewAttribution::enquiry(influencer.referral_code, influencer.id)),
            None => None,
        };
        let lead = self.leads.create_lead(new_lead, attribution, actor).await?;
        let changes = serde_json::to_value(&lead)?;
        Ok(Audited::new(
            lead.clone(),
            AuditEvent::new(AuditAction::Create, entity::LEAD, lead.id, changes),
        ))
    }

    /// Partial update with stage/followup activities and a version check.
    ///
    /// A `version` in the request must match the stored one; the store then
    /// writes with compare-and-swap on the version read here, so a concurrent
    /// writer turns into a conflict rather than a silent overwrite.
    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateLeadRequest,
        actor: &str,
    ) -> Result<Audited<Lead>, AppError> {
        let current = self.require_lead(id).await?;
        if let Some(expected) = request.version {
            if expected != current.version {
                return Err(AppError::Conflict(format!(
                    "Lead {} is at version {}, not {}",
                    id, current.version, expected
                )));
            }
        }

        let change = current.apply_update(&request, Utc::now());
        let lead = self
            .leads
            .update_lead(change, current.version, actor)
            .await?;
        let changes = serde_json::to_value(&request)?;
        Ok(Audited::new(
            lead,
            AuditEvent::new(AuditAction::Update, entity::LEAD, id, changes),
        ))
    }

    /// Appends a hand-logged activity. System-only kinds are rejected.
    pub async fn add_activity(
        &self,
        lead_id: Uuid,
        request: CreateActivityRequest,
        actor: &str,
    ) -> Result<Audited<LeadActivity>, AppError> {
        if request.activity_type.is_system() {
            return Err(AppError::Validation(format!(
                "type: {} activities are recorded by the system",
                request.activity_type
            )));
        }
        let payload = ActivityPayload::from_parts(request.activity_type, request.payload)
            .map_err(|e| AppError::Validation(format!("payload: {}", e)))?;

        self.require_lead(lead_id).await?;
        let activity = self.leads.append_activity(lead_id, payload, actor).await?;
        let changes = serde_json::json!({
            "lead_id": lead_id,
            "type": activity.payload.activity_type(),
            "payload": activity.payload.payload_json(),
        });
        Ok(Audited::new(
            activity.clone(),
            AuditEvent::new(
                AuditAction::Create,
                entity::LEAD_ACTIVITY,
                activity.id,
                changes,
            ),
        ))
    }

    pub async fn dashboard(&self, now: DateTime<Utc>) -> Result<CrmDashboard, AppError> {
        let aggregates = self.leads.lead_aggregates().await?;
        Ok(CrmDashboard {
            stages: aggregates.stages,
            followups: FollowupCounts::tally(aggregates.followups, now),
            sources: aggregates.sources,
            assignees: aggregates.assignees,
        })
    }
}
