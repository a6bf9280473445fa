//! In-memory implementation of every store trait.
//!
//! Each mutating call works on a clone of the whole state and swaps it in only
//! when every step succeeded, which gives the same all-or-nothing behavior as
//! the PostgreSQL transactions.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use uuid::Uuid;
use wayfarer_core::models::{
    is_payable_in_period, ActivityPayload, AdminRoleAssignment, AssigneeCount,
    AttributionListQuery, AttributionSource, AttributionStatus, AuditLogEntry, AuditLogQuery,
    Booking, Enquiry, Influencer, InfluencerAnalytics, InfluencerPayout, InfluencerPerformance,
    InfluencerRequest, InfluencerStatus, Lead, LeadActivity, LeadAggregates, LeadChange,
    LeadFilter, LeadStage, LegalDocument, LegalDocumentType, NewAttribution, NewEnquiry,
    NewInfluencer, NewLead, PayoutListItem, PayoutSettlement, PayoutStatus, PayoutTotals,
    ReferralAttribution, RequestStatus, SourceCount, StageCount, SubmitInfluencerRequest,
};
use wayfarer_core::{AppError, Role};

use crate::db::crm::lead::LEAD_CREATED_NOTE;
use crate::db::crm::ENQUIRY_ACTOR;
use crate::db::store::{
    AdminRoleStore, AuditLogStore, ConversionPlan, EnquiryStore, LeadStore, LegalDocumentStore,
    PayoutStore, ReferralStore,
};

#[derive(Debug, Clone, Default)]
struct MemoryState {
    leads: Vec<Lead>,
    activities: Vec<LeadActivity>,
    enquiries: Vec<Enquiry>,
    bookings: Vec<Booking>,
    influencers: Vec<Influencer>,
    requests: Vec<InfluencerRequest>,
    attributions: Vec<ReferralAttribution>,
    payouts: Vec<InfluencerPayout>,
    audit_logs: Vec<AuditLogEntry>,
    roles: Vec<AdminRoleAssignment>,
    legal: HashMap<LegalDocumentType, LegalDocument>,
}

impl MemoryState {
    fn lead_mut(&mut self, id: Uuid) -> Result<&mut Lead, AppError> {
        self.leads
            .iter_mut()
            .find(|l| l.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", id)))
    }

    fn push_activity(&mut self, lead_id: Uuid, payload: ActivityPayload, actor: &str) -> LeadActivity {
        let activity = LeadActivity {
            id: Uuid::new_v4(),
            lead_id,
            payload,
            actor: actor.to_string(),
            created_at: Utc::now(),
        };
        self.activities.push(activity.clone());
        activity
    }

    fn push_lead(&mut self, lead: NewLead, actor: &str) -> Lead {
        let lead = lead.into_lead(Uuid::new_v4(), Utc::now());
        self.leads.push(lead.clone());
        self.push_activity(lead.id, ActivityPayload::note(LEAD_CREATED_NOTE), actor);
        lead
    }

    /// Records the attribution unless its influencer is missing or paused.
    fn push_attribution(
        &mut self,
        attribution: NewAttribution,
        lead_id: Uuid,
    ) -> Option<ReferralAttribution> {
        let active = self
            .influencers
            .iter()
            .any(|i| i.id == attribution.influencer_id && i.status == InfluencerStatus::Active);
        if !active {
            return None;
        }
        let row = attribution.into_attribution(Uuid::new_v4(), lead_id, Utc::now());
        self.attributions.push(row.clone());
        Some(row)
    }

    fn push_influencer(&mut self, influencer: NewInfluencer) -> Result<Influencer, AppError> {
        if self
            .influencers
            .iter()
            .any(|i| i.referral_code == influencer.referral_code)
        {
            return Err(AppError::AlreadyExists(
                "Duplicate value violates influencers_referral_code_key".to_string(),
            ));
        }
        let influencer = influencer.into_influencer(Uuid::new_v4(), Utc::now());
        self.influencers.push(influencer.clone());
        Ok(influencer)
    }

    fn pending_request_mut(&mut self, id: Uuid) -> Result<&mut InfluencerRequest, AppError> {
        let request = self
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| AppError::NotFound(format!("Influencer request {} not found", id)))?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Influencer request {} was already reviewed",
                id
            )));
        }
        Ok(request)
    }
}

/// Store backed by process memory; used by tests and local demos.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: Mutex<MemoryState>,
    fail_conversion_after_booking: AtomicBool,
    fail_audit_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next conversions fail right after the booking row is written.
    pub fn set_fail_conversion_after_booking(&self, fail: bool) {
        self.fail_conversion_after_booking
            .store(fail, Ordering::SeqCst);
    }

    /// Makes standalone audit writes fail.
    pub fn set_fail_audit_writes(&self, fail: bool) {
        self.fail_audit_writes.store(fail, Ordering::SeqCst);
    }

    pub fn bookings(&self) -> Result<Vec<Booking>, AppError> {
        self.read(|state| state.bookings.clone())
    }

    pub fn attributions(&self) -> Result<Vec<ReferralAttribution>, AppError> {
        self.read(|state| state.attributions.clone())
    }

    pub fn audit_entries(&self) -> Result<Vec<AuditLogEntry>, AppError> {
        self.read(|state| state.audit_logs.clone())
    }

    fn read<R>(&self, f: impl FnOnce(&MemoryState) -> R) -> Result<R, AppError> {
        let guard = self
            .state
            .lock()
            .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))?;
        Ok(f(&guard))
    }

    /// Applies `f` to a copy of the state and commits it only on success.
    fn transact<R>(
        &self,
        f: impl FnOnce(&mut MemoryState) -> Result<R, AppError>,
    ) -> Result<R, AppError> {
        let mut guard = self
            .state
            .lock()
            .map_err(|_| AppError::Internal("In-memory store lock poisoned".to_string()))?;
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }
}

#[async_trait]
impl LeadStore for InMemoryStore {
    async fn list_leads(&self, filter: &LeadFilter, limit: i64) -> Result<Vec<Lead>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        self.read(|state| {
            state
                .leads
                .iter()
                .rev()
                .filter(|lead| filter.matches(lead))
                .take(limit)
                .cloned()
                .collect()
        })
    }

    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        self.read(|state| state.leads.iter().find(|l| l.id == id).cloned())
    }

    async fn list_activities(&self, lead_id: Uuid) -> Result<Vec<LeadActivity>, AppError> {
        self.read(|state| {
            state
                .activities
                .iter()
                .rev()
                .filter(|a| a.lead_id == lead_id)
                .cloned()
                .collect()
        })
    }

    async fn create_lead(
        &self,
        lead: NewLead,
        attribution: Option<NewAttribution>,
        actor: &str,
    ) -> Result<Lead, AppError> {
        self.transact(|state| {
            let lead = state.push_lead(lead, actor);
            if let Some(attribution) = attribution {
                state.push_attribution(attribution, lead.id);
            }
            Ok(lead)
        })
    }

    async fn update_lead(
        &self,
        change: LeadChange,
        expected_version: i64,
        actor: &str,
    ) -> Result<Lead, AppError> {
        self.transact(|state| {
            let LeadChange { lead, activities } = change;
            let stored = state.lead_mut(lead.id)?;
            if stored.version != expected_version {
                return Err(AppError::Conflict(format!(
                    "Lead {} was modified by someone else; reload and retry",
                    lead.id
                )));
            }
            *stored = lead.clone();
            for payload in activities {
                state.push_activity(lead.id, payload, actor);
            }
            Ok(lead)
        })
    }

    async fn append_activity(
        &self,
        lead_id: Uuid,
        payload: ActivityPayload,
        actor: &str,
    ) -> Result<LeadActivity, AppError> {
        self.transact(|state| {
            state.lead_mut(lead_id)?;
            Ok(state.push_activity(lead_id, payload, actor))
        })
    }

    async fn convert_lead(&self, plan: ConversionPlan) -> Result<Booking, AppError> {
        let fail_after_booking = self.fail_conversion_after_booking.load(Ordering::SeqCst);
        self.transact(|state| {
            let ConversionPlan {
                lead_id,
                expected_version,
                booking,
                attribution,
                actor,
                audit,
            } = plan;

            state.lead_mut(lead_id)?;
            if state
                .bookings
                .iter()
                .any(|b| b.booking_code == booking.booking_code)
            {
                return Err(AppError::AlreadyExists(
                    "Duplicate value violates bookings_booking_code_key".to_string(),
                ));
            }
            if state.bookings.iter().any(|b| b.lead_id == lead_id) {
                return Err(AppError::AlreadyExists(
                    "Duplicate value violates idx_bookings_lead".to_string(),
                ));
            }
            state.bookings.push(booking.clone());

            if fail_after_booking {
                return Err(AppError::Internal(
                    "Injected failure after booking insert".to_string(),
                ));
            }

            let lead = state.lead_mut(lead_id)?;
            if lead.version != expected_version || lead.booking_id.is_some() {
                return Err(AppError::Conflict(format!(
                    "Lead {} changed or was already converted",
                    lead_id
                )));
            }
            lead.stage = LeadStage::Converted;
            lead.booking_id = Some(booking.id);
            lead.version += 1;
            lead.updated_at = Utc::now();

            state.push_activity(
                lead_id,
                ActivityPayload::Converted {
                    booking_code: booking.booking_code.clone(),
                },
                &actor,
            );
            if let Some(attribution) = attribution {
                state.push_attribution(attribution, lead_id);
            }
            state.audit_logs.push(audit);
            Ok(booking)
        })
    }

    async fn lead_aggregates(&self) -> Result<LeadAggregates, AppError> {
        self.read(|state| {
            let stages = LeadStage::ALL
                .into_iter()
                .filter_map(|stage| {
                    let count = state.leads.iter().filter(|l| l.stage == stage).count() as i64;
                    (count > 0).then_some(StageCount { stage, count })
                })
                .collect();

            let mut by_source: HashMap<&str, i64> = HashMap::new();
            let mut by_assignee: HashMap<&str, i64> = HashMap::new();
            for lead in &state.leads {
                *by_source.entry(lead.source.as_str()).or_default() += 1;
                if let Some(assignee) = lead.assigned_to.as_deref() {
                    if !lead.stage.is_terminal() {
                        *by_assignee.entry(assignee).or_default() += 1;
                    }
                }
            }

            let mut sources: Vec<SourceCount> = by_source
                .into_iter()
                .map(|(source, count)| SourceCount {
                    source: source.to_string(),
                    count,
                })
                .collect();
            sources.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.source.cmp(&b.source)));

            let mut assignees: Vec<AssigneeCount> = by_assignee
                .into_iter()
                .map(|(assigned_to, count)| AssigneeCount {
                    assigned_to: assigned_to.to_string(),
                    count,
                })
                .collect();
            assignees.sort_by(|a, b| {
                b.count
                    .cmp(&a.count)
                    .then_with(|| a.assigned_to.cmp(&b.assigned_to))
            });

            LeadAggregates {
                stages,
                sources,
                assignees,
                followups: state.leads.iter().filter_map(|l| l.next_followup_at).collect(),
            }
        })
    }
}

#[async_trait]
impl EnquiryStore for InMemoryStore {
    async fn submit_enquiry(
        &self,
        enquiry: NewEnquiry,
        attribution: Option<NewAttribution>,
    ) -> Result<Enquiry, AppError> {
        self.transact(|state| {
            let lead = state.push_lead(enquiry.lead(), ENQUIRY_ACTOR);
            let stored = enquiry.into_enquiry(Uuid::new_v4(), lead.id, Utc::now());
            state.enquiries.push(stored.clone());
            if let Some(attribution) = attribution {
                state.push_attribution(attribution, lead.id);
            }
            Ok(stored)
        })
    }

    async fn list_enquiries(&self) -> Result<Vec<Enquiry>, AppError> {
        self.read(|state| state.enquiries.iter().rev().cloned().collect())
    }

    async fn mark_enquiry_read(&self, id: Uuid, is_read: bool) -> Result<Enquiry, AppError> {
        self.transact(|state| {
            let enquiry = state
                .enquiries
                .iter_mut()
                .find(|e| e.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Enquiry {} not found", id)))?;
            enquiry.is_read = is_read;
            Ok(enquiry.clone())
        })
    }
}

#[async_trait]
impl ReferralStore for InMemoryStore {
    async fn find_influencer_by_code(&self, code: &str) -> Result<Option<Influencer>, AppError> {
        self.read(|state| {
            state
                .influencers
                .iter()
                .find(|i| i.referral_code == code)
                .cloned()
        })
    }

    async fn get_influencer(&self, id: Uuid) -> Result<Option<Influencer>, AppError> {
        self.read(|state| state.influencers.iter().find(|i| i.id == id).cloned())
    }

    async fn list_influencers(&self) -> Result<Vec<Influencer>, AppError> {
        self.read(|state| state.influencers.iter().rev().cloned().collect())
    }

    async fn create_influencer(&self, influencer: NewInfluencer) -> Result<Influencer, AppError> {
        self.transact(|state| state.push_influencer(influencer))
    }

    async fn save_influencer(&self, influencer: &Influencer) -> Result<Influencer, AppError> {
        self.transact(|state| {
            let stored = state
                .influencers
                .iter_mut()
                .find(|i| i.id == influencer.id)
                .ok_or_else(|| {
                    AppError::NotFound(format!("Influencer {} not found", influencer.id))
                })?;
            let email = stored.email.clone();
            let referral_code = stored.referral_code.clone();
            let created_at = stored.created_at;
            *stored = Influencer {
                email,
                referral_code,
                created_at,
                ..influencer.clone()
            };
            Ok(stored.clone())
        })
    }

    async fn create_request(
        &self,
        request: SubmitInfluencerRequest,
    ) -> Result<InfluencerRequest, AppError> {
        self.transact(|state| {
            let now = Utc::now();
            let stored = InfluencerRequest {
                id: Uuid::new_v4(),
                full_name: request.full_name,
                email: request.email,
                phone: request.phone,
                instagram_handle: request.instagram_handle,
                youtube_channel: request.youtube_channel,
                audience_size: request.audience_size,
                niche: request.niche,
                preferred_destinations: request.preferred_destinations,
                payout_preference: request.payout_preference,
                payout_details: request.payout_details,
                message: request.message,
                status: RequestStatus::Pending,
                influencer_id: None,
                reviewed_by: None,
                reviewed_at: None,
                created_at: now,
                updated_at: now,
            };
            state.requests.push(stored.clone());
            Ok(stored)
        })
    }

    async fn get_request(&self, id: Uuid) -> Result<Option<InfluencerRequest>, AppError> {
        self.read(|state| state.requests.iter().find(|r| r.id == id).cloned())
    }

    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<InfluencerRequest>, AppError> {
        self.read(|state| {
            state
                .requests
                .iter()
                .rev()
                .filter(|r| status.is_none_or(|s| r.status == s))
                .cloned()
                .collect()
        })
    }

    async fn approve_request(
        &self,
        id: Uuid,
        influencer: NewInfluencer,
        reviewer: &str,
    ) -> Result<(InfluencerRequest, Influencer), AppError> {
        self.transact(|state| {
            state.pending_request_mut(id)?;
            let influencer = state.push_influencer(influencer)?;
            let now = Utc::now();
            let request = state.pending_request_mut(id)?;
            request.status = RequestStatus::Approved;
            request.influencer_id = Some(influencer.id);
            request.reviewed_by = Some(reviewer.to_string());
            request.reviewed_at = Some(now);
            request.updated_at = now;
            Ok((request.clone(), influencer))
        })
    }

    async fn reject_request(
        &self,
        id: Uuid,
        reviewer: &str,
    ) -> Result<InfluencerRequest, AppError> {
        self.transact(|state| {
            let now = Utc::now();
            let request = state.pending_request_mut(id)?;
            request.status = RequestStatus::Rejected;
            request.reviewed_by = Some(reviewer.to_string());
            request.reviewed_at = Some(now);
            request.updated_at = now;
            Ok(request.clone())
        })
    }

    async fn list_attributions(
        &self,
        query: &AttributionListQuery,
    ) -> Result<Vec<ReferralAttribution>, AppError> {
        self.read(|state| {
            state
                .attributions
                .iter()
                .rev()
                .filter(|a| query.influencer_id.is_none_or(|id| a.influencer_id == id))
                .filter(|a| query.status.is_none_or(|s| a.status == s))
                .cloned()
                .collect()
        })
    }

    async fn find_enquiry_attribution(
        &self,
        lead_id: Uuid,
    ) -> Result<Option<ReferralAttribution>, AppError> {
        self.read(|state| {
            state
                .attributions
                .iter()
                .find(|a| {
                    a.lead_id == lead_id
                        && a.source == AttributionSource::Enquiry
                        && a.status == AttributionStatus::Tracked
                })
                .cloned()
        })
    }

    async fn get_attribution(&self, id: Uuid) -> Result<Option<ReferralAttribution>, AppError> {
        self.read(|state| state.attributions.iter().find(|a| a.id == id).cloned())
    }

    async fn advance_attribution(
        &self,
        id: Uuid,
        from: AttributionStatus,
        to: AttributionStatus,
    ) -> Result<ReferralAttribution, AppError> {
        if !from.can_advance_to(to) {
            return Err(AppError::Conflict(format!(
                "Attribution status cannot move from {:?} to {:?}",
                from, to
            )));
        }
        self.transact(|state| {
            let attribution = state
                .attributions
                .iter_mut()
                .find(|a| a.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Attribution {} not found", id)))?;
            if attribution.status != from {
                return Err(AppError::Conflict(format!(
                    "Attribution {} is no longer {:?}",
                    id, from
                )));
            }
            attribution.status = to;
            attribution.updated_at = Utc::now();
            Ok(attribution.clone())
        })
    }

    async fn influencer_analytics(&self, top: i64) -> Result<InfluencerAnalytics, AppError> {
        let top = usize::try_from(top).unwrap_or(0);
        self.read(|state| {
            let is_booking = |a: &&ReferralAttribution| a.source == AttributionSource::Booking;

            let mut top_influencers: Vec<InfluencerPerformance> = state
                .influencers
                .iter()
                .filter(|i| i.status == InfluencerStatus::Active)
                .map(|i| {
                    let own: Vec<&ReferralAttribution> = state
                        .attributions
                        .iter()
                        .filter(|a| a.influencer_id == i.id)
                        .collect();
                    let bookings: Vec<&ReferralAttribution> =
                        own.iter().copied().filter(is_booking).collect();
                    InfluencerPerformance {
                        id: i.id,
                        name: i.name.clone(),
                        referral_code: i.referral_code.clone(),
                        total_attributions: own.len() as i64,
                        total_bookings: bookings.len() as i64,
                        total_revenue: bookings
                            .iter()
                            .filter_map(|a| a.order_amount)
                            .sum::<Decimal>(),
                        total_commission: own
                            .iter()
                            .filter_map(|a| a.commission_amount)
                            .sum::<Decimal>(),
                    }
                })
                .collect();
            top_influencers.sort_by(|a, b| {
                b.total_bookings
                    .cmp(&a.total_bookings)
                    .then_with(|| b.total_revenue.cmp(&a.total_revenue))
                    .then_with(|| a.name.cmp(&b.name))
            });
            top_influencers.truncate(top);

            InfluencerAnalytics {
                total_influencers: state
                    .influencers
                    .iter()
                    .filter(|i| i.status == InfluencerStatus::Active)
                    .count() as i64,
                total_attributions: state.attributions.len() as i64,
                total_bookings: state.attributions.iter().filter(is_booking).count() as i64,
                total_revenue: state
                    .attributions
                    .iter()
                    .filter(is_booking)
                    .filter(|a| a.status == AttributionStatus::Eligible)
                    .filter_map(|a| a.order_amount)
                    .sum::<Decimal>(),
                top_influencers,
            }
        })
    }
}

#[async_trait]
impl PayoutStore for InMemoryStore {
    async fn create_payout(
        &self,
        influencer_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<InfluencerPayout, AppError> {
        self.transact(|state| {
            if !state.influencers.iter().any(|i| i.id == influencer_id) {
                return Err(AppError::NotFound(format!(
                    "Influencer {} not found",
                    influencer_id
                )));
            }

            let claimable: Vec<ReferralAttribution> = state
                .attributions
                .iter()
                .filter(|a| is_payable_in_period(a, influencer_id, period_start, period_end))
                .cloned()
                .collect();
            let totals = PayoutTotals::tally(&claimable);

            let payout = InfluencerPayout {
                id: Uuid::new_v4(),
                influencer_id,
                period_start,
                period_end,
                total_bookings: totals.total_bookings,
                total_revenue: totals.total_revenue,
                total_commission: totals.total_commission,
                status: PayoutStatus::Pending,
                notes: None,
                paid_at: None,
                created_at: Utc::now(),
            };
            state.payouts.push(payout.clone());

            for attribution in state
                .attributions
                .iter_mut()
                .filter(|a| claimable.iter().any(|c| c.id == a.id))
            {
                attribution.payout_id = Some(payout.id);
                attribution.updated_at = payout.created_at;
            }
            Ok(payout)
        })
    }

    async fn mark_payout_paid(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<PayoutSettlement, AppError> {
        self.transact(|state| {
            let now = Utc::now();
            let payout = state
                .payouts
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Payout {} not found", id)))?;
            payout.status = PayoutStatus::Paid;
            payout.paid_at.get_or_insert(now);
            if notes.is_some() {
                payout.notes = notes;
            }
            let payout = payout.clone();

            let mut attributions_paid = 0;
            for attribution in state.attributions.iter_mut().filter(|a| {
                a.payout_id == Some(id) && a.status == AttributionStatus::Eligible
            }) {
                attribution.status = AttributionStatus::Paid;
                attribution.updated_at = now;
                attributions_paid += 1;
            }

            Ok(PayoutSettlement {
                payout,
                attributions_paid,
            })
        })
    }

    async fn get_payout(&self, id: Uuid) -> Result<Option<InfluencerPayout>, AppError> {
        self.read(|state| state.payouts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_payouts(
        &self,
        influencer_id: Option<Uuid>,
    ) -> Result<Vec<PayoutListItem>, AppError> {
        self.read(|state| {
            state
                .payouts
                .iter()
                .rev()
                .filter(|p| influencer_id.is_none_or(|id| p.influencer_id == id))
                .filter_map(|p| {
                    let influencer = state.influencers.iter().find(|i| i.id == p.influencer_id)?;
                    Some(PayoutListItem {
                        payout: p.clone(),
                        influencer_name: influencer.name.clone(),
                    })
                })
                .collect()
        })
    }
}

#[async_trait]
impl AuditLogStore for InMemoryStore {
    async fn record(&self, entry: AuditLogEntry) -> Result<(), AppError> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(AppError::Internal("Injected audit write failure".to_string()));
        }
        self.transact(|state| {
            state.audit_logs.push(entry);
            Ok(())
        })
    }

    async fn list_audit_logs(
        &self,
        query: &AuditLogQuery,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        self.read(|state| {
            state
                .audit_logs
                .iter()
                .rev()
                .filter(|e| {
                    query
                        .entity_type
                        .as_ref()
                        .is_none_or(|t| &e.entity_type == t)
                })
                .filter(|e| query.entity_id.as_ref().is_none_or(|id| &e.entity_id == id))
                .take(limit)
                .cloned()
                .collect()
        })
    }
}

#[async_trait]
impl AdminRoleStore for InMemoryStore {
    async fn find_role_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<AdminRoleAssignment>, AppError> {
        self.read(|state| state.roles.iter().find(|r| r.user_id == user_id).cloned())
    }

    async fn list_roles(&self) -> Result<Vec<AdminRoleAssignment>, AppError> {
        self.read(|state| state.roles.iter().rev().cloned().collect())
    }

    async fn create_role(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<AdminRoleAssignment, AppError> {
        self.transact(|state| {
            if state.roles.iter().any(|r| r.user_id == user_id) {
                return Err(AppError::AlreadyExists(
                    "Duplicate value violates admin_roles_user_id_key".to_string(),
                ));
            }
            let now = Utc::now();
            let assignment = AdminRoleAssignment {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                role,
                is_active: true,
                created_at: now,
                updated_at: now,
            };
            state.roles.push(assignment.clone());
            Ok(assignment)
        })
    }

    async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        is_active: bool,
    ) -> Result<AdminRoleAssignment, AppError> {
        self.transact(|state| {
            let assignment = state
                .roles
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))?;
            assignment.role = role;
            assignment.is_active = is_active;
            assignment.updated_at = Utc::now();
            Ok(assignment.clone())
        })
    }

    async fn delete_role(&self, id: Uuid) -> Result<(), AppError> {
        self.transact(|state| {
            let before = state.roles.len();
            state.roles.retain(|r| r.id != id);
            if state.roles.len() == before {
                return Err(AppError::NotFound(format!("Team member {} not found", id)));
            }
            Ok(())
        })
    }
}

#[async_trait]
impl LegalDocumentStore for InMemoryStore {
    async fn get_document(
        &self,
        document_type: LegalDocumentType,
    ) -> Result<Option<LegalDocument>, AppError> {
        self.read(|state| state.legal.get(&document_type).cloned())
    }

    async fn save_document(&self, document: &LegalDocument) -> Result<LegalDocument, AppError> {
        self.transact(|state| {
            state
                .legal
                .insert(document.document_type, document.clone());
            Ok(document.clone())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::models::{AttributionSource, CommissionType, UpdateLeadRequest};

    fn new_lead(name: &str) -> NewLead {
        NewLead {
            name: name.to_string(),
            source: "website".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_lead_appends_note() {
        let store = InMemoryStore::new();
        let lead = store.create_lead(new_lead("Asha"), None, "user-1").await.unwrap();
        let activities = store.list_activities(lead.id).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].payload, ActivityPayload::note("Lead created"));
    }

    #[tokio::test]
    async fn test_stale_version_is_conflict() {
        let store = InMemoryStore::new();
        let lead = store.create_lead(new_lead("Asha"), None, "user-1").await.unwrap();
        let change = lead.apply_update(
            &UpdateLeadRequest {
                stage: Some(LeadStage::Hot),
                ..Default::default()
            },
            Utc::now(),
        );
        store
            .update_lead(change.clone(), lead.version, "user-1")
            .await
            .unwrap();
        let err = store
            .update_lead(change, lead.version, "user-2")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_failed_transaction_leaves_state_untouched() {
        let store = InMemoryStore::new();
        let lead = store.create_lead(new_lead("Asha"), None, "user-1").await.unwrap();
        store.set_fail_conversion_after_booking(true);

        let booking = wayfarer_core::models::ConvertLeadRequest::default().into_booking(
            Uuid::new_v4(),
            lead.id,
            "NSV1736467200000001".to_string(),
            Utc::now(),
        );
        let plan = ConversionPlan {
            lead_id: lead.id,
            expected_version: lead.version,
            booking,
            attribution: None,
            actor: "user-1".to_string(),
            audit: wayfarer_core::models::AuditEvent::new(
                wayfarer_core::models::AuditAction::Create,
                "booking",
                lead.id,
                serde_json::json!({}),
            )
            .into_entry("user-1", Utc::now()),
        };
        assert!(store.convert_lead(plan).await.is_err());
        assert!(store.bookings().unwrap().is_empty());
        let lead = store.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(lead.stage, LeadStage::New);
        assert!(store.audit_entries().unwrap().is_empty());
    }

    fn new_influencer(code: &str) -> NewInfluencer {
        NewInfluencer {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            phone: None,
            instagram_handle: None,
            youtube_channel: None,
            referral_code: code.to_string(),
            commission_type: CommissionType::Percent,
            commission_value: Decimal::new(5, 0),
            attribution_window_days: 30,
            payout_preference: None,
            payout_details: None,
        }
    }

    fn referred_enquiry(code: &str) -> NewEnquiry {
        NewEnquiry {
            name: "Asha".to_string(),
            email: "asha@x.com".to_string(),
            phone: None,
            destination_interest: Some("Bali".to_string()),
            budget_range: None,
            travel_month: None,
            message: None,
            source: "website".to_string(),
            referral_code: Some(code.to_string()),
        }
    }

    #[tokio::test]
    async fn test_duplicate_referral_code_rejected() {
        let store = InMemoryStore::new();
        store
            .create_influencer(new_influencer("NSV-ABCDEF"))
            .await
            .unwrap();
        let err = store
            .create_influencer(new_influencer("NSV-ABCDEF"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn test_enquiry_attribution_is_found_for_lead() {
        let store = InMemoryStore::new();
        let influencer = store
            .create_influencer(new_influencer("NSV-ABCDEF"))
            .await
            .unwrap();
        let stored = store
            .submit_enquiry(
                referred_enquiry("NSV-ABCDEF"),
                Some(NewAttribution::enquiry("NSV-ABCDEF".to_string(), influencer.id)),
            )
            .await
            .unwrap();
        let attribution = store
            .find_enquiry_attribution(stored.lead_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attribution.influencer_id, influencer.id);
        assert_eq!(attribution.source, AttributionSource::Enquiry);
        assert_eq!(attribution.status, AttributionStatus::Tracked);
    }

    #[tokio::test]
    async fn test_influencer_paused_before_commit_gets_no_attribution() {
        let store = InMemoryStore::new();
        let mut influencer = store
            .create_influencer(new_influencer("NSV-ABCDEF"))
            .await
            .unwrap();
        let attribution = NewAttribution::enquiry("NSV-ABCDEF".to_string(), influencer.id);

        // Paused between the caller's lookup and the write.
        influencer.status = InfluencerStatus::Paused;
        store.save_influencer(&influencer).await.unwrap();

        let stored = store
            .submit_enquiry(referred_enquiry("NSV-ABCDEF"), Some(attribution.clone()))
            .await
            .unwrap();
        assert!(store.get_lead(stored.lead_id).await.unwrap().is_some());
        let lead = store
            .create_lead(new_lead("Ravi"), Some(attribution), "user-1")
            .await
            .unwrap();
        assert!(store.get_lead(lead.id).await.unwrap().is_some());
        assert!(store.attributions().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_lead_records_intake_attribution() {
        let store = InMemoryStore::new();
        let influencer = store
            .create_influencer(new_influencer("NSV-ABCDEF"))
            .await
            .unwrap();
        let lead = store
            .create_lead(
                new_lead("Asha"),
                Some(NewAttribution::enquiry("NSV-ABCDEF".to_string(), influencer.id)),
                "user-1",
            )
            .await
            .unwrap();
        let attribution = store
            .find_enquiry_attribution(lead.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(attribution.influencer_id, influencer.id);
        assert_eq!(attribution.status, AttributionStatus::Tracked);
    }
}
