//! Lead to booking conversion.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::models::{
    entity, AttributionSource, AuditAction, AuditEvent, ConversionReceipt, ConvertLeadRequest,
    Lead, NewAttribution,
};
use wayfarer_core::referral::{commission_for, generate_booking_code, within_attribution_window};
use wayfarer_core::constants::BOOKING_CODE_MAX_ATTEMPTS;
use wayfarer_core::AppError;
use wayfarer_db::{ConversionPlan, LeadStore, ReferralStore};

use crate::audit;

#[derive(Clone)]
pub struct ConversionService {
    leads: Arc<dyn LeadStore>,
    referrals: Arc<dyn ReferralStore>,
    default_currency: String,
}

impl ConversionService {
    pub fn new(
        leads: Arc<dyn LeadStore>,
        referrals: Arc<dyn ReferralStore>,
        default_currency: impl Into<String>,
    ) -> Self {
        Self {
            leads,
            referrals,
            default_currency: default_currency.into(),
        }
    }

    /// Materializes a draft booking from the lead and marks the lead converted.
    ///
    /// The booking, stage flip, `converted` activity, earned referral commission
    /// and audit row are written as one unit by the store; a failure at any step
    /// leaves none of them behind.
    pub async fn convert(
        &self,
        lead_id: Uuid,
        mut request: ConvertLeadRequest,
        actor: &str,
    ) -> Result<ConversionReceipt, AppError> {
        let lead = self
            .leads
            .get_lead(lead_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Lead {} not found", lead_id)))?;
        if let Some(booking_id) = lead.booking_id {
            return Err(AppError::Conflict(format!(
                "Lead {} was already converted to booking {}",
                lead_id, booking_id
            )));
        }

        if request.currency.is_none() {
            request.currency = Some(self.default_currency.clone());
        }
        let now = Utc::now();
        let changes = serde_json::to_value(&request)?;
        let commission = self
            .earned_commission(&lead, request.total_amount, now)
            .await?;

        let mut last_error = None;
        for attempt in 1..=BOOKING_CODE_MAX_ATTEMPTS {
            let booking = request.clone().into_booking(
                Uuid::new_v4(),
                lead.id,
                generate_booking_code(now),
                now,
            );
            let attribution = commission.clone().map(|earned| NewAttribution {
                booking_id: Some(booking.id),
                ..earned
            });
            let audit_entry =
                AuditEvent::new(AuditAction::Create, entity::BOOKING, booking.id, changes.clone())
                    .into_entry(actor, now);
            let plan = ConversionPlan {
                lead_id: lead.id,
                expected_version: lead.version,
                booking,
                attribution,
                actor: actor.to_string(),
                audit: audit_entry.clone(),
            };

            match self.leads.convert_lead(plan).await {
                Ok(booking) => {
                    audit::announce(&audit_entry);
                    tracing::info!(
                        lead_id = %lead_id,
                        booking_id = %booking.id,
                        booking_code = %booking.booking_code,
                        "Lead converted"
                    );
                    return Ok(ConversionReceipt::from(&booking));
                }
                Err(AppError::AlreadyExists(msg)) if msg.contains("booking_code") => {
                    tracing::debug!(attempt, "Booking code collision, regenerating");
                    last_error = Some(msg);
                }
                Err(AppError::AlreadyExists(_)) => {
                    return Err(AppError::Conflict(format!(
                        "Lead {} was already converted",
                        lead_id
                    )));
                }
                Err(err) => return Err(err),
            }
        }

        Err(AppError::Internal(format!(
            "Could not allocate a unique booking code: {}",
            last_error.unwrap_or_default()
        )))
    }

    /// Booking attribution owed to the influencer who referred the lead, if the
    /// referral is still active and inside its window. `booking_id` is filled
    /// in once the booking row exists.
    async fn earned_commission(
        &self,
        lead: &Lead,
        order_amount: rust_decimal::Decimal,
        now: DateTime<Utc>,
    ) -> Result<Option<NewAttribution>, AppError> {
        let Some(referral) = self.referrals.find_enquiry_attribution(lead.id).await? else {
            return Ok(None);
        };
        let Some(influencer) = self.referrals.get_influencer(referral.influencer_id).await? else {
            return Ok(None);
        };
        if !influencer.is_active() {
            tracing::debug!(
                lead_id = %lead.id,
                influencer_id = %influencer.id,
                "No booking commission: influencer is paused"
            );
            return Ok(None);
        }
        if !within_attribution_window(
            referral.created_at,
            influencer.attribution_window_days,
            now,
        ) {
            tracing::debug!(
                lead_id = %lead.id,
                influencer_id = %influencer.id,
                "No booking commission: attribution window elapsed"
            );
            return Ok(None);
        }

        let commission = commission_for(&influencer, order_amount)?;
        Ok(Some(NewAttribution {
            referral_code: referral.referral_code,
            influencer_id: influencer.id,
            source: AttributionSource::Booking,
            booking_id: None,
            order_amount: Some(order_amount),
            commission_amount: Some(commission),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use wayfarer_core::models::{
        ActivityPayload, AttributionStatus, CommissionType, InfluencerStatus, LeadStage,
        NewEnquiry, NewInfluencer, NewLead,
    };
    use wayfarer_db::{EnquiryStore, InMemoryStore};

    fn conversion(amount: i64) -> ConvertLeadRequest {
        ConvertLeadRequest {
            total_amount: Decimal::new(amount, 0),
            ..Default::default()
        }
    }

    async fn plain_lead(store: &InMemoryStore) -> Lead {
        store
            .create_lead(
                NewLead {
                    name: "Asha".to_string(),
                    source: "website".to_string(),
                    ..Default::default()
                },
                None,
                "user-1",
            )
            .await
            .unwrap()
    }

    async fn referred_lead(store: &InMemoryStore, status: InfluencerStatus) -> Uuid {
        let mut influencer = store
            .create_influencer(NewInfluencer {
                name: "Meera".to_string(),
                email: "meera@example.com".to_string(),
                phone: None,
                instagram_handle: None,
                youtube_channel: None,
                referral_code: "NSV-MEERA2".to_string(),
                commission_type: CommissionType::Percent,
                commission_value: Decimal::new(10, 0),
                attribution_window_days: 30,
                payout_preference: None,
                payout_details: None,
            })
            .await
            .unwrap();
        let enquiry = store
            .submit_enquiry(
                NewEnquiry {
                    name: "Asha".to_string(),
                    email: "asha@x.com".to_string(),
                    phone: None,
                    destination_interest: Some("Bali".to_string()),
                    budget_range: None,
                    travel_month: None,
                    message: None,
                    source: "website".to_string(),
                    referral_code: Some(influencer.referral_code.clone()),
                },
                Some(NewAttribution::enquiry(
                    influencer.referral_code.clone(),
                    influencer.id,
                )),
            )
            .await
            .unwrap();
        if status != InfluencerStatus::Active {
            influencer.status = status;
            store.save_influencer(&influencer).await.unwrap();
        }
        enquiry.lead_id
    }

    #[tokio::test]
    async fn test_conversion_writes_booking_stage_activity_and_audit() {
        let store = Arc::new(InMemoryStore::new());
        let lead = plain_lead(&store).await;
        let service = ConversionService::new(store.clone(), store.clone(), "INR");

        let receipt = service
            .convert(lead.id, conversion(120000), "user-1")
            .await
            .unwrap();
        assert!(receipt.booking_code.starts_with("NSV"));
        assert_eq!(receipt.lead_id, lead.id);

        let converted = store.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(converted.stage, LeadStage::Converted);
        assert_eq!(converted.booking_id, Some(receipt.id));

        let bookings = store.bookings().unwrap();
        assert_eq!(bookings.len(), 1);
        assert_eq!(bookings[0].currency, "INR");

        let activities = store.list_activities(lead.id).await.unwrap();
        assert_eq!(
            activities[0].payload,
            ActivityPayload::Converted {
                booking_code: receipt.booking_code.clone()
            }
        );

        let audit = store.audit_entries().unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].entity_type, entity::BOOKING);
        assert_eq!(audit[0].entity_id, receipt.id.to_string());
    }

    #[tokio::test]
    async fn test_failure_after_booking_leaves_nothing_behind() {
        let store = Arc::new(InMemoryStore::new());
        let lead = plain_lead(&store).await;
        store.set_fail_conversion_after_booking(true);
        let service = ConversionService::new(store.clone(), store.clone(), "INR");

        let result = service.convert(lead.id, conversion(1000), "user-1").await;
        assert!(result.is_err());

        let unchanged = store.get_lead(lead.id).await.unwrap().unwrap();
        assert_eq!(unchanged.stage, LeadStage::New);
        assert_eq!(unchanged.booking_id, None);
        assert!(store.bookings().unwrap().is_empty());
        assert!(store.audit_entries().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_conversion_is_conflict() {
        let store = Arc::new(InMemoryStore::new());
        let lead = plain_lead(&store).await;
        let service = ConversionService::new(store.clone(), store.clone(), "INR");

        service
            .convert(lead.id, conversion(1000), "user-1")
            .await
            .unwrap();
        let err = service
            .convert(lead.id, conversion(1000), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(store.bookings().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_referred_conversion_earns_commission() {
        let store = Arc::new(InMemoryStore::new());
        let lead_id = referred_lead(&store, InfluencerStatus::Active).await;
        let service = ConversionService::new(store.clone(), store.clone(), "INR");

        let receipt = service
            .convert(lead_id, conversion(50000), "user-1")
            .await
            .unwrap();

        let booking_attr = store
            .attributions()
            .unwrap()
            .into_iter()
            .find(|a| a.source == AttributionSource::Booking)
            .unwrap();
        assert_eq!(booking_attr.booking_id, Some(receipt.id));
        assert_eq!(booking_attr.status, AttributionStatus::Tracked);
        assert_eq!(booking_attr.order_amount, Some(Decimal::new(50000, 0)));
        assert_eq!(booking_attr.commission_amount, Some(Decimal::new(5000, 0)));
    }

    #[tokio::test]
    async fn test_unrepresentable_commission_is_invalid_input() {
        let store = Arc::new(InMemoryStore::new());
        let lead_id = referred_lead(&store, InfluencerStatus::Active).await;
        let service = ConversionService::new(store.clone(), store.clone(), "INR");

        let huge = ConvertLeadRequest {
            total_amount: "10000000000000000000000000000".parse().unwrap(),
            ..Default::default()
        };
        let err = service.convert(lead_id, huge, "user-1").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
        assert!(store.bookings().unwrap().is_empty());
        let lead = store.get_lead(lead_id).await.unwrap().unwrap();
        assert_eq!(lead.stage, LeadStage::New);
    }

    #[tokio::test]
    async fn test_paused_influencer_earns_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let lead_id = referred_lead(&store, InfluencerStatus::Paused).await;
        let service = ConversionService::new(store.clone(), store.clone(), "INR");

        service
            .convert(lead_id, conversion(50000), "user-1")
            .await
            .unwrap();
        assert!(store
            .attributions()
            .unwrap()
            .iter()
            .all(|a| a.source == AttributionSource::Enquiry));
    }

    #[tokio::test]
    async fn test_missing_lead_is_not_found() {
        let store = Arc::new(InMemoryStore::new());
        let service = ConversionService::new(store.clone(), store.clone(), "INR");
        let err = service
            .convert(Uuid::new_v4(), conversion(1), "user-1")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
