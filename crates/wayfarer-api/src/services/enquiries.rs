use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::models::{
    entity, AuditAction, AuditEvent, Audited, Enquiry, NewAttribution, NewEnquiry,
    SubmitEnquiryRequest,
};
use wayfarer_core::referral::normalize_referral_code;
use wayfarer_core::AppError;
use wayfarer_db::{EnquiryStore, ReferralStore};

use super::influencers::resolve_active_referral;

/// Public contact-form intake and the admin inbox.
#[derive(Clone)]
pub struct EnquiryService {
    enquiries: Arc<dyn EnquiryStore>,
    referrals: Arc<dyn ReferralStore>,
}

impl EnquiryService {
    pub fn new(enquiries: Arc<dyn EnquiryStore>, referrals: Arc<dyn ReferralStore>) -> Self {
        Self {
            enquiries,
            referrals,
        }
    }

    /// Stores the enquiry and opens its lead; a code belonging to an active
    /// influencer also records a `tracked` enquiry attribution.
    pub async fn submit(
        &self,
        request: SubmitEnquiryRequest,
        referral_code: Option<String>,
    ) -> Result<Enquiry, AppError> {
        let referral_code = referral_code
            .map(|code| normalize_referral_code(&code))
            .filter(|code| !code.is_empty());

        let attribution = match &referral_code {
            Some(code) => resolve_active_referral(self.referrals.as_ref(), code)
                .await?
                .map(|influencer| NewAttribution::enquiry(influencer.referral_code, influencer.id)),
            None => None,
        };

        let enquiry = NewEnquiry::from_request(request, referral_code);
        let enquiry = self.enquiries.submit_enquiry(enquiry, attribution).await?;
        tracing::info!(
            enquiry_id = %enquiry.id,
            lead_id = %enquiry.lead_id,
            source = %enquiry.source,
            "Enquiry received"
        );
        Ok(enquiry)
    }

    pub async fn list(&self) -> Result<Vec<Enquiry>, AppError> {
        self.enquiries.list_enquiries().await
    }

    pub async fn mark_read(&self, id: Uuid, is_read: bool) -> Result<Audited<Enquiry>, AppError> {
        let enquiry = self.enquiries.mark_enquiry_read(id, is_read).await?;
        Ok(Audited::new(
            enquiry,
            AuditEvent::new(
                AuditAction::Update,
                entity::ENQUIRY,
                id,
                serde_json::json!({ "is_read": is_read }),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use wayfarer_core::models::{
        AttributionSource, AttributionStatus, CommissionType, InfluencerStatus, NewInfluencer,
    };
    use wayfarer_db::{InMemoryStore, LeadStore};

    fn enquiry() -> SubmitEnquiryRequest {
        serde_json::from_value(serde_json::json!({
            "name": "Asha",
            "email": "asha@x.com",
            "destination_interest": "Bali"
        }))
        .unwrap()
    }

    async fn influencer(store: &InMemoryStore, code: &str) -> wayfarer_core::models::Influencer {
        store
            .create_influencer(NewInfluencer {
                name: "Meera".to_string(),
                email: "meera@example.com".to_string(),
                phone: None,
                instagram_handle: None,
                youtube_channel: None,
                referral_code: code.to_string(),
                commission_type: CommissionType::Percent,
                commission_value: Decimal::new(10, 0),
                attribution_window_days: 30,
                payout_preference: None,
                payout_details: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_active_code_creates_tracked_attribution() {
        let store = Arc::new(InMemoryStore::new());
        let meera = influencer(&store, "NSV-ABCDEF").await;
        let service = EnquiryService::new(store.clone(), store.clone());

        let enquiry = service
            .submit(enquiry(), Some("nsv-abcdef".to_string()))
            .await
            .unwrap();
        assert!(!enquiry.is_read);
        assert_eq!(enquiry.referral_code.as_deref(), Some("NSV-ABCDEF"));

        let lead = store.get_lead(enquiry.lead_id).await.unwrap().unwrap();
        assert_eq!(lead.stage, wayfarer_core::models::LeadStage::New);
        assert_eq!(lead.destination_interest.as_deref(), Some("Bali"));

        let attributions = store.attributions().unwrap();
        assert_eq!(attributions.len(), 1);
        assert_eq!(attributions[0].influencer_id, meera.id);
        assert_eq!(attributions[0].lead_id, lead.id);
        assert_eq!(attributions[0].source, AttributionSource::Enquiry);
        assert_eq!(attributions[0].status, AttributionStatus::Tracked);
    }

    #[tokio::test]
    async fn test_paused_or_unknown_code_is_skipped_silently() {
        let store = Arc::new(InMemoryStore::new());
        let mut paused = influencer(&store, "NSV-PAUSED").await;
        paused.status = InfluencerStatus::Paused;
        store.save_influencer(&paused).await.unwrap();
        let service = EnquiryService::new(store.clone(), store.clone());

        service
            .submit(enquiry(), Some("NSV-PAUSED".to_string()))
            .await
            .unwrap();
        service
            .submit(enquiry(), Some("NSV-ZZZZZZ".to_string()))
            .await
            .unwrap();

        assert!(store.attributions().unwrap().is_empty());
        assert_eq!(service.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mark_read_is_audited() {
        let store = Arc::new(InMemoryStore::new());
        let service = EnquiryService::new(store.clone(), store.clone());
        let enquiry = service.submit(enquiry(), None).await.unwrap();

        let audited = service.mark_read(enquiry.id, true).await.unwrap();
        assert!(audited.value.is_read);
        assert_eq!(audited.event.entity_type, entity::ENQUIRY);

        let missing = service.mark_read(Uuid::new_v4(), true).await;
        assert!(matches!(missing, Err(AppError::NotFound(_))));
    }
}
