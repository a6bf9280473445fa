use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::models::{
    entity, AuditAction, AuditEvent, Audited, CreatePayoutRequest, InfluencerPayout,
    PayoutListItem, PayoutSettlement,
};
use wayfarer_core::AppError;
use wayfarer_db::{PayoutStore, ReferralStore};

/// Commission settlement batches.
#[derive(Clone)]
pub struct PayoutService {
    payouts: Arc<dyn PayoutStore>,
    referrals: Arc<dyn ReferralStore>,
}

impl PayoutService {
    pub fn new(payouts: Arc<dyn PayoutStore>, referrals: Arc<dyn ReferralStore>) -> Self {
        Self { payouts, referrals }
    }

    /// Claims the influencer's eligible, unclaimed booking attributions created
    /// within the inclusive period into a new `pending` batch.
    pub async fn create(
        &self,
        request: CreatePayoutRequest,
    ) -> Result<Audited<InfluencerPayout>, AppError> {
        if request.period_start > request.period_end {
            return Err(AppError::Validation(
                "period_start: must not be after period_end".to_string(),
            ));
        }
        let influencer = self
            .referrals
            .get_influencer(request.influencer_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Influencer {} not found", request.influencer_id))
            })?;

        let payout = self
            .payouts
            .create_payout(influencer.id, request.period_start, request.period_end)
            .await?;
        tracing::info!(
            payout_id = %payout.id,
            influencer_id = %influencer.id,
            total_bookings = payout.total_bookings,
            total_commission = %payout.total_commission,
            "Payout batch created"
        );

        let changes = serde_json::json!({
            "influencer_id": influencer.id,
            "period_start": request.period_start,
            "period_end": request.period_end,
            "total_bookings": payout.total_bookings,
            "total_revenue": payout.total_revenue,
            "total_commission": payout.total_commission,
        });
        Ok(Audited::new(
            payout.clone(),
            AuditEvent::new(
                AuditAction::Create,
                entity::INFLUENCER_PAYOUT,
                payout.id,
                changes,
            ),
        ))
    }

    /// Settles the batch. Repeating it flips no further attributions.
    pub async fn mark_paid(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<Audited<PayoutSettlement>, AppError> {
        let settlement = self.payouts.mark_payout_paid(id, notes.clone()).await?;
        let changes = serde_json::json!({
            "status": settlement.payout.status,
            "notes": notes,
            "attributions_paid": settlement.attributions_paid,
        });
        Ok(Audited::new(
            settlement,
            AuditEvent::new(
                AuditAction::Update,
                entity::INFLUENCER_PAYOUT,
                id,
                changes,
            ),
        ))
    }

    pub async fn list(&self, influencer_id: Option<Uuid>) -> Result<Vec<PayoutListItem>, AppError> {
        self.payouts.list_payouts(influencer_id).await
    }
}
