//! Influencer program: public applications, code validation, admin review,
//! influencer management, attribution approval and analytics.

use chrono::Utc;
use rust_decimal::Decimal;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::constants::{
    DEFAULT_ATTRIBUTION_WINDOW_DAYS, DEFAULT_COMMISSION_PERCENT, REFERRAL_CODE_MAX_ATTEMPTS,
    TOP_INFLUENCERS_LIMIT,
};
use wayfarer_core::models::{
    entity, AttributionListQuery, AttributionSource, AttributionStatus, AuditAction, AuditEvent,
    Audited, CommissionType, CreateInfluencer, Influencer, InfluencerAnalytics, InfluencerCreated,
    InfluencerRequest, NewInfluencer, ReferralAttribution, ReferralCodeCheck, RequestStatus,
    ReviewInfluencerRequest, SubmitInfluencerRequest, UpdateInfluencer,
};
use wayfarer_core::referral::{generate_referral_code, normalize_referral_code};
use wayfarer_core::AppError;
use wayfarer_db::ReferralStore;

/// Looks up `code` among active influencers.
///
/// Unknown and paused codes resolve to `None`; callers skip attribution
/// instead of failing.
pub async fn resolve_active_referral(
    referrals: &dyn ReferralStore,
    code: &str,
) -> Result<Option<Influencer>, AppError> {
    let code = normalize_referral_code(code);
    if code.is_empty() {
        return Ok(None);
    }
    let influencer = referrals.find_influencer_by_code(&code).await?;
    match influencer {
        Some(influencer) if influencer.is_active() => Ok(Some(influencer)),
        Some(_) => {
            tracing::debug!(referral_code = %code, "Skipping referral code of paused influencer");
            Ok(None)
        }
        None => {
            tracing::debug!(referral_code = %code, "Skipping unknown referral code");
            Ok(None)
        }
    }
}

/// Runs `insert` with freshly generated codes until one is not taken.
async fn with_fresh_code<T, F, Fut>(mut insert: F) -> Result<T, AppError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let mut last_error = None;
    for attempt in 1..=REFERRAL_CODE_MAX_ATTEMPTS {
        match insert(generate_referral_code()).await {
            Err(AppError::AlreadyExists(msg)) => {
                tracing::debug!(attempt, "Referral code collision, regenerating");
                last_error = Some(msg);
            }
            other => return other,
        }
    }
    Err(AppError::Internal(format!(
        "Could not allocate a unique referral code: {}",
        last_error.unwrap_or_default()
    )))
}

#[derive(Clone)]
pub struct InfluencerService {
    referrals: Arc<dyn ReferralStore>,
}

impl InfluencerService {
    pub fn new(referrals: Arc<dyn ReferralStore>) -> Self {
        Self { referrals }
    }

    pub async fn submit_request(
        &self,
        request: SubmitInfluencerRequest,
    ) -> Result<InfluencerRequest, AppError> {
        self.referrals.create_request(request).await
    }

    pub async fn validate_code(&self, code: Option<&str>) -> Result<ReferralCodeCheck, AppError> {
        let code = code
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| AppError::BadRequest("Referral code is required".to_string()))?;

        Ok(
            match resolve_active_referral(self.referrals.as_ref(), code).await? {
                Some(influencer) => ReferralCodeCheck {
                    valid: true,
                    influencer_name: Some(influencer.name),
                    code: Some(influencer.referral_code),
                },
                None => ReferralCodeCheck::invalid(),
            },
        )
    }

    pub async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<InfluencerRequest>, AppError> {
        self.referrals.list_requests(status).await
    }

    /// Approves or rejects a pending application.
    ///
    /// Approval creates exactly one influencer carrying the applicant's contact,
    /// social and payout fields under a newly generated code.
    pub async fn review(
        &self,
        id: Uuid,
        review: ReviewInfluencerRequest,
        reviewer: &str,
    ) -> Result<Audited<InfluencerRequest>, AppError> {
        let request = self
            .referrals
            .get_request(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Influencer request {} not found", id)))?;
        if request.status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Influencer request {} was already reviewed",
                id
            )));
        }

        let reviewed = match review.status {
            RequestStatus::Pending => {
                return Err(AppError::Validation(
                    "status: must be approved or rejected".to_string(),
                ))
            }
            RequestStatus::Rejected => self.referrals.reject_request(id, reviewer).await?,
            RequestStatus::Approved => {
                let commission_type = review.commission_type.unwrap_or(CommissionType::Percent);
                let commission_value = review
                    .commission_value
                    .unwrap_or_else(|| Decimal::new(DEFAULT_COMMISSION_PERCENT, 0));
                let window = review
                    .attribution_window_days
                    .unwrap_or(DEFAULT_ATTRIBUTION_WINDOW_DAYS);

                let referrals = self.referrals.clone();
                let (reviewed, influencer) = with_fresh_code(|code| {
                    let referrals = referrals.clone();
                    let influencer = NewInfluencer {
                        name: request.full_name.clone(),
                        email: request.email.clone(),
                        phone: request.phone.clone(),
                        instagram_handle: request.instagram_handle.clone(),
                        youtube_channel: request.youtube_channel.clone(),
                        referral_code: code,
                        commission_type,
                        commission_value,
                        attribution_window_days: window,
                        payout_preference: request.payout_preference.clone(),
                        payout_details: request.payout_details.clone(),
                    };
                    async move { referrals.approve_request(id, influencer, reviewer).await }
                })
                .await?;
                tracing::info!(
                    request_id = %id,
                    influencer_id = %influencer.id,
                    referral_code = %influencer.referral_code,
                    "Influencer request approved"
                );
                reviewed
            }
        };

        let changes = serde_json::json!({
            "status": reviewed.status,
            "influencer_id": reviewed.influencer_id,
            "commission_type": review.commission_type,
            "commission_value": review.commission_value,
            "attribution_window_days": review.attribution_window_days,
        });
        Ok(Audited::new(
            reviewed,
            AuditEvent::new(
                AuditAction::Update,
                entity::INFLUENCER_REQUEST,
                id,
                changes,
            ),
        ))
    }

    pub async fn list_influencers(&self) -> Result<Vec<Influencer>, AppError> {
        self.referrals.list_influencers().await
    }

    pub async fn create_influencer(
        &self,
        request: CreateInfluencer,
    ) -> Result<Audited<InfluencerCreated>, AppError> {
        let handles = request.social_handles.clone().unwrap_or_default();
        let referrals = self.referrals.clone();
        let influencer = with_fresh_code(|code| {
            let referrals = referrals.clone();
            let influencer = NewInfluencer {
                name: request.name.clone(),
                email: request.email.clone(),
                phone: request.phone.clone(),
                instagram_handle: handles.instagram.clone(),
                youtube_channel: handles.youtube.clone(),
                referral_code: code,
                commission_type: request.commission_type,
                commission_value: request.commission_value,
                attribution_window_days: request
                    .attribution_window_days
                    .unwrap_or(DEFAULT_ATTRIBUTION_WINDOW_DAYS),
                payout_preference: request.payout_preference.clone(),
                payout_details: request.payout_details.clone(),
            };
            async move { referrals.create_influencer(influencer).await }
        })
        .await?;

        let changes = serde_json::to_value(&request)?;
        Ok(Audited::new(
            InfluencerCreated {
                id: influencer.id,
                referral_code: influencer.referral_code,
            },
            AuditEvent::new(
                AuditAction::Create,
                entity::INFLUENCER,
                influencer.id,
                changes,
            ),
        ))
    }

    pub async fn update_influencer(
        &self,
        id: Uuid,
        patch: UpdateInfluencer,
    ) -> Result<Audited<Influencer>, AppError> {
        let current = self
            .referrals
            .get_influencer(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Influencer {} not found", id)))?;
        let saved = self
            .referrals
            .save_influencer(&current.apply_update(&patch, Utc::now()))
            .await?;

        let changes = serde_json::to_value(&patch)?;
        Ok(Audited::new(
            saved,
            AuditEvent::new(AuditAction::Update, entity::INFLUENCER, id, changes),
        ))
    }

    pub async fn analytics(&self) -> Result<InfluencerAnalytics, AppError> {
        self.referrals
            .influencer_analytics(TOP_INFLUENCERS_LIMIT)
            .await
    }

    pub async fn list_attributions(
        &self,
        query: &AttributionListQuery,
    ) -> Result<Vec<ReferralAttribution>, AppError> {
        self.referrals.list_attributions(query).await
    }

    /// Marks a booking attribution payable (`tracked` to `eligible`).
    pub async fn approve_attribution(
        &self,
        id: Uuid,
    ) -> Result<Audited<ReferralAttribution>, AppError> {
        let attribution = self
            .referrals
            .get_attribution(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Referral attribution {} not found", id)))?;
        if attribution.source != AttributionSource::Booking {
            return Err(AppError::Conflict(
                "Only booking attributions can become eligible".to_string(),
            ));
        }
        if attribution.status != AttributionStatus::Tracked {
            return Err(AppError::Conflict(format!(
                "Attribution is {:?}, only tracked attributions can be approved",
                attribution.status
            )));
        }

        let approved = self
            .referrals
            .advance_attribution(id, AttributionStatus::Tracked, AttributionStatus::Eligible)
            .await?;
        Ok(Audited::new(
            approved,
            AuditEvent::new(
                AuditAction::Update,
                entity::REFERRAL_ATTRIBUTION,
                id,
                serde_json::json!({ "status": AttributionStatus::Eligible }),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_core::models::{InfluencerStatus, SocialHandles};
    use wayfarer_core::referral::is_referral_code_shape;
    use wayfarer_db::InMemoryStore;

    fn application() -> SubmitInfluencerRequest {
        serde_json::from_value(serde_json::json!({
            "full_name": "Meera Kapoor",
            "email": "meera@example.com",
            "instagram_handle": "@meera.travels",
            "audience_size": 42000,
            "payout_preference": "upi",
            "payout_details": "meera@upi"
        }))
        .unwrap()
    }

    fn approve(value: i64) -> ReviewInfluencerRequest {
        ReviewInfluencerRequest {
            status: RequestStatus::Approved,
            commission_type: Some(CommissionType::Percent),
            commission_value: Some(Decimal::new(value, 0)),
            attribution_window_days: None,
        }
    }

    #[tokio::test]
    async fn test_approval_creates_one_active_influencer() {
        let store = Arc::new(InMemoryStore::new());
        let service = InfluencerService::new(store);
        let request = service.submit_request(application()).await.unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let reviewed = service
            .review(request.id, approve(7), "founder-1")
            .await
            .unwrap()
            .value;
        assert_eq!(reviewed.status, RequestStatus::Approved);

        let influencers = service.list_influencers().await.unwrap();
        assert_eq!(influencers.len(), 1);
        let influencer = &influencers[0];
        assert_eq!(Some(influencer.id), reviewed.influencer_id);
        assert_eq!(influencer.status, InfluencerStatus::Active);
        assert_eq!(influencer.commission_value, Decimal::new(7, 0));
        assert_eq!(influencer.attribution_window_days, 30);
        assert_eq!(influencer.instagram_handle.as_deref(), Some("@meera.travels"));
        assert!(is_referral_code_shape(&influencer.referral_code));

        let again = service.review(request.id, approve(9), "founder-1").await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
        assert_eq!(service.list_influencers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_rejection_creates_nothing() {
        let service = InfluencerService::new(Arc::new(InMemoryStore::new()));
        let request = service.submit_request(application()).await.unwrap();
        let review = ReviewInfluencerRequest {
            status: RequestStatus::Rejected,
            commission_type: None,
            commission_value: None,
            attribution_window_days: None,
        };
        let reviewed = service.review(request.id, review, "founder-1").await.unwrap();
        assert_eq!(reviewed.value.status, RequestStatus::Rejected);
        assert!(service.list_influencers().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_validate_code_ignores_paused_influencers() {
        let service = InfluencerService::new(Arc::new(InMemoryStore::new()));
        let created = service
            .create_influencer(CreateInfluencer {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                phone: None,
                social_handles: Some(SocialHandles::default()),
                commission_type: CommissionType::Fixed,
                commission_value: Decimal::new(750, 0),
                attribution_window_days: None,
                payout_preference: None,
                payout_details: None,
            })
            .await
            .unwrap()
            .value;

        let lower = created.referral_code.to_lowercase();
        let check = service.validate_code(Some(&lower)).await.unwrap();
        assert!(check.valid);
        assert_eq!(check.influencer_name.as_deref(), Some("Ravi"));

        service
            .update_influencer(
                created.id,
                UpdateInfluencer {
                    status: Some(InfluencerStatus::Paused),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let check = service.validate_code(Some(&lower)).await.unwrap();
        assert_eq!(check, ReferralCodeCheck::invalid());

        let missing = service.validate_code(None).await;
        assert!(matches!(missing, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_code_generation_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), AppError> = with_fresh_code(|_| {
            calls += 1;
            async { Err(AppError::AlreadyExists("taken".to_string())) }
        })
        .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(calls, REFERRAL_CODE_MAX_ATTEMPTS);
    }
}
