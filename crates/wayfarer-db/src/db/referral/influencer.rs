use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;
use wayfarer_core::models::{
    AttributionListQuery, AttributionStatus, Influencer, InfluencerAnalytics,
    InfluencerPerformance, InfluencerRequest, NewInfluencer, ReferralAttribution, RequestStatus,
    SubmitInfluencerRequest,
};
use wayfarer_core::AppError;

use super::attribution::ATTRIBUTION_COLUMNS;
use crate::db::store::ReferralStore;
use crate::db::transaction::TransactionGuard;

const INFLUENCER_COLUMNS: &str = "id, name, email, phone, instagram_handle, youtube_channel, \
     referral_code, status, commission_type, commission_value, attribution_window_days, \
     payout_preference, payout_details, created_at, updated_at";

const REQUEST_COLUMNS: &str = "id, full_name, email, phone, instagram_handle, youtube_channel, \
     audience_size, niche, preferred_destinations, payout_preference, payout_details, message, \
     status, influencer_id, reviewed_by, reviewed_at, created_at, updated_at";

async fn insert_influencer(
    conn: &mut PgConnection,
    influencer: NewInfluencer,
) -> Result<Influencer, AppError> {
    let row = influencer.into_influencer(Uuid::new_v4(), Utc::now());
    let stored = sqlx::query_as::<Postgres, Influencer>(&format!(
        r#"
        INSERT INTO influencers (
            id, name, email, phone, instagram_handle, youtube_channel, referral_code, status,
            commission_type, commission_value, attribution_window_days, payout_preference,
            payout_details, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        RETURNING {}
        "#,
        INFLUENCER_COLUMNS
    ))
    .bind(row.id)
    .bind(&row.name)
    .bind(&row.email)
    .bind(&row.phone)
    .bind(&row.instagram_handle)
    .bind(&row.youtube_channel)
    .bind(&row.referral_code)
    .bind(row.status)
    .bind(row.commission_type)
    .bind(row.commission_value)
    .bind(row.attribution_window_days)
    .bind(&row.payout_preference)
    .bind(&row.payout_details)
    .bind(row.created_at)
    .bind(row.updated_at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(stored)
}

/// Repository for influencers, their applications and referral attributions
#[derive(Clone)]
pub struct InfluencerRepository {
    pool: PgPool,
}

impl InfluencerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, table: &'static str, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            table
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl ReferralStore for InfluencerRepository {
    #[tracing::instrument(skip(self), fields(db.table = "influencers", db.operation = "select"))]
    async fn find_influencer_by_code(&self, code: &str) -> Result<Option<Influencer>, AppError> {
        let influencer = sqlx::query_as::<Postgres, Influencer>(&format!(
            "SELECT {} FROM influencers WHERE referral_code = $1",
            INFLUENCER_COLUMNS
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;
        Ok(influencer)
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencers", db.operation = "select", db.record_id = %id))]
    async fn get_influencer(&self, id: Uuid) -> Result<Option<Influencer>, AppError> {
        let influencer = sqlx::query_as::<Postgres, Influencer>(&format!(
            "SELECT {} FROM influencers WHERE id = $1",
            INFLUENCER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(influencer)
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencers", db.operation = "select"))]
    async fn list_influencers(&self) -> Result<Vec<Influencer>, AppError> {
        let influencers = sqlx::query_as::<Postgres, Influencer>(&format!(
            "SELECT {} FROM influencers ORDER BY created_at DESC",
            INFLUENCER_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(influencers)
    }

    #[tracing::instrument(skip(self, influencer), fields(db.table = "influencers", db.operation = "insert"))]
    async fn create_influencer(&self, influencer: NewInfluencer) -> Result<Influencer, AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_influencer(&mut conn, influencer).await
    }

    #[tracing::instrument(skip(self, influencer), fields(db.table = "influencers", db.operation = "update", db.record_id = %influencer.id))]
    async fn save_influencer(&self, influencer: &Influencer) -> Result<Influencer, AppError> {
        sqlx::query_as::<Postgres, Influencer>(&format!(
            r#"
            UPDATE influencers SET
                name = $2, phone = $3, instagram_handle = $4, youtube_channel = $5, status = $6,
                commission_type = $7, commission_value = $8, attribution_window_days = $9,
                payout_preference = $10, payout_details = $11, updated_at = $12
            WHERE id = $1
            RETURNING {}
            "#,
            INFLUENCER_COLUMNS
        ))
        .bind(influencer.id)
        .bind(&influencer.name)
        .bind(&influencer.phone)
        .bind(&influencer.instagram_handle)
        .bind(&influencer.youtube_channel)
        .bind(influencer.status)
        .bind(influencer.commission_type)
        .bind(influencer.commission_value)
        .bind(influencer.attribution_window_days)
        .bind(&influencer.payout_preference)
        .bind(&influencer.payout_details)
        .bind(influencer.updated_at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Influencer {} not found", influencer.id)))
    }

    #[tracing::instrument(skip(self, request), fields(db.table = "influencer_requests", db.operation = "insert"))]
    async fn create_request(
        &self,
        request: SubmitInfluencerRequest,
    ) -> Result<InfluencerRequest, AppError> {
        let now = Utc::now();
        let stored = sqlx::query_as::<Postgres, InfluencerRequest>(&format!(
            r#"
            INSERT INTO influencer_requests (
                id, full_name, email, phone, instagram_handle, youtube_channel, audience_size,
                niche, preferred_destinations, payout_preference, payout_details, message,
                status, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $14)
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(&request.full_name)
        .bind(&request.email)
        .bind(&request.phone)
        .bind(&request.instagram_handle)
        .bind(&request.youtube_channel)
        .bind(request.audience_size)
        .bind(&request.niche)
        .bind(&request.preferred_destinations)
        .bind(&request.payout_preference)
        .bind(&request.payout_details)
        .bind(&request.message)
        .bind(RequestStatus::Pending)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencer_requests", db.operation = "select", db.record_id = %id))]
    async fn get_request(&self, id: Uuid) -> Result<Option<InfluencerRequest>, AppError> {
        let request = sqlx::query_as::<Postgres, InfluencerRequest>(&format!(
            "SELECT {} FROM influencer_requests WHERE id = $1",
            REQUEST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencer_requests", db.operation = "select"))]
    async fn list_requests(
        &self,
        status: Option<RequestStatus>,
    ) -> Result<Vec<InfluencerRequest>, AppError> {
        let requests = sqlx::query_as::<Postgres, InfluencerRequest>(&format!(
            r#"
            SELECT {} FROM influencer_requests
            WHERE ($1::request_status IS NULL OR status = $1)
            ORDER BY created_at DESC
            "#,
            REQUEST_COLUMNS
        ))
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    #[tracing::instrument(skip(self, influencer), fields(db.table = "influencer_requests", db.operation = "update", db.record_id = %id))]
    async fn approve_request(
        &self,
        id: Uuid,
        influencer: NewInfluencer,
        reviewer: &str,
    ) -> Result<(InfluencerRequest, Influencer), AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "approve_influencer_request").await?;

        let status = sqlx::query_scalar::<Postgres, RequestStatus>(
            "SELECT status FROM influencer_requests WHERE id = $1 FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(tx.conn())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Influencer request {} not found", id)))?;

        if status != RequestStatus::Pending {
            return Err(AppError::Conflict(format!(
                "Influencer request {} was already reviewed",
                id
            )));
        }

        let influencer = insert_influencer(tx.conn(), influencer).await?;

        let request = sqlx::query_as::<Postgres, InfluencerRequest>(&format!(
            r#"
            UPDATE influencer_requests
            SET status = $2, influencer_id = $3, reviewed_by = $4, reviewed_at = NOW(),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(RequestStatus::Approved)
        .bind(influencer.id)
        .bind(reviewer)
        .fetch_one(tx.conn())
        .await?;

        tx.commit().await?;
        Ok((request, influencer))
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencer_requests", db.operation = "update", db.record_id = %id))]
    async fn reject_request(
        &self,
        id: Uuid,
        reviewer: &str,
    ) -> Result<InfluencerRequest, AppError> {
        let rejected = sqlx::query_as::<Postgres, InfluencerRequest>(&format!(
            r#"
            UPDATE influencer_requests
            SET status = $2, reviewed_by = $3, reviewed_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND status = $4
            RETURNING {}
            "#,
            REQUEST_COLUMNS
        ))
        .bind(id)
        .bind(RequestStatus::Rejected)
        .bind(reviewer)
        .bind(RequestStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;

        match rejected {
            Some(request) => Ok(request),
            None if self.exists("influencer_requests", id).await? => Err(AppError::Conflict(
                format!("Influencer request {} was already reviewed", id),
            )),
            None => Err(AppError::NotFound(format!(
                "Influencer request {} not found",
                id
            ))),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "referral_attributions", db.operation = "select"))]
    async fn list_attributions(
        &self,
        query: &AttributionListQuery,
    ) -> Result<Vec<ReferralAttribution>, AppError> {
        let attributions = sqlx::query_as::<Postgres, ReferralAttribution>(&format!(
            r#"
            SELECT {} FROM referral_attributions
            WHERE ($1::uuid IS NULL OR influencer_id = $1)
              AND ($2::attribution_status IS NULL OR status = $2)
            ORDER BY created_at DESC
            "#,
            ATTRIBUTION_COLUMNS
        ))
        .bind(query.influencer_id)
        .bind(query.status)
        .fetch_all(&self.pool)
        .await?;
        Ok(attributions)
    }

    #[tracing::instrument(skip(self), fields(db.table = "referral_attributions", db.operation = "select"))]
    async fn find_enquiry_attribution(
        &self,
        lead_id: Uuid,
    ) -> Result<Option<ReferralAttribution>, AppError> {
        let attribution = sqlx::query_as::<Postgres, ReferralAttribution>(&format!(
            r#"
            SELECT {} FROM referral_attributions
            WHERE lead_id = $1 AND source = 'enquiry' AND status = 'tracked'
            ORDER BY created_at ASC
            LIMIT 1
            "#,
            ATTRIBUTION_COLUMNS
        ))
        .bind(lead_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attribution)
    }

    #[tracing::instrument(skip(self), fields(db.table = "referral_attributions", db.operation = "select", db.record_id = %id))]
    async fn get_attribution(&self, id: Uuid) -> Result<Option<ReferralAttribution>, AppError> {
        let attribution = sqlx::query_as::<Postgres, ReferralAttribution>(&format!(
            "SELECT {} FROM referral_attributions WHERE id = $1",
            ATTRIBUTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attribution)
    }

    #[tracing::instrument(skip(self), fields(db.table = "referral_attributions", db.operation = "update", db.record_id = %id))]
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

        let advanced = sqlx::query_as::<Postgres, ReferralAttribution>(&format!(
            r#"
            UPDATE referral_attributions
            SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            ATTRIBUTION_COLUMNS
        ))
        .bind(id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;

        match advanced {
            Some(attribution) => Ok(attribution),
            None if self.exists("referral_attributions", id).await? => Err(AppError::Conflict(
                format!("Attribution {} is no longer {:?}", id, from),
            )),
            None => Err(AppError::NotFound(format!("Attribution {} not found", id))),
        }
    }

    #[tracing::instrument(skip(self), fields(db.table = "referral_attributions", db.operation = "aggregate"))]
    async fn influencer_analytics(&self, top: i64) -> Result<InfluencerAnalytics, AppError> {
        let total_influencers = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM influencers WHERE status = 'active'",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_attributions =
            sqlx::query_scalar::<Postgres, i64>("SELECT COUNT(*) FROM referral_attributions")
                .fetch_one(&self.pool)
                .await?;

        let total_bookings = sqlx::query_scalar::<Postgres, i64>(
            "SELECT COUNT(*) FROM referral_attributions WHERE source = 'booking'",
        )
        .fetch_one(&self.pool)
        .await?;

        let total_revenue = sqlx::query_scalar::<Postgres, Decimal>(
            r#"
            SELECT COALESCE(SUM(order_amount), 0)
            FROM referral_attributions
            WHERE source = 'booking' AND status = 'eligible'
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let top_influencers = sqlx::query_as::<Postgres, InfluencerPerformance>(
            r#"
            SELECT
                i.id,
                i.name,
                i.referral_code,
                COUNT(ra.id) AS total_attributions,
                COUNT(ra.id) FILTER (WHERE ra.source = 'booking') AS total_bookings,
                COALESCE(SUM(ra.order_amount) FILTER (WHERE ra.source = 'booking'), 0)
                    AS total_revenue,
                COALESCE(SUM(ra.commission_amount), 0) AS total_commission
            FROM influencers i
            LEFT JOIN referral_attributions ra ON ra.influencer_id = i.id
            WHERE i.status = 'active'
            GROUP BY i.id, i.name, i.referral_code
            ORDER BY total_bookings DESC, total_revenue DESC, i.name
            LIMIT $1
            "#,
        )
        .bind(top)
        .fetch_all(&self.pool)
        .await?;

        Ok(InfluencerAnalytics {
            total_influencers,
            total_attributions,
            total_bookings,
            total_revenue,
            top_influencers,
        })
    }
}
