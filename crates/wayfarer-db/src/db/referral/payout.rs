use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use wayfarer_core::models::{
    AttributionStatus, InfluencerPayout, PayoutListItem, PayoutSettlement, PayoutStatus,
    PayoutTotals, ReferralAttribution,
};
use wayfarer_core::AppError;

use super::attribution::ATTRIBUTION_COLUMNS;
use crate::db::store::PayoutStore;
use crate::db::transaction::TransactionGuard;

const PAYOUT_COLUMNS: &str = "id, influencer_id, period_start, period_end, total_bookings, \
     total_revenue, total_commission, status, notes, paid_at, created_at";

/// Repository for influencer payout batches
#[derive(Clone)]
pub struct PayoutRepository {
    pool: PgPool,
}

impl PayoutRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PayoutStore for PayoutRepository {
    #[tracing::instrument(skip(self), fields(db.table = "influencer_payouts", db.operation = "insert"))]
    async fn create_payout(
        &self,
        influencer_id: Uuid,
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> Result<InfluencerPayout, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "create_payout").await?;

        let influencer_exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM influencers WHERE id = $1)",
        )
        .bind(influencer_id)
        .fetch_one(tx.conn())
        .await?;
        if !influencer_exists {
            return Err(AppError::NotFound(format!(
                "Influencer {} not found",
                influencer_id
            )));
        }

        // A batch claims its rows through `payout_id`, so overlapping periods
        // never share an attribution and mark-paid only touches this batch.
        let claimable = sqlx::query_as::<Postgres, ReferralAttribution>(&format!(
            r#"
            SELECT {} FROM referral_attributions
            WHERE influencer_id = $1
              AND source = 'booking'
              AND status = 'eligible'
              AND payout_id IS NULL
              AND (created_at AT TIME ZONE 'UTC')::date BETWEEN $2 AND $3
            FOR UPDATE
            "#,
            ATTRIBUTION_COLUMNS
        ))
        .bind(influencer_id)
        .bind(period_start)
        .bind(period_end)
        .fetch_all(tx.conn())
        .await?;

        let totals = PayoutTotals::tally(&claimable);
        let payout = sqlx::query_as::<Postgres, InfluencerPayout>(&format!(
            r#"
            INSERT INTO influencer_payouts (
                id, influencer_id, period_start, period_end, total_bookings, total_revenue,
                total_commission, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(influencer_id)
        .bind(period_start)
        .bind(period_end)
        .bind(totals.total_bookings)
        .bind(totals.total_revenue)
        .bind(totals.total_commission)
        .bind(PayoutStatus::Pending)
        .bind(Utc::now())
        .fetch_one(tx.conn())
        .await?;

        let ids: Vec<Uuid> = claimable.iter().map(|a| a.id).collect();
        if !ids.is_empty() {
            sqlx::query(
                r#"
                UPDATE referral_attributions
                SET payout_id = $1, updated_at = NOW()
                WHERE id = ANY($2)
                "#,
            )
            .bind(payout.id)
            .bind(&ids)
            .execute(tx.conn())
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            payout_id = %payout.id,
            influencer_id = %influencer_id,
            attributions = ids.len(),
            "Payout batch created"
        );
        Ok(payout)
    }

    #[tracing::instrument(skip(self, notes), fields(db.table = "influencer_payouts", db.operation = "update", db.record_id = %id))]
    async fn mark_payout_paid(
        &self,
        id: Uuid,
        notes: Option<String>,
    ) -> Result<PayoutSettlement, AppError> {
        let mut tx = TransactionGuard::begin(&self.pool, "mark_payout_paid").await?;

        let payout = sqlx::query_as::<Postgres, InfluencerPayout>(&format!(
            r#"
            UPDATE influencer_payouts
            SET status = $2, paid_at = COALESCE(paid_at, NOW()), notes = COALESCE($3, notes)
            WHERE id = $1
            RETURNING {}
            "#,
            PAYOUT_COLUMNS
        ))
        .bind(id)
        .bind(PayoutStatus::Paid)
        .bind(notes)
        .fetch_optional(tx.conn())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payout {} not found", id)))?;

        let flipped = sqlx::query(
            r#"
            UPDATE referral_attributions
            SET status = $2, updated_at = NOW()
            WHERE payout_id = $1 AND status = $3
            "#,
        )
        .bind(id)
        .bind(AttributionStatus::Paid)
        .bind(AttributionStatus::Eligible)
        .execute(tx.conn())
        .await?;

        tx.commit().await?;

        Ok(PayoutSettlement {
            payout,
            attributions_paid: flipped.rows_affected(),
        })
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencer_payouts", db.operation = "select", db.record_id = %id))]
    async fn get_payout(&self, id: Uuid) -> Result<Option<InfluencerPayout>, AppError> {
        let payout = sqlx::query_as::<Postgres, InfluencerPayout>(&format!(
            "SELECT {} FROM influencer_payouts WHERE id = $1",
            PAYOUT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(payout)
    }

    #[tracing::instrument(skip(self), fields(db.table = "influencer_payouts", db.operation = "select"))]
    async fn list_payouts(
        &self,
        influencer_id: Option<Uuid>,
    ) -> Result<Vec<PayoutListItem>, AppError> {
        let payouts = sqlx::query_as::<Postgres, PayoutListItem>(
            r#"
            SELECT p.id, p.influencer_id, p.period_start, p.period_end, p.total_bookings,
                   p.total_revenue, p.total_commission, p.status, p.notes, p.paid_at,
                   p.created_at, i.name AS influencer_name
            FROM influencer_payouts p
            JOIN influencers i ON i.id = p.influencer_id
            WHERE ($1::uuid IS NULL OR p.influencer_id = $1)
            ORDER BY p.created_at DESC
            "#,
        )
        .bind(influencer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(payouts)
    }
}
