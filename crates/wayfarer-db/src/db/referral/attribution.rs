use chrono::Utc;
use sqlx::{PgConnection, Postgres};
use uuid::Uuid;
use wayfarer_core::models::{NewAttribution, ReferralAttribution};
use wayfarer_core::AppError;

pub(crate) const ATTRIBUTION_COLUMNS: &str = "id, referral_code, influencer_id, lead_id, \
     booking_id, source, status, order_amount, commission_amount, payout_id, created_at, updated_at";

/// Inserts a `tracked` attribution for `lead_id` on the caller's connection.
///
/// The row is written only if the influencer is still `active` when the
/// statement runs; otherwise nothing is inserted and `None` is returned.
pub(crate) async fn insert_attribution(
    conn: &mut PgConnection,
    attribution: NewAttribution,
    lead_id: Uuid,
) -> Result<Option<ReferralAttribution>, AppError> {
    let row = attribution.into_attribution(Uuid::new_v4(), lead_id, Utc::now());
    let stored = sqlx::query_as::<Postgres, ReferralAttribution>(&format!(
        r#"
        INSERT INTO referral_attributions (
            id, referral_code, influencer_id, lead_id, booking_id, source, status,
            order_amount, commission_amount, payout_id, created_at, updated_at
        )
        SELECT $1, $2, i.id, $4, $5, $6, $7, $8, $9, $10, $11, $12
        FROM influencers i
        WHERE i.id = $3 AND i.status = 'active'
        RETURNING {}
        "#,
        ATTRIBUTION_COLUMNS
    ))
    .bind(row.id)
    .bind(&row.referral_code)
    .bind(row.influencer_id)
    .bind(row.lead_id)
    .bind(row.booking_id)
    .bind(row.source)
    .bind(row.status)
    .bind(row.order_amount)
    .bind(row.commission_amount)
    .bind(row.payout_id)
    .bind(row.created_at)
    .bind(row.updated_at)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(stored) = stored else {
        tracing::debug!(
            influencer_id = %row.influencer_id,
            lead_id = %lead_id,
            "Influencer no longer active, attribution skipped"
        );
        return Ok(None);
    };

    tracing::debug!(
        attribution_id = %stored.id,
        influencer_id = %stored.influencer_id,
        source = ?stored.source,
        "Referral attribution recorded"
    );
    Ok(Some(stored))
}
