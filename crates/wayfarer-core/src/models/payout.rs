use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::attribution::{AttributionSource, AttributionStatus, ReferralAttribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "payout_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
    Pending,
    Paid,
}

/// Period-bounded commission settlement for one influencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InfluencerPayout {
    pub id: Uuid,
    pub influencer_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub total_bookings: i64,
    #[schema(value_type = f64)]
    pub total_revenue: Decimal,
    #[schema(value_type = f64)]
    pub total_commission: Decimal,
    pub status: PayoutStatus,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Payout row joined with the influencer's display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PayoutListItem {
    #[serde(flatten)]
    #[cfg_attr(feature = "sqlx", sqlx(flatten))]
    pub payout: InfluencerPayout,
    pub influencer_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatePayoutRequest {
    pub influencer_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MarkPayoutPaidRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct PayoutListQuery {
    #[serde(default)]
    pub influencer_id: Option<Uuid>,
}

/// Outcome of marking a batch paid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PayoutSettlement {
    pub payout: InfluencerPayout,
    /// Attributions flipped to `paid` by this call (zero on a repeat)
    pub attributions_paid: u64,
}

/// Aggregate over the attributions a batch claims.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutTotals {
    pub total_bookings: i64,
    pub total_revenue: Decimal,
    pub total_commission: Decimal,
}

impl PayoutTotals {
    pub fn tally<'a, I>(attributions: I) -> Self
    where
        I: IntoIterator<Item = &'a ReferralAttribution>,
    {
        attributions
            .into_iter()
            .fold(PayoutTotals::default(), |mut totals, attribution| {
                totals.total_bookings += 1;
                totals.total_revenue += attribution.order_amount.unwrap_or_default();
                totals.total_commission += attribution.commission_amount.unwrap_or_default();
                totals
            })
    }
}

/// Whether an attribution belongs in a new batch for `influencer_id` over the inclusive period.
pub fn is_payable_in_period(
    attribution: &ReferralAttribution,
    influencer_id: Uuid,
    period_start: NaiveDate,
    period_end: NaiveDate,
) -> bool {
    let day = attribution.created_at.date_naive();
    attribution.influencer_id == influencer_id
        && attribution.source == AttributionSource::Booking
        && attribution.status == AttributionStatus::Eligible
        && attribution.payout_id.is_none()
        && day >= period_start
        && day <= period_end
}
