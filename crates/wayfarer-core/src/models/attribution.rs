use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "attribution_source", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AttributionSource {
    Enquiry,
    Booking,
}

/// Settlement state of an attribution. Only ever advances tracked → eligible → paid.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "attribution_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AttributionStatus {
    Tracked,
    Eligible,
    Paid,
}

impl AttributionStatus {
    /// The single forward step allowed from this status.
    pub fn next(&self) -> Option<AttributionStatus> {
        match self {
            AttributionStatus::Tracked => Some(AttributionStatus::Eligible),
            AttributionStatus::Eligible => Some(AttributionStatus::Paid),
            AttributionStatus::Paid => None,
        }
    }

    pub fn can_advance_to(&self, target: AttributionStatus) -> bool {
        self.next() == Some(target)
    }
}

/// Link between a referral code and a lead (enquiry) or a booking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReferralAttribution {
    pub id: Uuid,
    pub referral_code: String,
    pub influencer_id: Uuid,
    pub lead_id: Uuid,
    pub booking_id: Option<Uuid>,
    pub source: AttributionSource,
    pub status: AttributionStatus,
    #[schema(value_type = Option<f64>)]
    pub order_amount: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub commission_amount: Option<Decimal>,
    /// Payout batch that claimed this row
    pub payout_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert shape; new attributions always start `tracked`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttribution {
    pub referral_code: String,
    pub influencer_id: Uuid,
    pub source: AttributionSource,
    pub booking_id: Option<Uuid>,
    pub order_amount: Option<Decimal>,
    pub commission_amount: Option<Decimal>,
}

impl NewAttribution {
    pub fn enquiry(referral_code: String, influencer_id: Uuid) -> Self {
        Self {
            referral_code,
            influencer_id,
            source: AttributionSource::Enquiry,
            booking_id: None,
            order_amount: None,
            commission_amount: None,
        }
    }

    pub fn into_attribution(
        self,
        id: Uuid,
        lead_id: Uuid,
        now: DateTime<Utc>,
    ) -> ReferralAttribution {
        ReferralAttribution {
            id,
            referral_code: self.referral_code,
            influencer_id: self.influencer_id,
            lead_id,
            booking_id: self.booking_id,
            source: self.source,
            status: AttributionStatus::Tracked,
            order_amount: self.order_amount,
            commission_amount: self.commission_amount,
            payout_id: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AttributionListQuery {
    #[serde(default)]
    pub influencer_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<AttributionStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_moves_forward_one_step() {
        use AttributionStatus::*;
        assert!(Tracked.can_advance_to(Eligible));
        assert!(Eligible.can_advance_to(Paid));
        assert!(!Tracked.can_advance_to(Paid));
        assert!(!Eligible.can_advance_to(Tracked));
        assert!(!Paid.can_advance_to(Eligible));
        assert!(!Paid.can_advance_to(Paid));
        assert!(Tracked < Eligible && Eligible < Paid);
    }
}
