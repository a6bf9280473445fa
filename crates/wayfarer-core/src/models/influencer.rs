use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "influencer_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum InfluencerStatus {
    Active,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "commission_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum CommissionType {
    Percent,
    Fixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "request_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

/// External partner who refers customers through a unique code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Influencer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub instagram_handle: Option<String>,
    pub youtube_channel: Option<String>,
    pub referral_code: String,
    pub status: InfluencerStatus,
    pub commission_type: CommissionType,
    #[schema(value_type = f64)]
    pub commission_value: Decimal,
    pub attribution_window_days: i32,
    pub payout_preference: Option<String>,
    pub payout_details: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Influencer {
    pub fn is_active(&self) -> bool {
        self.status == InfluencerStatus::Active
    }
}

/// Application submitted through the public form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InfluencerRequest {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub instagram_handle: Option<String>,
    pub youtube_channel: Option<String>,
    pub audience_size: Option<i32>,
    pub niche: Option<String>,
    pub preferred_destinations: Option<String>,
    pub payout_preference: Option<String>,
    pub payout_details: Option<String>,
    pub message: Option<String>,
    pub status: RequestStatus,
    /// Influencer created on approval
    pub influencer_id: Option<Uuid>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubmitInfluencerRequest {
    #[validate(length(min = 2, max = 200, message = "Name must be at least 2 characters"))]
    pub full_name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub instagram_handle: Option<String>,
    #[serde(default)]
    pub youtube_channel: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Audience size must be positive"))]
    pub audience_size: Option<i32>,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub preferred_destinations: Option<String>,
    #[serde(default)]
    pub payout_preference: Option<String>,
    #[serde(default)]
    pub payout_details: Option<String>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SocialHandles {
    #[serde(default)]
    pub instagram: Option<String>,
    #[serde(default)]
    pub youtube: Option<String>,
}

fn validate_non_negative(value: &Decimal) -> Result<(), ValidationError> {
    super::check_money(value, "Commission value")
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateInfluencer {
    #[validate(length(min = 2, max = 200, message = "Name must be at least 2 characters"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub social_handles: Option<SocialHandles>,
    pub commission_type: CommissionType,
    #[schema(value_type = f64)]
    #[validate(custom(function = "validate_non_negative"))]
    pub commission_value: Decimal,
    #[serde(default)]
    #[validate(range(min = 1, message = "Attribution window must be at least one day"))]
    pub attribution_window_days: Option<i32>,
    #[serde(default)]
    pub payout_preference: Option<String>,
    #[serde(default)]
    pub payout_details: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateInfluencer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 200, message = "Name must be at least 2 characters"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub social_handles: Option<SocialHandles>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<InfluencerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_type: Option<CommissionType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<f64>)]
    #[validate(custom(function = "validate_non_negative"))]
    pub commission_value: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Attribution window must be at least one day"))]
    pub attribution_window_days: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payout_details: Option<String>,
}

impl Influencer {
    pub fn apply_update(&self, patch: &UpdateInfluencer, now: DateTime<Utc>) -> Influencer {
        let mut next = self.clone();
        if let Some(name) = &patch.name {
            next.name = name.clone();
        }
        if let Some(phone) = &patch.phone {
            next.phone = Some(phone.clone());
        }
        if let Some(handles) = &patch.social_handles {
            next.instagram_handle = handles.instagram.clone();
            next.youtube_channel = handles.youtube.clone();
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(kind) = patch.commission_type {
            next.commission_type = kind;
        }
        if let Some(value) = patch.commission_value {
            next.commission_value = value;
        }
        if let Some(days) = patch.attribution_window_days {
            next.attribution_window_days = days;
        }
        if let Some(pref) = &patch.payout_preference {
            next.payout_preference = Some(pref.clone());
        }
        if let Some(details) = &patch.payout_details {
            next.payout_details = Some(details.clone());
        }
        next.updated_at = now;
        next
    }
}

/// Admin decision on a pending application.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct ReviewInfluencerRequest {
    pub status: RequestStatus,
    #[serde(default)]
    pub commission_type: Option<CommissionType>,
    #[serde(default)]
    #[schema(value_type = Option<f64>)]
    #[validate(custom(function = "validate_non_negative"))]
    pub commission_value: Option<Decimal>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Attribution window must be at least one day"))]
    pub attribution_window_days: Option<i32>,
}

/// Insert shape for an influencer; the code is generated by the caller.
#[derive(Debug, Clone)]
pub struct NewInfluencer {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub instagram_handle: Option<String>,
    pub youtube_channel: Option<String>,
    pub referral_code: String,
    pub commission_type: CommissionType,
    pub commission_value: Decimal,
    pub attribution_window_days: i32,
    pub payout_preference: Option<String>,
    pub payout_details: Option<String>,
}

impl NewInfluencer {
    pub fn into_influencer(self, id: Uuid, now: DateTime<Utc>) -> Influencer {
        Influencer {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            instagram_handle: self.instagram_handle,
            youtube_channel: self.youtube_channel,
            referral_code: self.referral_code,
            status: InfluencerStatus::Active,
            commission_type: self.commission_type,
            commission_value: self.commission_value,
            attribution_window_days: self.attribution_window_days,
            payout_preference: self.payout_preference,
            payout_details: self.payout_details,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InfluencerCreated {
    pub id: Uuid,
    pub referral_code: String,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RequestListQuery {
    #[serde(default)]
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ValidateCodeQuery {
    #[serde(default)]
    pub code: Option<String>,
}

/// Public answer to "is this referral code usable?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReferralCodeCheck {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub influencer_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ReferralCodeCheck {
    pub fn invalid() -> Self {
        Self {
            valid: false,
            influencer_name: None,
            code: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InfluencerPerformance {
    pub id: Uuid,
    pub name: String,
    pub referral_code: String,
    pub total_attributions: i64,
    pub total_bookings: i64,
    #[schema(value_type = f64)]
    pub total_revenue: Decimal,
    #[schema(value_type = f64)]
    pub total_commission: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct InfluencerAnalytics {
    pub total_influencers: i64,
    pub total_attributions: i64,
    pub total_bookings: i64,
    /// Revenue from eligible booking attributions
    #[schema(value_type = f64)]
    pub total_revenue: Decimal,
    pub top_influencers: Vec<InfluencerPerformance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_commission_rejected() {
        let req = CreateInfluencer {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            phone: None,
            social_handles: None,
            commission_type: CommissionType::Fixed,
            commission_value: Decimal::new(-1, 0),
            attribution_window_days: None,
            payout_preference: None,
            payout_details: None,
        };
        assert!(req.validate().is_err());

        let oversized = CreateInfluencer {
            commission_value: Decimal::new(i64::MAX, 0),
            ..req
        };
        assert!(oversized.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let req = CreateInfluencer {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            phone: None,
            social_handles: None,
            commission_type: CommissionType::Percent,
            commission_value: Decimal::new(75, 1),
            attribution_window_days: Some(0),
            payout_preference: None,
            payout_details: None,
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_pause_via_update() {
        let influencer = NewInfluencer {
            name: "Meera".to_string(),
            email: "meera@example.com".to_string(),
            phone: None,
            instagram_handle: None,
            youtube_channel: None,
            referral_code: "NSV-ABCDEF".to_string(),
            commission_type: CommissionType::Percent,
            commission_value: Decimal::new(5, 0),
            attribution_window_days: 30,
            payout_preference: None,
            payout_details: None,
        }
        .into_influencer(Uuid::new_v4(), Utc::now());
        assert!(influencer.is_active());

        let paused = influencer.apply_update(
            &UpdateInfluencer {
                status: Some(InfluencerStatus::Paused),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(!paused.is_active());
        assert_eq!(paused.referral_code, influencer.referral_code);
    }
}
