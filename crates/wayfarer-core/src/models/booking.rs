use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::constants::{DEFAULT_BOOKING_CURRENCY, DEFAULT_BOOKING_TYPE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "booking_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Draft,
    Confirmed,
    Cancelled,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traveler {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    /// Anything else the agent captured (passport, meal preference, ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, JsonValue>,
}

/// Booking materialized from a converted lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: Uuid,
    pub booking_code: String,
    pub lead_id: Uuid,
    pub package_id: Option<String>,
    pub booking_type: String,
    #[cfg_attr(feature = "sqlx", sqlx(json))]
    #[schema(value_type = Vec<Object>)]
    pub travelers: Vec<Traveler>,
    #[schema(value_type = f64)]
    pub total_amount: Decimal,
    pub currency: String,
    pub travel_start_date: Option<NaiveDate>,
    pub travel_end_date: Option<NaiveDate>,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

fn validate_amount(value: &Decimal) -> Result<(), ValidationError> {
    super::check_money(value, "Total amount")
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct ConvertLeadRequest {
    #[serde(default)]
    pub booking_type: Option<String>,
    #[serde(default)]
    pub package_id: Option<String>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub travelers: Vec<Traveler>,
    #[serde(default)]
    #[schema(value_type = f64)]
    #[validate(custom(function = "validate_amount"))]
    pub total_amount: Decimal,
    #[serde(default)]
    #[validate(length(equal = 3, message = "Currency must be a 3-letter code"))]
    pub currency: Option<String>,
    #[serde(default)]
    pub travel_start_date: Option<NaiveDate>,
    #[serde(default)]
    pub travel_end_date: Option<NaiveDate>,
}

impl ConvertLeadRequest {
    /// Builds the draft booking row for `lead_id`.
    pub fn into_booking(
        self,
        id: Uuid,
        lead_id: Uuid,
        booking_code: String,
        now: DateTime<Utc>,
    ) -> Booking {
        Booking {
            id,
            booking_code,
            lead_id,
            package_id: self.package_id,
            booking_type: self
                .booking_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BOOKING_TYPE.to_string()),
            travelers: self.travelers,
            total_amount: self.total_amount,
            currency: self
                .currency
                .map(|c| c.to_ascii_uppercase())
                .unwrap_or_else(|| DEFAULT_BOOKING_CURRENCY.to_string()),
            travel_start_date: self.travel_start_date,
            travel_end_date: self.travel_end_date,
            status: BookingStatus::Draft,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ConversionReceipt {
    pub id: Uuid,
    pub booking_code: String,
    pub lead_id: Uuid,
}

impl From<&Booking> for ConversionReceipt {
    fn from(booking: &Booking) -> Self {
        Self {
            id: booking.id,
            booking_code: booking.booking_code.clone(),
            lead_id: booking.lead_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied() {
        let booking = ConvertLeadRequest::default().into_booking(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "NSV1736467200000042".to_string(),
            Utc::now(),
        );
        assert_eq!(booking.booking_type, "custom");
        assert_eq!(booking.currency, "INR");
        assert_eq!(booking.total_amount, Decimal::ZERO);
        assert_eq!(booking.status, BookingStatus::Draft);
    }

    #[test]
    fn test_traveler_keeps_extra_fields() {
        let traveler: Traveler =
            serde_json::from_value(serde_json::json!({"name": "Asha", "age": 31, "passport": "Z123"}))
                .unwrap();
        assert_eq!(traveler.age, Some(31));
        assert_eq!(traveler.extra["passport"], "Z123");
        let back = serde_json::to_value(&traveler).unwrap();
        assert_eq!(back["passport"], "Z123");
    }

    #[test]
    fn test_negative_amount_rejected() {
        let req = ConvertLeadRequest {
            total_amount: Decimal::new(-5, 0),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_amount_beyond_money_column_rejected() {
        let req = ConvertLeadRequest {
            total_amount: "10000000000000000000000000000".parse().unwrap(),
            ..Default::default()
        };
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("total_amount"));

        let req = ConvertLeadRequest {
            total_amount: crate::constants::MAX_MONEY_AMOUNT,
            ..Default::default()
        };
        assert!(req.validate().is_ok());
    }
}
