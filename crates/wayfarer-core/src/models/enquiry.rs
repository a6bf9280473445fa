use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::constants::DEFAULT_LEAD_SOURCE;

use super::lead::NewLead;

/// Raw contact-form submission. Every enquiry also opens a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Enquiry {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub destination_interest: Option<String>,
    pub budget_range: Option<String>,
    pub travel_month: Option<String>,
    pub message: Option<String>,
    pub source: String,
    pub referral_code: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct SubmitEnquiryRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub destination_interest: Option<String>,
    #[serde(default)]
    pub budget_range: Option<String>,
    #[serde(default)]
    pub travel_month: Option<String>,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub message: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Query string accepted on enquiry submission (`?ref=NSV-XXXXXX`).
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EnquiryReferral {
    #[serde(default, rename = "ref")]
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EnquiryReceipt {
    pub id: Uuid,
    pub lead_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkEnquiryRead {
    pub is_read: bool,
}

/// Enquiry insert shape; the lead id is assigned by the store.
#[derive(Debug, Clone)]
pub struct NewEnquiry {
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub destination_interest: Option<String>,
    pub budget_range: Option<String>,
    pub travel_month: Option<String>,
    pub message: Option<String>,
    pub source: String,
    pub referral_code: Option<String>,
}

impl NewEnquiry {
    pub fn from_request(req: SubmitEnquiryRequest, referral_code: Option<String>) -> Self {
        Self {
            name: req.name,
            email: req.email,
            phone: req.phone,
            destination_interest: req.destination_interest,
            budget_range: req.budget_range,
            travel_month: req.travel_month,
            message: req.message,
            source: req
                .source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEAD_SOURCE.to_string()),
            referral_code,
        }
    }

    /// The lead opened alongside this enquiry.
    pub fn lead(&self) -> NewLead {
        NewLead {
            name: self.name.clone(),
            email: Some(self.email.clone()),
            phone: self.phone.clone(),
            source: self.source.clone(),
            destination_interest: self.destination_interest.clone(),
            budget_range: self.budget_range.clone(),
            travel_month: self.travel_month.clone(),
            notes: self.message.clone(),
            referral_code: self.referral_code.clone(),
            ..Default::default()
        }
    }

    pub fn into_enquiry(self, id: Uuid, lead_id: Uuid, now: DateTime<Utc>) -> Enquiry {
        Enquiry {
            id,
            lead_id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            destination_interest: self.destination_interest,
            budget_range: self.budget_range,
            travel_month: self.travel_month,
            message: self.message,
            source: self.source,
            referral_code: self.referral_code,
            is_read: false,
            created_at: now,
        }
    }
}
