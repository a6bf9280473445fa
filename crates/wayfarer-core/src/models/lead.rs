use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::constants::DEFAULT_LEAD_SOURCE;
use crate::error::AppError;
use crate::followup::FollowupCounts;

use super::activity::{ActivityPayload, LeadActivity};

/// Pipeline position of a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "lead_stage"))]
pub enum LeadStage {
    #[serde(rename = "New")]
    New,
    #[serde(rename = "Yet To Talk")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Yet To Talk"))]
    YetToTalk,
    #[serde(rename = "Followup")]
    Followup,
    #[serde(rename = "Hot")]
    Hot,
    #[serde(rename = "Proposal Presented")]
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Proposal Presented"))]
    ProposalPresented,
    #[serde(rename = "Converted")]
    Converted,
    #[serde(rename = "Cold")]
    Cold,
    #[serde(rename = "Lost")]
    Lost,
    #[serde(rename = "Duplicate")]
    Duplicate,
}

impl LeadStage {
    pub const ALL: [LeadStage; 9] = [
        LeadStage::New,
        LeadStage::YetToTalk,
        LeadStage::Followup,
        LeadStage::Hot,
        LeadStage::ProposalPresented,
        LeadStage::Converted,
        LeadStage::Cold,
        LeadStage::Lost,
        LeadStage::Duplicate,
    ];

    /// Stages the pipeline does not expect to leave.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            LeadStage::Converted | LeadStage::Lost | LeadStage::Duplicate
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStage::New => "New",
            LeadStage::YetToTalk => "Yet To Talk",
            LeadStage::Followup => "Followup",
            LeadStage::Hot => "Hot",
            LeadStage::ProposalPresented => "Proposal Presented",
            LeadStage::Converted => "Converted",
            LeadStage::Cold => "Cold",
            LeadStage::Lost => "Lost",
            LeadStage::Duplicate => "Duplicate",
        }
    }
}

impl Display for LeadStage {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LeadStage::ALL
            .into_iter()
            .find(|stage| stage.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown lead stage: {}", s)))
    }
}

/// A prospective customer moving through the sales pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Lead {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub stage: LeadStage,
    pub source: String,
    pub assigned_to: Option<String>,
    pub next_followup_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub destination_interest: Option<String>,
    pub budget_range: Option<String>,
    pub travel_month: Option<String>,
    pub travel_start_date: Option<NaiveDate>,
    pub travel_end_date: Option<NaiveDate>,
    pub pax_count: Option<i32>,
    pub referral_code: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_content: Option<String>,
    /// Booking materialized by conversion, if any
    pub booking_id: Option<Uuid>,
    /// Incremented on every update; used for compare-and-swap writes
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lead plus its activities, newest first.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeadDetail {
    #[serde(flatten)]
    pub lead: Lead,
    #[schema(value_type = Vec<Object>)]
    pub activities: Vec<LeadActivity>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateLeadRequest {
    #[validate(length(min = 1, max = 200, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub destination_interest: Option<String>,
    #[serde(default)]
    pub budget_range: Option<String>,
    #[serde(default)]
    pub travel_month: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, message = "Traveler count must be positive"))]
    pub pax_count: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub referral_code: Option<String>,
    #[serde(default)]
    pub utm_source: Option<String>,
    #[serde(default)]
    pub utm_campaign: Option<String>,
    #[serde(default)]
    pub utm_medium: Option<String>,
    #[serde(default)]
    pub utm_content: Option<String>,
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateLeadRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<LeadStage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_followup_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub travel_end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_interest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "Traveler count must be positive"))]
    pub pax_count: Option<i32>,
    /// Expected current version; a mismatch is rejected as a conflict
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

/// Insert shape for a lead. Stage always starts at `New`.
#[derive(Debug, Clone, Default)]
pub struct NewLead {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub source: String,
    pub destination_interest: Option<String>,
    pub budget_range: Option<String>,
    pub travel_month: Option<String>,
    pub pax_count: Option<i32>,
    pub notes: Option<String>,
    pub referral_code: Option<String>,
    pub utm_source: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_content: Option<String>,
}

impl From<CreateLeadRequest> for NewLead {
    fn from(req: CreateLeadRequest) -> Self {
        NewLead {
            name: req.name,
            email: req.email,
            phone: req.phone,
            source: req
                .source
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LEAD_SOURCE.to_string()),
            destination_interest: req.destination_interest,
            budget_range: req.budget_range,
            travel_month: req.travel_month,
            pax_count: req.pax_count,
            notes: req.notes,
            referral_code: req
                .referral_code
                .map(|c| crate::referral::normalize_referral_code(&c))
                .filter(|c| !c.is_empty()),
            utm_source: req.utm_source,
            utm_campaign: req.utm_campaign,
            utm_medium: req.utm_medium,
            utm_content: req.utm_content,
        }
    }
}

impl NewLead {
    /// Materializes the row a store would persist.
    pub fn into_lead(self, id: Uuid, now: DateTime<Utc>) -> Lead {
        Lead {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            stage: LeadStage::New,
            source: self.source,
            assigned_to: None,
            next_followup_at: None,
            notes: self.notes,
            tags: Vec::new(),
            destination_interest: self.destination_interest,
            budget_range: self.budget_range,
            travel_month: self.travel_month,
            travel_start_date: None,
            travel_end_date: None,
            pax_count: self.pax_count,
            referral_code: self.referral_code,
            utm_source: self.utm_source,
            utm_campaign: self.utm_campaign,
            utm_medium: self.utm_medium,
            utm_content: self.utm_content,
            booking_id: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of applying an update to a lead: the new row and the activities it implies.
#[derive(Debug, Clone)]
pub struct LeadChange {
    pub lead: Lead,
    pub activities: Vec<ActivityPayload>,
}

impl Lead {
    /// Applies `req` on top of the current row.
    ///
    /// A stage change yields exactly one `status_change` activity; a supplied
    /// followup that differs from the stored one yields a `followup_scheduled`
    /// activity. The version is bumped unconditionally.
    pub fn apply_update(&self, req: &UpdateLeadRequest, now: DateTime<Utc>) -> LeadChange {
        let mut lead = self.clone();
        let mut activities = Vec::new();

        if let Some(name) = &req.name {
            lead.name = name.clone();
        }
        if let Some(email) = &req.email {
            lead.email = Some(email.clone());
        }
        if let Some(phone) = &req.phone {
            lead.phone = Some(phone.clone());
        }
        if let Some(stage) = req.stage {
            if stage != self.stage {
                activities.push(ActivityPayload::StatusChange {
                    from: self.stage,
                    to: stage,
                });
            }
            lead.stage = stage;
        }
        if let Some(assigned_to) = &req.assigned_to {
            lead.assigned_to = Some(assigned_to.clone());
        }
        if let Some(followup) = req.next_followup_at {
            if self.next_followup_at != Some(followup) {
                activities.push(ActivityPayload::FollowupScheduled { date: followup });
            }
            lead.next_followup_at = Some(followup);
        }
        if let Some(notes) = &req.notes {
            lead.notes = Some(notes.clone());
        }
        if let Some(tags) = &req.tags {
            let mut tags = tags.clone();
            tags.sort();
            tags.dedup();
            lead.tags = tags;
        }
        if let Some(start) = req.travel_start_date {
            lead.travel_start_date = Some(start);
        }
        if let Some(end) = req.travel_end_date {
            lead.travel_end_date = Some(end);
        }
        if let Some(destination) = &req.destination_interest {
            lead.destination_interest = Some(destination.clone());
        }
        if let Some(budget) = &req.budget_range {
            lead.budget_range = Some(budget.clone());
        }
        if let Some(pax) = req.pax_count {
            lead.pax_count = Some(pax);
        }

        lead.version = self.version + 1;
        lead.updated_at = now;

        LeadChange { lead, activities }
    }
}

/// List filters; all optional and combined with AND.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct LeadFilter {
    #[serde(default)]
    pub stage: Option<LeadStage>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Case-insensitive substring over name, email and phone
    #[serde(default)]
    pub search: Option<String>,
}

impl LeadFilter {
    pub fn matches(&self, lead: &Lead) -> bool {
        if self.stage.is_some_and(|s| s != lead.stage) {
            return false;
        }
        if let Some(source) = &self.source {
            if &lead.source != source {
                return false;
            }
        }
        if let Some(assignee) = &self.assigned_to {
            if lead.assigned_to.as_ref() != Some(assignee) {
                return false;
            }
        }
        if let Some(term) = self.search.as_ref().map(|s| s.to_lowercase()) {
            let hit = |field: Option<&String>| {
                field.is_some_and(|value| value.to_lowercase().contains(&term))
            };
            if !(hit(Some(&lead.name)) || hit(lead.email.as_ref()) || hit(lead.phone.as_ref())) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StageCount {
    pub stage: LeadStage,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SourceCount {
    pub source: String,
    pub count: i64,
}

/// Active (non-terminal) leads per assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AssigneeCount {
    pub assigned_to: String,
    pub count: i64,
}

/// Aggregates a store computes for the dashboard. Followup timestamps are bucketed
/// by the caller against the request time.
#[derive(Debug, Clone, Default)]
pub struct LeadAggregates {
    pub stages: Vec<StageCount>,
    pub sources: Vec<SourceCount>,
    pub assignees: Vec<AssigneeCount>,
    pub followups: Vec<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CrmDashboard {
    pub stages: Vec<StageCount>,
    pub followups: FollowupCounts,
    pub sources: Vec<SourceCount>,
    pub assignees: Vec<AssigneeCount>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lead() -> Lead {
        NewLead {
            name: "Asha".to_string(),
            email: Some("asha@x.com".to_string()),
            phone: Some("+91 98200 00000".to_string()),
            source: "website".to_string(),
            ..Default::default()
        }
        .into_lead(Uuid::new_v4(), Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap())
    }

    #[test]
    fn test_stage_serializes_with_spaces() {
        assert_eq!(
            serde_json::to_string(&LeadStage::YetToTalk).unwrap(),
            "\"Yet To Talk\""
        );
        let parsed: LeadStage = serde_json::from_str("\"Proposal Presented\"").unwrap();
        assert_eq!(parsed, LeadStage::ProposalPresented);
        assert_eq!("hot".parse::<LeadStage>().unwrap(), LeadStage::Hot);
    }

    #[test]
    fn test_terminal_stages() {
        let terminal: Vec<_> = LeadStage::ALL.into_iter().filter(|s| s.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![LeadStage::Converted, LeadStage::Lost, LeadStage::Duplicate]
        );
    }

    #[test]
    fn test_stage_change_records_one_activity() {
        let lead = lead();
        let change = lead.apply_update(
            &UpdateLeadRequest {
                stage: Some(LeadStage::Hot),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(change.lead.stage, LeadStage::Hot);
        assert_eq!(change.lead.version, lead.version + 1);
        assert_eq!(
            change.activities,
            vec![ActivityPayload::StatusChange {
                from: LeadStage::New,
                to: LeadStage::Hot
            }]
        );
    }

    #[test]
    fn test_same_stage_records_nothing() {
        let lead = lead();
        let change = lead.apply_update(
            &UpdateLeadRequest {
                stage: Some(LeadStage::New),
                notes: Some("called twice".to_string()),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(change.activities.is_empty());
        assert_eq!(change.lead.notes.as_deref(), Some("called twice"));
    }

    #[test]
    fn test_followup_only_when_changed() {
        let mut lead = lead();
        let at = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
        let change = lead.apply_update(
            &UpdateLeadRequest {
                next_followup_at: Some(at),
                ..Default::default()
            },
            Utc::now(),
        );
        assert_eq!(
            change.activities,
            vec![ActivityPayload::FollowupScheduled { date: at }]
        );

        lead.next_followup_at = Some(at);
        let again = lead.apply_update(
            &UpdateLeadRequest {
                next_followup_at: Some(at),
                ..Default::default()
            },
            Utc::now(),
        );
        assert!(again.activities.is_empty());
    }

    #[test]
    fn test_filter_search_is_case_insensitive() {
        let lead = lead();
        let filter = LeadFilter {
            search: Some("ASHA@".to_string()),
            ..Default::default()
        };
        assert!(filter.matches(&lead));
        let miss = LeadFilter {
            stage: Some(LeadStage::Hot),
            ..Default::default()
        };
        assert!(!miss.matches(&lead));
    }

    #[test]
    fn test_new_lead_defaults_source_and_uppercases_code() {
        let req = CreateLeadRequest {
            name: "Ravi".to_string(),
            email: None,
            phone: None,
            source: None,
            destination_interest: None,
            budget_range: None,
            travel_month: None,
            pax_count: None,
            notes: None,
            referral_code: Some(" nsv-abc234 ".to_string()),
            utm_source: None,
            utm_campaign: None,
            utm_medium: None,
            utm_content: None,
        };
        let new: NewLead = req.into();
        assert_eq!(new.source, "website");
        assert_eq!(new.referral_code.as_deref(), Some("NSV-ABC234"));
    }
}
