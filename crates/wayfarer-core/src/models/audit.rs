use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "audit_action", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    Upload,
}

impl Display for AuditAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AuditAction::Create => write!(f, "create"),
            AuditAction::Update => write!(f, "update"),
            AuditAction::Delete => write!(f, "delete"),
            AuditAction::Upload => write!(f, "upload"),
        }
    }
}

/// Immutable record of an administrative mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    #[schema(value_type = Object)]
    pub changes: JsonValue,
    pub created_at: DateTime<Utc>,
}

/// What a mutation did, minus who did it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub changes: JsonValue,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        entity_type: &'static str,
        entity_id: impl ToString,
        changes: JsonValue,
    ) -> Self {
        Self {
            action,
            entity_type,
            entity_id: entity_id.to_string(),
            changes,
        }
    }

    pub fn into_entry(self, actor: &str, now: DateTime<Utc>) -> AuditLogEntry {
        AuditLogEntry {
            id: Uuid::new_v4(),
            actor: actor.to_string(),
            action: self.action,
            entity_type: self.entity_type.to_string(),
            entity_id: self.entity_id,
            changes: self.changes,
            created_at: now,
        }
    }
}

/// The result of a mutating operation paired with the audit event describing it.
#[derive(Debug, Clone)]
pub struct Audited<T> {
    pub value: T,
    pub event: AuditEvent,
}

impl<T> Audited<T> {
    pub fn new(value: T, event: AuditEvent) -> Self {
        Self { value, event }
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct AuditLogQuery {
    #[serde(default)]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub limit: Option<i64>,
}

/// Entity type tags used in audit entries.
pub mod entity {
    pub const LEAD: &str = "lead";
    pub const LEAD_ACTIVITY: &str = "lead_activity";
    pub const BOOKING: &str = "booking";
    pub const ENQUIRY: &str = "enquiry";
    pub const INFLUENCER: &str = "influencer";
    pub const INFLUENCER_REQUEST: &str = "influencer_request";
    pub const INFLUENCER_PAYOUT: &str = "influencer_payout";
    pub const REFERRAL_ATTRIBUTION: &str = "referral_attribution";
    pub const ADMIN_ROLE: &str = "admin_role";
    pub const LEGAL_DOCUMENT: &str = "legal_document";
    pub const LEGAL_DOCUMENT_PDF: &str = "legal_document_pdf";
}
