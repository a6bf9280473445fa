use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt::{Display, Formatter, Result as FmtResult};
use utoipa::ToSchema;
use uuid::Uuid;

use super::lead::LeadStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "activity_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Call,
    Whatsapp,
    Email,
    Note,
    StatusChange,
    FollowupScheduled,
    Converted,
}

impl ActivityType {
    /// Types only the system writes; they cannot be posted by hand.
    pub fn is_system(&self) -> bool {
        matches!(self, ActivityType::StatusChange | ActivityType::Converted)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Call => "call",
            ActivityType::Whatsapp => "whatsapp",
            ActivityType::Email => "email",
            ActivityType::Note => "note",
            ActivityType::StatusChange => "status_change",
            ActivityType::FollowupScheduled => "followup_scheduled",
            ActivityType::Converted => "converted",
        }
    }
}

impl Display for ActivityType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

/// Free-text record of a call, message or email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteBody {
    pub message: String,
}

/// Activity kind together with its statically known payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ActivityPayload {
    Call(Interaction),
    Whatsapp(Interaction),
    Email(Interaction),
    Note(NoteBody),
    StatusChange { from: LeadStage, to: LeadStage },
    FollowupScheduled { date: DateTime<Utc> },
    Converted { booking_code: String },
}

impl ActivityPayload {
    pub fn note(message: impl Into<String>) -> Self {
        ActivityPayload::Note(NoteBody {
            message: message.into(),
        })
    }

    pub fn activity_type(&self) -> ActivityType {
        match self {
            ActivityPayload::Call(_) => ActivityType::Call,
            ActivityPayload::Whatsapp(_) => ActivityType::Whatsapp,
            ActivityPayload::Email(_) => ActivityType::Email,
            ActivityPayload::Note(_) => ActivityType::Note,
            ActivityPayload::StatusChange { .. } => ActivityType::StatusChange,
            ActivityPayload::FollowupScheduled { .. } => ActivityType::FollowupScheduled,
            ActivityPayload::Converted { .. } => ActivityType::Converted,
        }
    }

    /// Rebuilds a payload from its stored (type, JSON body) pair.
    pub fn from_parts(
        activity_type: ActivityType,
        payload: JsonValue,
    ) -> Result<Self, serde_json::Error> {
        let payload = match payload {
            JsonValue::Null => JsonValue::Object(Default::default()),
            other => other,
        };
        serde_json::from_value(serde_json::json!({
            "type": activity_type,
            "payload": payload,
        }))
    }

    /// The JSON body stored next to the type column.
    pub fn payload_json(&self) -> JsonValue {
        serde_json::to_value(self)
            .ok()
            .and_then(|mut tagged| tagged.get_mut("payload").map(JsonValue::take))
            .unwrap_or(JsonValue::Null)
    }
}

/// Immutable event attached to a lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadActivity {
    pub id: Uuid,
    pub lead_id: Uuid,
    #[serde(flatten)]
    pub payload: ActivityPayload,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// Body of a manual activity post: `{ "type": "...", "payload": { ... } }`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateActivityRequest {
    #[serde(rename = "type")]
    pub activity_type: ActivityType,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub payload: JsonValue,
}
