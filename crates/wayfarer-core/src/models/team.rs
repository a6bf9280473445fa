use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::rbac::Role;

/// Grants one of the admin roles to an identity-provider user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AdminRoleAssignment {
    pub id: Uuid,
    pub user_id: String,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, Validate)]
pub struct CreateAdminRole {
    #[validate(length(min = 1, max = 200, message = "User id is required"))]
    pub user_id: String,
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateAdminRole {
    pub role: Role,
    pub is_active: bool,
}

/// Answer to "is the caller an admin?"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AdminCheck {
    pub is_admin: bool,
    pub role: Option<Role>,
}
