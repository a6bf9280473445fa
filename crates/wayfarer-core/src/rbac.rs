//! Role-based access control
//!
//! The policy is an immutable table from role to granted (resource, action) pairs.
//! It is built once at startup and shared behind an `Arc`; there is no way to mutate
//! it at runtime. `founder` holds a wildcard grant, every other role needs an exact
//! resource match with the requested action listed.

use std::collections::{HashMap, HashSet};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Administrative role resolved from the `admin_roles` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "admin_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Founder,
    Admin,
    Support,
    Bookings,
    Marketing,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Founder,
        Role::Admin,
        Role::Support,
        Role::Bookings,
        Role::Marketing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Founder => "founder",
            Role::Admin => "admin",
            Role::Support => "support",
            Role::Bookings => "bookings",
            Role::Marketing => "marketing",
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str() == s.to_lowercase())
            .ok_or_else(|| AppError::InvalidInput(format!("Unknown role: {}", s)))
    }
}

/// Protected resource names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Destinations,
    Packages,
    Offers,
    Testimonials,
    Leads,
    LeadActivities,
    Bookings,
    Invoices,
    Settings,
    AdPlacements,
    Team,
    AuditLogs,
}

impl Resource {
    pub const ALL: [Resource; 12] = [
        Resource::Destinations,
        Resource::Packages,
        Resource::Offers,
        Resource::Testimonials,
        Resource::Leads,
        Resource::LeadActivities,
        Resource::Bookings,
        Resource::Invoices,
        Resource::Settings,
        Resource::AdPlacements,
        Resource::Team,
        Resource::AuditLogs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Destinations => "destinations",
            Resource::Packages => "packages",
            Resource::Offers => "offers",
            Resource::Testimonials => "testimonials",
            Resource::Leads => "leads",
            Resource::LeadActivities => "lead_activities",
            Resource::Bookings => "bookings",
            Resource::Invoices => "invoices",
            Resource::Settings => "settings",
            Resource::AdPlacements => "ad_placements",
            Resource::Team => "team",
            Resource::AuditLogs => "audit_logs",
        }
    }
}

impl Display for Resource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Read,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Read, Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Read => "read",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
enum Grant {
    Everything,
    Resources(HashMap<Resource, HashSet<Action>>),
}

/// Immutable role → grants table.
#[derive(Debug, Clone)]
pub struct RbacPolicy {
    grants: HashMap<Role, Grant>,
}

const CRUD: &[Action] = &[Action::Read, Action::Create, Action::Update, Action::Delete];

impl RbacPolicy {
    /// The agency's role table.
    pub fn standard() -> Self {
        let mut grants = HashMap::new();
        grants.insert(Role::Founder, Grant::Everything);
        grants.insert(
            Role::Admin,
            resources(&[
                (Resource::Destinations, CRUD),
                (Resource::Packages, CRUD),
                (Resource::Offers, CRUD),
                (Resource::Testimonials, CRUD),
                (Resource::Leads, CRUD),
                (Resource::Bookings, CRUD),
                (Resource::Invoices, CRUD),
                (Resource::Settings, &[Action::Read, Action::Update]),
            ]),
        );
        grants.insert(
            Role::Support,
            resources(&[
                (
                    Resource::Leads,
                    &[Action::Read, Action::Create, Action::Update],
                ),
                (Resource::LeadActivities, &[Action::Read, Action::Create]),
                (Resource::Bookings, &[Action::Read]),
            ]),
        );
        grants.insert(
            Role::Bookings,
            resources(&[
                (Resource::Leads, &[Action::Read]),
                (
                    Resource::Bookings,
                    &[Action::Read, Action::Create, Action::Update],
                ),
                (
                    Resource::Invoices,
                    &[Action::Read, Action::Create, Action::Update],
                ),
            ]),
        );
        grants.insert(
            Role::Marketing,
            resources(&[
                (Resource::Offers, CRUD),
                (Resource::AdPlacements, CRUD),
                (Resource::Leads, &[Action::Read]),
            ]),
        );
        Self { grants }
    }

    pub fn has_permission(&self, role: Role, resource: Resource, action: Action) -> bool {
        match self.grants.get(&role) {
            Some(Grant::Everything) => true,
            Some(Grant::Resources(table)) => table
                .get(&resource)
                .is_some_and(|actions| actions.contains(&action)),
            None => false,
        }
    }

    pub fn require_permission(
        &self,
        role: Role,
        resource: Resource,
        action: Action,
    ) -> Result<(), AppError> {
        if self.has_permission(role, resource, action) {
            Ok(())
        } else {
            Err(AppError::PermissionDenied(format!(
                "{} cannot {} {}",
                role, action, resource
            )))
        }
    }
}

impl Default for RbacPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

fn resources(entries: &[(Resource, &[Action])]) -> Grant {
    Grant::Resources(
        entries
            .iter()
            .map(|(resource, actions)| (*resource, actions.iter().copied().collect()))
            .collect(),
    )
}
