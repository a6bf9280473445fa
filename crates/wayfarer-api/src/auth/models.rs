use crate::error::HttpAppError;
use axum::{extract::FromRequestParts, http::request::Parts};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use wayfarer_core::{Action, AppError, RbacPolicy, Resource, Role};

/// Caller identity as reported by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture: Option<String>,
}

/// Signed-in user, inserted by the session middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Not signed in".to_string())))
    }
}

/// Admin identity and resolved role, inserted by the admin middleware.
#[derive(Debug, Clone)]
pub struct AdminContext {
    pub user: User,
    pub role: Role,
    policy: Arc<RbacPolicy>,
}

impl AdminContext {
    pub fn new(user: User, role: Role, policy: Arc<RbacPolicy>) -> Self {
        Self { user, role, policy }
    }

    /// Identifier recorded as the actor of activities and audit entries.
    pub fn actor(&self) -> &str {
        &self.user.id
    }

    pub fn require(&self, resource: Resource, action: Action) -> Result<(), AppError> {
        self.policy.require_permission(self.role, resource, action)
    }

    /// Passes when any one of `grants` is held; the error names the first.
    pub fn require_any(&self, grants: &[(Resource, Action)]) -> Result<(), AppError> {
        if grants
            .iter()
            .any(|(resource, action)| self.policy.has_permission(self.role, *resource, *action))
        {
            return Ok(());
        }
        match grants.first() {
            Some((resource, action)) => self.require(*resource, *action),
            None => Err(AppError::PermissionDenied(format!(
                "{} has no matching grant",
                self.role
            ))),
        }
    }
}

impl<S> FromRequestParts<S> for AdminContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminContext>()
            .cloned()
            .ok_or_else(|| HttpAppError(AppError::Unauthorized("Not signed in".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(role: Role) -> AdminContext {
        AdminContext::new(
            User {
                id: "user-1".to_string(),
                email: "ops@example.com".to_string(),
                name: None,
                picture: None,
            },
            role,
            Arc::new(RbacPolicy::standard()),
        )
    }

    #[test]
    fn test_require_any_accepts_either_grant() {
        let support = context(Role::Support);
        assert!(support
            .require_any(&[
                (Resource::LeadActivities, Action::Create),
                (Resource::Leads, Action::Update),
            ])
            .is_ok());

        let marketing = context(Role::Marketing);
        let err = marketing
            .require_any(&[
                (Resource::LeadActivities, Action::Create),
                (Resource::Leads, Action::Update),
            ])
            .unwrap_err();
        assert!(matches!(err, AppError::PermissionDenied(_)));
    }

    #[test]
    fn test_actor_is_user_id() {
        assert_eq!(context(Role::Founder).actor(), "user-1");
    }
}
