use std::sync::Arc;
use uuid::Uuid;
use wayfarer_core::models::{
    entity, AdminCheck, AdminRoleAssignment, AuditAction, AuditEvent, Audited, CreateAdminRole,
    UpdateAdminRole,
};
use wayfarer_core::AppError;
use wayfarer_db::AdminRoleStore;

/// Admin role assignments (who may use the console and as what).
#[derive(Clone)]
pub struct TeamService {
    roles: Arc<dyn AdminRoleStore>,
}

impl TeamService {
    pub fn new(roles: Arc<dyn AdminRoleStore>) -> Self {
        Self { roles }
    }

    pub async fn list(&self) -> Result<Vec<AdminRoleAssignment>, AppError> {
        self.roles.list_roles().await
    }

    pub async fn check(&self, user_id: &str) -> Result<AdminCheck, AppError> {
        let role = self
            .roles
            .find_role_by_user(user_id)
            .await?
            .filter(|assignment| assignment.is_active)
            .map(|assignment| assignment.role);
        Ok(AdminCheck {
            is_admin: role.is_some(),
            role,
        })
    }

    pub async fn create(
        &self,
        request: CreateAdminRole,
    ) -> Result<Audited<AdminRoleAssignment>, AppError> {
        let assignment = self
            .roles
            .create_role(request.user_id.trim(), request.role)
            .await?;
        Ok(Audited::new(
            assignment.clone(),
            AuditEvent::new(
                AuditAction::Create,
                entity::ADMIN_ROLE,
                assignment.id,
                serde_json::json!({ "user_id": assignment.user_id, "role": assignment.role }),
            ),
        ))
    }

    pub async fn update(
        &self,
        id: Uuid,
        request: UpdateAdminRole,
    ) -> Result<Audited<AdminRoleAssignment>, AppError> {
        let assignment = self
            .roles
            .update_role(id, request.role, request.is_active)
            .await?;
        Ok(Audited::new(
            assignment,
            AuditEvent::new(
                AuditAction::Update,
                entity::ADMIN_ROLE,
                id,
                serde_json::to_value(&request)?,
            ),
        ))
    }

    pub async fn delete(&self, id: Uuid) -> Result<Audited<()>, AppError> {
        self.roles.delete_role(id).await?;
        Ok(Audited::new(
            (),
            AuditEvent::new(
                AuditAction::Delete,
                entity::ADMIN_ROLE,
                id,
                serde_json::json!({}),
            ),
        ))
    }
}
