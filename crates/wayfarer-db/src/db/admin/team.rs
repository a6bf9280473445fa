use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use wayfarer_core::models::AdminRoleAssignment;
use wayfarer_core::{AppError, Role};

use crate::db::store::AdminRoleStore;

const ROLE_COLUMNS: &str = "id, user_id, role, is_active, created_at, updated_at";

/// Repository for admin role assignments
#[derive(Clone)]
pub struct AdminRoleRepository {
    pool: PgPool,
}

impl AdminRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminRoleStore for AdminRoleRepository {
    #[tracing::instrument(skip(self), fields(db.table = "admin_roles", db.operation = "select"))]
    async fn find_role_by_user(
        &self,
        user_id: &str,
    ) -> Result<Option<AdminRoleAssignment>, AppError> {
        let role = sqlx::query_as::<Postgres, AdminRoleAssignment>(&format!(
            "SELECT {} FROM admin_roles WHERE user_id = $1",
            ROLE_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(role)
    }

    #[tracing::instrument(skip(self), fields(db.table = "admin_roles", db.operation = "select"))]
    async fn list_roles(&self) -> Result<Vec<AdminRoleAssignment>, AppError> {
        let roles = sqlx::query_as::<Postgres, AdminRoleAssignment>(&format!(
            "SELECT {} FROM admin_roles ORDER BY created_at DESC",
            ROLE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(roles)
    }

    #[tracing::instrument(skip(self), fields(db.table = "admin_roles", db.operation = "insert"))]
    async fn create_role(
        &self,
        user_id: &str,
        role: Role,
    ) -> Result<AdminRoleAssignment, AppError> {
        let created = sqlx::query_as::<Postgres, AdminRoleAssignment>(&format!(
            r#"
            INSERT INTO admin_roles (id, user_id, role, is_active)
            VALUES ($1, $2, $3, TRUE)
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(role)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    #[tracing::instrument(skip(self), fields(db.table = "admin_roles", db.operation = "update", db.record_id = %id))]
    async fn update_role(
        &self,
        id: Uuid,
        role: Role,
        is_active: bool,
    ) -> Result<AdminRoleAssignment, AppError> {
        sqlx::query_as::<Postgres, AdminRoleAssignment>(&format!(
            r#"
            UPDATE admin_roles SET role = $2, is_active = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            ROLE_COLUMNS
        ))
        .bind(id)
        .bind(role)
        .bind(is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Team member {} not found", id)))
    }

    #[tracing::instrument(skip(self), fields(db.table = "admin_roles", db.operation = "delete", db.record_id = %id))]
    async fn delete_role(&self, id: Uuid) -> Result<(), AppError> {
        let deleted = sqlx::query("DELETE FROM admin_roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if deleted.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Team member {} not found", id)));
        }
        Ok(())
    }
}
