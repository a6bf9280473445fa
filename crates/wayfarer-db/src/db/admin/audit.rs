use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres};
use wayfarer_core::models::{AuditLogEntry, AuditLogQuery};
use wayfarer_core::AppError;

use crate::db::store::AuditLogStore;

const AUDIT_COLUMNS: &str = "id, actor, action, entity_type, entity_id, changes, created_at";

pub(crate) async fn insert_audit_entry(
    conn: &mut PgConnection,
    entry: &AuditLogEntry,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, actor, action, entity_type, entity_id, changes, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(entry.id)
    .bind(&entry.actor)
    .bind(entry.action)
    .bind(&entry.entity_type)
    .bind(&entry.entity_id)
    .bind(&entry.changes)
    .bind(entry.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Append-only repository for the administrative audit trail
#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogStore for AuditLogRepository {
    #[tracing::instrument(skip(self, entry), fields(db.table = "audit_logs", db.operation = "insert"))]
    async fn record(&self, entry: AuditLogEntry) -> Result<(), AppError> {
        let mut conn = self.pool.acquire().await?;
        insert_audit_entry(&mut conn, &entry).await
    }

    #[tracing::instrument(skip(self), fields(db.table = "audit_logs", db.operation = "select"))]
    async fn list_audit_logs(
        &self,
        query: &AuditLogQuery,
        limit: i64,
    ) -> Result<Vec<AuditLogEntry>, AppError> {
        let entries = sqlx::query_as::<Postgres, AuditLogEntry>(&format!(
            r#"
            SELECT {} FROM audit_logs
            WHERE ($1::text IS NULL OR entity_type = $1)
              AND ($2::text IS NULL OR entity_id = $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            AUDIT_COLUMNS
        ))
        .bind(&query.entity_type)
        .bind(&query.entity_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}
