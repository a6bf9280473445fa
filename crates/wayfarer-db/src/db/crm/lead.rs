use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sqlx::{PgConnection, PgPool, Postgres};
use uuid::Uuid;
use wayfarer_core::models::{
    ActivityPayload, ActivityType, AssigneeCount, Booking, Lead, LeadActivity, LeadAggregates,
    LeadChange, LeadFilter, LeadStage, NewAttribution, NewLead, SourceCount, StageCount,
};
use wayfarer_core::AppError;

use crate::db::admin::audit::insert_audit_entry;
use crate::db::referral::insert_attribution;
use crate::db::store::{ConversionPlan, LeadStore};
use crate::db::transaction::TransactionGuard;

pub(crate) const LEAD_COLUMNS: &str = "id, name, email, phone, stage, source, assigned_to, \
     next_followup_at, notes, tags, destination_interest, budget_range, travel_month, \
     travel_start_date, travel_end_date, pax_count, referral_code, utm_source, utm_campaign, \
     utm_medium, utm_content, booking_id, version, created_at, updated_at";

pub(crate) const LEAD_CREATED_NOTE: &str = "Lead created";

/// Row shape of `lead_activities`; the payload is decoded against its type column.
#[derive(sqlx::FromRow)]
struct ActivityRow {
    id: Uuid,
    lead_id: Uuid,
    activity_type: ActivityType,
    payload: JsonValue,
    actor: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for LeadActivity {
    type Error = AppError;

    fn try_from(row: ActivityRow) -> Result<Self, Self::Error> {
        let payload = ActivityPayload::from_parts(row.activity_type, row.payload).map_err(|e| {
            AppError::Internal(format!(
                "Stored {} activity {} has an unreadable payload: {}",
                row.activity_type, row.id, e
            ))
        })?;
        Ok(LeadActivity {
            id: row.id,
            lead_id: row.lead_id,
            payload,
            actor: row.actor,
            created_at: row.created_at,
        })
    }
}

/// Escapes LIKE wildcards so the search term matches literally.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

pub(crate) async fn insert_lead(conn: &mut PgConnection, lead: &Lead) -> Result<Lead, AppError> {
    let sql = format!(
        r#"
        INSERT INTO leads (
            id, name, email, phone, stage, source, assigned_to, next_followup_at, notes, tags,
            destination_interest, budget_range, travel_month, travel_start_date, travel_end_date,
            pax_count, referral_code, utm_source, utm_campaign, utm_medium, utm_content,
            booking_id, version, created_at, updated_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                $18, $19, $20, $21, $22, $23, $24, $25)
        RETURNING {}
        "#,
        LEAD_COLUMNS
    );
    let row = sqlx::query_as::<Postgres, Lead>(&sql)
        .bind(lead.id)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.stage)
        .bind(&lead.source)
        .bind(&lead.assigned_to)
        .bind(lead.next_followup_at)
        .bind(&lead.notes)
        .bind(&lead.tags)
        .bind(&lead.destination_interest)
        .bind(&lead.budget_range)
        .bind(&lead.travel_month)
        .bind(lead.travel_start_date)
        .bind(lead.travel_end_date)
        .bind(lead.pax_count)
        .bind(&lead.referral_code)
        .bind(&lead.utm_source)
        .bind(&lead.utm_campaign)
        .bind(&lead.utm_medium)
        .bind(&lead.utm_content)
        .bind(lead.booking_id)
        .bind(lead.version)
        .bind(lead.created_at)
        .bind(lead.updated_at)
        .fetch_one(&mut *conn)
        .await?;
    Ok(row)
}

pub(crate) async fn insert_activity(
    conn: &mut PgConnection,
    lead_id: Uuid,
    payload: ActivityPayload,
    actor: &str,
) -> Result<LeadActivity, AppError> {
    let activity = LeadActivity {
        id: Uuid::new_v4(),
        lead_id,
        payload,
        actor: actor.to_string(),
        created_at: Utc::now(),
    };
    sqlx::query(
        r#"
        INSERT INTO lead_activities (id, lead_id, activity_type, payload, actor, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(activity.id)
    .bind(activity.lead_id)
    .bind(activity.payload.activity_type())
    .bind(activity.payload.payload_json())
    .bind(&activity.actor)
    .bind(activity.created_at)
    .execute(&mut *conn)
    .await?;
    Ok(activity)
}

/// Repository for leads and their activity timeline
#[derive(Clone)]
pub struct LeadRepository {
    pool: PgPool,
}

impl LeadRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn lead_exists(&self, id: Uuid) -> Result<bool, AppError> {
        let exists = sqlx::query_scalar::<Postgres, bool>(
            "SELECT EXISTS(SELECT 1 FROM leads WHERE id = $1)",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }
}

#[async_trait]
impl LeadStore for LeadRepository {
    #[tracing::instrument(skip(self), fields(db.table = "leads", db.operation = "select"))]
    async fn list_leads(&self, filter: &LeadFilter, limit: i64) -> Result<Vec<Lead>, AppError> {
        let mut sql = format!("SELECT {} FROM leads", LEAD_COLUMNS);
        let mut conditions: Vec<String> = Vec::new();
        let mut param = 0;

        if filter.stage.is_some() {
            param += 1;
            conditions.push(format!("stage = ${}", param));
        }
        if filter.source.is_some() {
            param += 1;
            conditions.push(format!("source = ${}", param));
        }
        if filter.assigned_to.is_some() {
            param += 1;
            conditions.push(format!("assigned_to = ${}", param));
        }
        let search = filter.search.as_deref().map(like_pattern);
        if search.is_some() {
            param += 1;
            conditions.push(format!(
                "(name ILIKE ${p} OR email ILIKE ${p} OR phone ILIKE ${p})",
                p = param
            ));
        }

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(&format!(" ORDER BY created_at DESC LIMIT ${}", param + 1));

        let mut query = sqlx::query_as::<Postgres, Lead>(&sql);
        if let Some(stage) = filter.stage {
            query = query.bind(stage);
        }
        if let Some(source) = &filter.source {
            query = query.bind(source);
        }
        if let Some(assignee) = &filter.assigned_to {
            query = query.bind(assignee);
        }
        if let Some(pattern) = search {
            query = query.bind(pattern);
        }

        let leads = query.bind(limit).fetch_all(&self.pool).await?;
        Ok(leads)
    }

    #[tracing::instrument(skip(self), fields(db.table = "leads", db.operation = "select", db.record_id = %id))]
    async fn get_lead(&self, id: Uuid) -> Result<Option<Lead>, AppError> {
        let lead = sqlx::query_as::<Postgres, Lead>(&format!(
            "SELECT {} FROM leads WHERE id = $1",
            LEAD_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(lead)
    }

    #[tracing::instrument(skip(self), fields(db.table = "lead_activities", db.operation = "select"))]
    async fn list_activities(&self, lead_id: Uuid) -> Result<Vec<LeadActivity>, AppError> {
        let rows = sqlx::query_as::<Postgres, ActivityRow>(
            r#"
            SELECT id, lead_id, activity_type, payload, actor, created_at
            FROM lead_activities
            WHERE lead_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(lead_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(LeadActivity::try_from).collect()
    }

    #[tracing::instrument(skip(self, lead), fields(db.table = "leads", db.operation = "insert"))]
    async fn create_lead(
        &self,
        lead: NewLead,
        attribution: Option<NewAttribution>,
        actor: &str,
    ) -> Result<Lead, AppError> {
        let lead = lead.into_lead(Uuid::new_v4(), Utc::now());

        let mut tx = TransactionGuard::begin(&self.pool, "create_lead").await?;
        let lead = insert_lead(tx.conn(), &lead).await?;
        insert_activity(
            tx.conn(),
            lead.id,
            ActivityPayload::note(LEAD_CREATED_NOTE),
            actor,
        )
        .await?;
        if let Some(attribution) = attribution {
            insert_attribution(tx.conn(), attribution, lead.id).await?;
        }
        tx.commit().await?;

        Ok(lead)
    }

    #[tracing::instrument(skip(self, change), fields(db.table = "leads", db.operation = "update", db.record_id = %change.lead.id))]
    async fn update_lead(
        &self,
        change: LeadChange,
        expected_version: i64,
        actor: &str,
    ) -> Result<Lead, AppError> {
        let LeadChange { lead, activities } = change;

        let mut tx = TransactionGuard::begin(&self.pool, "update_lead").await?;
        let updated = sqlx::query_as::<Postgres, Lead>(&format!(
            r#"
            UPDATE leads SET
                name = $3, email = $4, phone = $5, stage = $6, assigned_to = $7,
                next_followup_at = $8, notes = $9, tags = $10, travel_start_date = $11,
                travel_end_date = $12, destination_interest = $13, budget_range = $14,
                pax_count = $15, version = $16, updated_at = $17
            WHERE id = $1 AND version = $2
            RETURNING {}
            "#,
            LEAD_COLUMNS
        ))
        .bind(lead.id)
        .bind(expected_version)
        .bind(&lead.name)
        .bind(&lead.email)
        .bind(&lead.phone)
        .bind(lead.stage)
        .bind(&lead.assigned_to)
        .bind(lead.next_followup_at)
        .bind(&lead.notes)
        .bind(&lead.tags)
        .bind(lead.travel_start_date)
        .bind(lead.travel_end_date)
        .bind(&lead.destination_interest)
        .bind(&lead.budget_range)
        .bind(lead.pax_count)
        .bind(lead.version)
        .bind(lead.updated_at)
        .fetch_optional(tx.conn())
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            return if self.lead_exists(lead.id).await? {
                Err(AppError::Conflict(format!(
                    "Lead {} was modified by someone else; reload and retry",
                    lead.id
                )))
            } else {
                Err(AppError::NotFound(format!("Lead {} not found", lead.id)))
            };
        };

        for payload in activities {
            insert_activity(tx.conn(), updated.id, payload, actor).await?;
        }
        tx.commit().await?;

        Ok(updated)
    }

    #[tracing::instrument(skip(self, payload), fields(db.table = "lead_activities", db.operation = "insert"))]
    async fn append_activity(
        &self,
        lead_id: Uuid,
        payload: ActivityPayload,
        actor: &str,
    ) -> Result<LeadActivity, AppError> {
        if !self.lead_exists(lead_id).await? {
            return Err(AppError::NotFound(format!("Lead {} not found", lead_id)));
        }
        let mut conn = self.pool.acquire().await?;
        insert_activity(&mut conn, lead_id, payload, actor).await
    }

    #[tracing::instrument(skip(self, plan), fields(db.table = "bookings", db.operation = "insert", db.record_id = %plan.lead_id))]
    async fn convert_lead(&self, plan: ConversionPlan) -> Result<Booking, AppError> {
        let ConversionPlan {
            lead_id,
            expected_version,
            booking,
            attribution,
            actor,
            audit,
        } = plan;

        let mut tx = TransactionGuard::begin(&self.pool, "convert_lead").await?;

        let booking = sqlx::query_as::<Postgres, Booking>(
            r#"
            INSERT INTO bookings (
                id, booking_code, lead_id, package_id, booking_type, travelers,
                total_amount, currency, travel_start_date, travel_end_date, status, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, booking_code, lead_id, package_id, booking_type, travelers,
                      total_amount, currency, travel_start_date, travel_end_date, status, created_at
            "#,
        )
        .bind(booking.id)
        .bind(&booking.booking_code)
        .bind(booking.lead_id)
        .bind(&booking.package_id)
        .bind(&booking.booking_type)
        .bind(sqlx::types::Json(&booking.travelers))
        .bind(booking.total_amount)
        .bind(&booking.currency)
        .bind(booking.travel_start_date)
        .bind(booking.travel_end_date)
        .bind(booking.status)
        .bind(booking.created_at)
        .fetch_one(tx.conn())
        .await?;

        let converted = sqlx::query(
            r#"
            UPDATE leads
            SET stage = $2, booking_id = $3, version = version + 1, updated_at = NOW()
            WHERE id = $1 AND version = $4 AND booking_id IS NULL
            "#,
        )
        .bind(lead_id)
        .bind(LeadStage::Converted)
        .bind(booking.id)
        .bind(expected_version)
        .execute(tx.conn())
        .await?;

        if converted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(AppError::Conflict(format!(
                "Lead {} changed or was already converted",
                lead_id
            )));
        }

        insert_activity(
            tx.conn(),
            lead_id,
            ActivityPayload::Converted {
                booking_code: booking.booking_code.clone(),
            },
            &actor,
        )
        .await?;

        if let Some(attribution) = attribution {
            insert_attribution(tx.conn(), attribution, lead_id).await?;
        }

        insert_audit_entry(tx.conn(), &audit).await?;
        tx.commit().await?;

        Ok(booking)
    }

    #[tracing::instrument(skip(self), fields(db.table = "leads", db.operation = "aggregate"))]
    async fn lead_aggregates(&self) -> Result<LeadAggregates, AppError> {
        let stages = sqlx::query_as::<Postgres, StageCount>(
            "SELECT stage, COUNT(*) AS count FROM leads GROUP BY stage ORDER BY stage",
        )
        .fetch_all(&self.pool)
        .await?;

        let sources = sqlx::query_as::<Postgres, SourceCount>(
            "SELECT source, COUNT(*) AS count FROM leads GROUP BY source ORDER BY count DESC, source",
        )
        .fetch_all(&self.pool)
        .await?;

        let assignees = sqlx::query_as::<Postgres, AssigneeCount>(
            r#"
            SELECT assigned_to, COUNT(*) AS count
            FROM leads
            WHERE assigned_to IS NOT NULL
              AND stage NOT IN ('Converted', 'Lost', 'Duplicate')
            GROUP BY assigned_to
            ORDER BY count DESC, assigned_to
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let followups = sqlx::query_scalar::<Postgres, DateTime<Utc>>(
            "SELECT next_followup_at FROM leads WHERE next_followup_at IS NOT NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(LeadAggregates {
            stages,
            sources,
            assignees,
            followups,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("asha"), "%asha%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }
}
