use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres};
use uuid::Uuid;
use wayfarer_core::models::{ActivityPayload, Enquiry, NewAttribution, NewEnquiry};
use wayfarer_core::AppError;

use super::lead::{insert_activity, insert_lead, LEAD_CREATED_NOTE};
use crate::db::referral::insert_attribution;
use crate::db::store::EnquiryStore;
use crate::db::transaction::TransactionGuard;

const ENQUIRY_COLUMNS: &str = "id, lead_id, name, email, phone, destination_interest, \
     budget_range, travel_month, message, source, referral_code, is_read, created_at";

/// Actor recorded on activities created by the public enquiry form.
pub const ENQUIRY_ACTOR: &str = "website";

/// Repository for public enquiries
#[derive(Clone)]
pub struct EnquiryRepository {
    pool: PgPool,
}

impl EnquiryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EnquiryStore for EnquiryRepository {
    #[tracing::instrument(skip(self, enquiry, attribution), fields(db.table = "enquiries", db.operation = "insert"))]
    async fn submit_enquiry(
        &self,
        enquiry: NewEnquiry,
        attribution: Option<NewAttribution>,
    ) -> Result<Enquiry, AppError> {
        let now = Utc::now();
        let lead = enquiry.lead().into_lead(Uuid::new_v4(), now);
        let enquiry = enquiry.into_enquiry(Uuid::new_v4(), lead.id, now);

        let mut tx = TransactionGuard::begin(&self.pool, "submit_enquiry").await?;
        let lead = insert_lead(tx.conn(), &lead).await?;
        insert_activity(
            tx.conn(),
            lead.id,
            ActivityPayload::note(LEAD_CREATED_NOTE),
            ENQUIRY_ACTOR,
        )
        .await?;

        let stored = sqlx::query_as::<Postgres, Enquiry>(&format!(
            r#"
            INSERT INTO enquiries (
                id, lead_id, name, email, phone, destination_interest, budget_range,
                travel_month, message, source, referral_code, is_read, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING {}
            "#,
            ENQUIRY_COLUMNS
        ))
        .bind(enquiry.id)
        .bind(enquiry.lead_id)
        .bind(&enquiry.name)
        .bind(&enquiry.email)
        .bind(&enquiry.phone)
        .bind(&enquiry.destination_interest)
        .bind(&enquiry.budget_range)
        .bind(&enquiry.travel_month)
        .bind(&enquiry.message)
        .bind(&enquiry.source)
        .bind(&enquiry.referral_code)
        .bind(enquiry.is_read)
        .bind(enquiry.created_at)
        .fetch_one(tx.conn())
        .await?;

        if let Some(attribution) = attribution {
            insert_attribution(tx.conn(), attribution, lead.id).await?;
        }
        tx.commit().await?;

        Ok(stored)
    }

    #[tracing::instrument(skip(self), fields(db.table = "enquiries", db.operation = "select"))]
    async fn list_enquiries(&self) -> Result<Vec<Enquiry>, AppError> {
        let enquiries = sqlx::query_as::<Postgres, Enquiry>(&format!(
            "SELECT {} FROM enquiries ORDER BY created_at DESC",
            ENQUIRY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(enquiries)
    }

    #[tracing::instrument(skip(self), fields(db.table = "enquiries", db.operation = "update", db.record_id = %id))]
    async fn mark_enquiry_read(&self, id: Uuid, is_read: bool) -> Result<Enquiry, AppError> {
        sqlx::query_as::<Postgres, Enquiry>(&format!(
            "UPDATE enquiries SET is_read = $2 WHERE id = $1 RETURNING {}",
            ENQUIRY_COLUMNS
        ))
        .bind(id)
        .bind(is_read)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Enquiry {} not found", id)))
    }
}
