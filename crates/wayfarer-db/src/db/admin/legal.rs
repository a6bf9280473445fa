use async_trait::async_trait;
use sqlx::{PgPool, Postgres};
use wayfarer_core::models::{LegalDocument, LegalDocumentType};
use wayfarer_core::AppError;

use crate::db::store::LegalDocumentStore;

const LEGAL_COLUMNS: &str =
    "document_type, title, html_content, pdf_url, use_pdf, last_updated, updated_by";

/// Repository for the published legal documents
#[derive(Clone)]
pub struct LegalDocumentRepository {
    pool: PgPool,
}

impl LegalDocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LegalDocumentStore for LegalDocumentRepository {
    #[tracing::instrument(skip(self), fields(db.table = "legal_documents", db.operation = "select"))]
    async fn get_document(
        &self,
        document_type: LegalDocumentType,
    ) -> Result<Option<LegalDocument>, AppError> {
        let document = sqlx::query_as::<Postgres, LegalDocument>(&format!(
            "SELECT {} FROM legal_documents WHERE document_type = $1",
            LEGAL_COLUMNS
        ))
        .bind(document_type)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }

    #[tracing::instrument(skip(self, document), fields(db.table = "legal_documents", db.operation = "upsert"))]
    async fn save_document(&self, document: &LegalDocument) -> Result<LegalDocument, AppError> {
        let saved = sqlx::query_as::<Postgres, LegalDocument>(&format!(
            r#"
            INSERT INTO legal_documents (
                document_type, title, html_content, pdf_url, use_pdf, last_updated, updated_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (document_type) DO UPDATE SET
                title = EXCLUDED.title,
                html_content = EXCLUDED.html_content,
                pdf_url = EXCLUDED.pdf_url,
                use_pdf = EXCLUDED.use_pdf,
                last_updated = EXCLUDED.last_updated,
                updated_by = EXCLUDED.updated_by
            RETURNING {}
            "#,
            LEGAL_COLUMNS
        ))
        .bind(document.document_type)
        .bind(&document.title)
        .bind(&document.html_content)
        .bind(&document.pdf_url)
        .bind(document.use_pdf)
        .bind(document.last_updated)
        .bind(&document.updated_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(saved)
    }
}
