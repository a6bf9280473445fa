//! Legal documents (privacy, terms, cancellation) and the PDF files they link to.

use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use wayfarer_core::constants::{LEGAL_PDF_CONTENT_TYPE, LEGAL_PDF_MAX_BYTES};
use wayfarer_core::models::{
    entity, AuditAction, AuditEvent, Audited, LegalDocument, LegalDocumentType, LegalPdfUploaded,
    UpdateLegalDocument,
};
use wayfarer_core::AppError;
use wayfarer_db::LegalDocumentStore;
use wayfarer_storage::keys::{legal_pdf_key, validate_key};
use wayfarer_storage::{Storage, StoredObject};

use crate::error::storage_error;

/// Public URL prefix under which stored files are served.
pub const FILES_URL_PREFIX: &str = "/api/files/";

/// PDF received from the upload form.
#[derive(Debug, Clone)]
pub struct PdfUpload {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
}

#[derive(Clone)]
pub struct LegalService {
    documents: Arc<dyn LegalDocumentStore>,
    storage: Arc<dyn Storage>,
}

impl LegalService {
    pub fn new(documents: Arc<dyn LegalDocumentStore>, storage: Arc<dyn Storage>) -> Self {
        Self { documents, storage }
    }

    pub async fn get(&self, document_type: LegalDocumentType) -> Result<LegalDocument, AppError> {
        self.documents
            .get_document(document_type)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No {} document published", document_type)))
    }

    /// Upserts the document of `document_type`.
    pub async fn update(
        &self,
        document_type: LegalDocumentType,
        patch: UpdateLegalDocument,
        actor: &str,
    ) -> Result<Audited<LegalDocument>, AppError> {
        let current = self.documents.get_document(document_type).await?;
        let next = LegalDocument::patched(current, document_type, &patch, actor, Utc::now());
        let saved = self.documents.save_document(&next).await?;
        Ok(Audited::new(
            saved,
            AuditEvent::new(
                AuditAction::Update,
                entity::LEGAL_DOCUMENT,
                document_type,
                patch.audit_changes(),
            ),
        ))
    }

    /// Stores the PDF under a fresh key and points the document at it.
    pub async fn upload_pdf(
        &self,
        document_type: LegalDocumentType,
        upload: PdfUpload,
        actor: &str,
    ) -> Result<Audited<LegalPdfUploaded>, AppError> {
        if upload.content_type != LEGAL_PDF_CONTENT_TYPE {
            return Err(AppError::BadRequest(
                "Only PDF files are allowed".to_string(),
            ));
        }
        if upload.data.len() > LEGAL_PDF_MAX_BYTES {
            return Err(AppError::PayloadTooLarge(format!(
                "PDF is {} bytes; the limit is {} bytes",
                upload.data.len(),
                LEGAL_PDF_MAX_BYTES
            )));
        }

        let now = Utc::now();
        let key = legal_pdf_key(
            document_type.as_str(),
            now.timestamp_millis(),
            &upload.filename,
        );
        self.storage
            .put(&key, upload.data, LEGAL_PDF_CONTENT_TYPE)
            .await
            .map_err(storage_error)?;

        let url = format!("{}{}", FILES_URL_PREFIX, key);
        let patch = UpdateLegalDocument {
            pdf_url: Some(url.clone()),
            ..Default::default()
        };
        let current = self.documents.get_document(document_type).await?;
        self.documents
            .save_document(&LegalDocument::patched(
                current,
                document_type,
                &patch,
                actor,
                now,
            ))
            .await?;

        let changes = serde_json::json!({ "key": key, "filename": upload.filename });
        Ok(Audited::new(
            LegalPdfUploaded { key, url },
            AuditEvent::new(
                AuditAction::Upload,
                entity::LEGAL_DOCUMENT_PDF,
                document_type,
                changes,
            ),
        ))
    }

    pub async fn fetch_file(&self, key: &str) -> Result<StoredObject, AppError> {
        if key.is_empty() {
            return Err(AppError::BadRequest("File key is required".to_string()));
        }
        validate_key(key).map_err(storage_error)?;
        self.storage.get(key).await.map_err(storage_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wayfarer_db::InMemoryStore;
    use wayfarer_storage::LocalStorage;

    async fn service(dir: &tempfile::TempDir) -> LegalService {
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        LegalService::new(Arc::new(InMemoryStore::new()), Arc::new(storage))
    }

    fn pdf(name: &str, size: usize) -> PdfUpload {
        PdfUpload {
            filename: name.to_string(),
            content_type: LEGAL_PDF_CONTENT_TYPE.to_string(),
            data: Bytes::from(vec![b'%'; size]),
        }
    }

    #[tokio::test]
    async fn test_update_upserts_and_records_html_as_updated() {
        let dir = tempfile::tempdir().unwrap();
        let legal = service(&dir).await;
        assert!(matches!(
            legal.get(LegalDocumentType::Terms).await,
            Err(AppError::NotFound(_))
        ));

        let audited = legal
            .update(
                LegalDocumentType::Terms,
                UpdateLegalDocument {
                    html_content: Some("<p>Terms</p>".to_string()),
                    ..Default::default()
                },
                "user-1",
            )
            .await
            .unwrap();
        assert_eq!(
            audited.event.changes,
            serde_json::json!({ "html_content": "updated" })
        );

        let doc = legal.get(LegalDocumentType::Terms).await.unwrap();
        assert_eq!(doc.title, "Terms & Conditions");
        assert_eq!(doc.html_content, "<p>Terms</p>");
        assert_eq!(doc.updated_by.as_deref(), Some("user-1"));
    }

    #[tokio::test]
    async fn test_pdf_upload_is_stored_and_linked() {
        let dir = tempfile::tempdir().unwrap();
        let legal = service(&dir).await;

        let uploaded = legal
            .upload_pdf(LegalDocumentType::Privacy, pdf("Privacy Policy.pdf", 128), "user-1")
            .await
            .unwrap()
            .value;
        assert!(uploaded.key.starts_with("legal/privacy/"));
        assert!(uploaded.key.ends_with("-Privacy_Policy.pdf"));
        assert_eq!(uploaded.url, format!("/api/files/{}", uploaded.key));

        let doc = legal.get(LegalDocumentType::Privacy).await.unwrap();
        assert_eq!(doc.pdf_url.as_deref(), Some(uploaded.url.as_str()));

        let file = legal.fetch_file(&uploaded.key).await.unwrap();
        assert_eq!(file.content_type, LEGAL_PDF_CONTENT_TYPE);
        assert_eq!(file.data.len(), 128);
    }

    #[tokio::test]
    async fn test_pdf_upload_rejections() {
        let dir = tempfile::tempdir().unwrap();
        let legal = service(&dir).await;

        let mut not_pdf = pdf("notes.txt", 10);
        not_pdf.content_type = "text/plain".to_string();
        assert!(matches!(
            legal
                .upload_pdf(LegalDocumentType::Terms, not_pdf, "user-1")
                .await,
            Err(AppError::BadRequest(_))
        ));

        assert!(matches!(
            legal
                .upload_pdf(
                    LegalDocumentType::Terms,
                    pdf("big.pdf", LEGAL_PDF_MAX_BYTES + 1),
                    "user-1"
                )
                .await,
            Err(AppError::PayloadTooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_file_rejects_traversal_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let legal = service(&dir).await;
        assert!(matches!(
            legal.fetch_file("legal/../secrets").await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            legal.fetch_file("legal/terms/none.pdf").await,
            Err(AppError::NotFound(_))
        ));
    }
}
