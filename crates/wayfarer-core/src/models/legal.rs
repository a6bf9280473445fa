use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "legal_document_type", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum LegalDocumentType {
    Privacy,
    Terms,
    Cancellation,
}

impl LegalDocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LegalDocumentType::Privacy => "privacy",
            LegalDocumentType::Terms => "terms",
            LegalDocumentType::Cancellation => "cancellation",
        }
    }

    pub fn default_title(&self) -> &'static str {
        match self {
            LegalDocumentType::Privacy => "Privacy Policy",
            LegalDocumentType::Terms => "Terms & Conditions",
            LegalDocumentType::Cancellation => "Cancellation Policy",
        }
    }
}

impl Display for LegalDocumentType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(self.as_str())
    }
}

impl FromStr for LegalDocumentType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "privacy" => Ok(LegalDocumentType::Privacy),
            "terms" => Ok(LegalDocumentType::Terms),
            "cancellation" => Ok(LegalDocumentType::Cancellation),
            other => Err(AppError::BadRequest(format!(
                "Unknown legal document type: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LegalDocument {
    pub document_type: LegalDocumentType,
    pub title: String,
    pub html_content: String,
    pub pdf_url: Option<String>,
    /// Serve the uploaded PDF instead of the HTML body
    pub use_pdf: bool,
    pub last_updated: DateTime<Utc>,
    pub updated_by: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema, Validate)]
pub struct UpdateLegalDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 300))]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_pdf: Option<bool>,
}

impl UpdateLegalDocument {
    /// Audit payload; HTML bodies are recorded as "updated" rather than copied.
    pub fn audit_changes(&self) -> serde_json::Value {
        let mut changes = serde_json::Map::new();
        if let Some(title) = &self.title {
            changes.insert("title".into(), title.clone().into());
        }
        if self.html_content.is_some() {
            changes.insert("html_content".into(), "updated".into());
        }
        if let Some(url) = &self.pdf_url {
            changes.insert("pdf_url".into(), url.clone().into());
        }
        if let Some(use_pdf) = self.use_pdf {
            changes.insert("use_pdf".into(), use_pdf.into());
        }
        serde_json::Value::Object(changes)
    }
}

impl LegalDocument {
    /// Applies `patch` to the stored document, or to a blank one when none exists yet.
    pub fn patched(
        current: Option<LegalDocument>,
        document_type: LegalDocumentType,
        patch: &UpdateLegalDocument,
        actor: &str,
        now: DateTime<Utc>,
    ) -> LegalDocument {
        let mut doc = current.unwrap_or_else(|| LegalDocument {
            document_type,
            title: document_type.default_title().to_string(),
            html_content: String::new(),
            pdf_url: None,
            use_pdf: false,
            last_updated: now,
            updated_by: None,
        });
        if let Some(title) = &patch.title {
            doc.title = title.clone();
        }
        if let Some(html) = &patch.html_content {
            doc.html_content = html.clone();
        }
        if let Some(url) = &patch.pdf_url {
            doc.pdf_url = Some(url.clone());
        }
        if let Some(use_pdf) = patch.use_pdf {
            doc.use_pdf = use_pdf;
        }
        doc.last_updated = now;
        doc.updated_by = Some(actor.to_string());
        doc
    }
}

/// Response to a PDF upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LegalPdfUploaded {
    pub key: String,
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_type_is_bad_request() {
        assert!(matches!(
            "refunds".parse::<LegalDocumentType>(),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            "terms".parse::<LegalDocumentType>().unwrap(),
            LegalDocumentType::Terms
        );
    }

    #[test]
    fn test_html_is_masked_in_audit() {
        let patch = UpdateLegalDocument {
            html_content: Some("<p>long policy</p>".to_string()),
            use_pdf: Some(true),
            ..Default::default()
        };
        let changes = patch.audit_changes();
        assert_eq!(changes["html_content"], "updated");
        assert_eq!(changes["use_pdf"], true);
        assert!(changes.get("title").is_none());
    }

    #[test]
    fn test_patch_creates_missing_document() {
        let doc = LegalDocument::patched(
            None,
            LegalDocumentType::Privacy,
            &UpdateLegalDocument {
                html_content: Some("<p>hi</p>".to_string()),
                ..Default::default()
            },
            "user-1",
            Utc::now(),
        );
        assert_eq!(doc.title, "Privacy Policy");
        assert_eq!(doc.html_content, "<p>hi</p>");
        assert_eq!(doc.updated_by.as_deref(), Some("user-1"));
    }
}
