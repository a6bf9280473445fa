//! Key validation and key layout for uploaded documents.

use crate::traits::{StorageError, StorageResult};

/// Content type used when none was recorded for an object.
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Rejects keys that could escape the storage root or address hidden metadata.
pub fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("Storage key is empty".to_string()));
    }
    if key.starts_with('/') || key.contains("..") || key.contains('\\') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    if key
        .split('/')
        .any(|segment| segment.is_empty() || segment.starts_with('.'))
    {
        return Err(StorageError::InvalidKey(
            "Storage key contains an empty or hidden segment".to_string(),
        ));
    }
    Ok(())
}

/// Replaces anything outside `[A-Za-z0-9._-]` with `_` and strips leading dots.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.replace("..", "_")
    }
}

/// `legal/{document_type}/{unix_millis}-{sanitized filename}`
pub fn legal_pdf_key(document_type: &str, unix_millis: i64, filename: &str) -> String {
    format!(
        "legal/{}/{}-{}",
        document_type,
        unix_millis,
        sanitize_filename(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("legal/privacy/1-a.pdf").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("/etc/passwd").is_err());
        assert!(validate_key("legal/../secret").is_err());
        assert!(validate_key("legal//a.pdf").is_err());
        assert!(validate_key(".meta/legal/a.pdf").is_err());
        assert!(validate_key("legal\\a.pdf").is_err());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("Privacy Policy (v2).pdf"), "Privacy_Policy__v2_.pdf");
        assert_eq!(sanitize_filename("../../x.pdf"), "___x.pdf");
        assert_eq!(sanitize_filename("..."), "file");
    }

    #[test]
    fn test_legal_pdf_key_layout() {
        let key = legal_pdf_key("terms", 1736467200000, "terms.pdf");
        assert_eq!(key, "legal/terms/1736467200000-terms.pdf");
        assert!(validate_key(&key).is_ok());
    }
}
