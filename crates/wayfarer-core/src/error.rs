//! `AppError`, the one error type every crate returns, and the HTTP
//! presentation attached to each of its variants.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Severity an error is logged at when it ends a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Caller mistakes: bad input, missing rows, denied access
    Debug,
    /// Upstream trouble the client may retry through
    Warn,
    /// Faults on our side
    Error,
}

/// How an error presents itself over HTTP.
pub trait ErrorMetadata {
    fn http_status_code(&self) -> u16;

    /// Stable code clients branch on, e.g. `VALIDATION_ERROR`
    fn error_code(&self) -> &'static str;

    /// True when retrying the same request may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show the caller
    fn client_message(&self) -> String;

    /// When true, internal details are withheld from the response
    fn is_sensitive(&self) -> bool;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("File too large: {0}")]
    PayloadTooLarge(String),

    #[error("Identity provider error: {0}")]
    Identity(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        match err {
            SqlxError::RowNotFound => AppError::NotFound("Record not found".to_string()),
            SqlxError::Database(ref db) if db.is_unique_violation() => {
                let constraint = db.constraint().unwrap_or("unique constraint").to_string();
                AppError::AlreadyExists(format!("Duplicate value violates {}", constraint))
            }
            other => AppError::Database(other),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::InvalidInput(format!("UUID parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(describe_validation_errors(&err))
    }
}

/// Flattens validator output into `field: problem` pairs, sorted by field name.
fn describe_validation_errors(err: &validator::ValidationErrors) -> String {
    let mut fields: Vec<String> = err
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let problems: Vec<String> = errors
                .iter()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .collect();
            format!("{}: {}", field, problems.join(", "))
        })
        .collect();

    if fields.is_empty() {
        return err.to_string();
    }

    fields.sort();
    fields.join("; ")
}

/// Status, code and handling hints shared by every instance of a variant.
#[derive(Debug, Clone, Copy)]
struct Presentation {
    status: u16,
    code: &'static str,
    recoverable: bool,
    action: Option<&'static str>,
    sensitive: bool,
    level: LogLevel,
}

const RETRY_LATER: Option<&str> = Some("Retry after a short delay");

impl Presentation {
    /// A 4xx the caller can fix; never retried, never hidden.
    const fn client(status: u16, code: &'static str, action: &'static str) -> Self {
        Self {
            status,
            code,
            recoverable: false,
            action: Some(action),
            sensitive: false,
            level: LogLevel::Debug,
        }
    }

    /// A 5xx whose details stay server-side.
    const fn server(status: u16, code: &'static str, level: LogLevel) -> Self {
        Self {
            status,
            code,
            recoverable: true,
            action: RETRY_LATER,
            sensitive: true,
            level,
        }
    }
}

fn presentation(err: &AppError) -> Presentation {
    match err {
        AppError::Database(_) => Presentation::server(500, "DATABASE_ERROR", LogLevel::Error),
        AppError::Storage(_) => Presentation::server(500, "STORAGE_ERROR", LogLevel::Error),
        AppError::Identity(_) => {
            Presentation::server(502, "IDENTITY_PROVIDER_ERROR", LogLevel::Warn)
        }
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            Presentation::server(500, "INTERNAL_ERROR", LogLevel::Error)
        }
        AppError::InvalidInput(_) => {
            Presentation::client(400, "INVALID_INPUT", "Check request parameters and try again")
        }
        AppError::Validation(_) => {
            Presentation::client(400, "VALIDATION_ERROR", "Fix the listed fields and try again")
        }
        AppError::BadRequest(_) => {
            Presentation::client(400, "BAD_REQUEST", "Check request format and parameters")
        }
        AppError::NotFound(_) => {
            Presentation::client(404, "NOT_FOUND", "Verify the resource ID exists")
        }
        AppError::Unauthorized(_) => {
            Presentation::client(401, "UNAUTHORIZED", "Sign in again to obtain a valid session")
        }
        AppError::PermissionDenied(_) => {
            Presentation::client(403, "PERMISSION_DENIED", "Ask a founder to grant the required role")
        }
        AppError::Conflict(_) => {
            Presentation::client(409, "CONFLICT", "Reload the resource and retry")
        }
        AppError::AlreadyExists(_) => {
            Presentation::client(409, "ALREADY_EXISTS", "Use a different value")
        }
        AppError::PayloadTooLarge(_) => {
            Presentation::client(413, "PAYLOAD_TOO_LARGE", "Reduce file size")
        }
    }
}

impl AppError {
    /// Variant name reported as `error_type` outside production.
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Validation(_) => "Validation",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::PermissionDenied(_) => "PermissionDenied",
            AppError::Conflict(_) => "Conflict",
            AppError::AlreadyExists(_) => "AlreadyExists",
            AppError::PayloadTooLarge(_) => "PayloadTooLarge",
            AppError::Identity(_) => "Identity",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Display text followed by up to five `source()` causes, one per line.
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let causes = std::iter::successors(self.source(), |err: &&(dyn Error + 'static)| {
            (*err).source()
        });
        let mut lines = vec![self.to_string()];
        for (depth, cause) in causes.enumerate() {
            if depth == 5 {
                lines.push("  (more causes omitted)".to_string());
                break;
            }
            lines.push(format!("  caused by: {}", cause));
        }
        lines.join("\n")
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        presentation(self).status
    }

    fn error_code(&self) -> &'static str {
        presentation(self).code
    }

    fn is_recoverable(&self) -> bool {
        presentation(self).recoverable
    }

    fn suggested_action(&self) -> Option<&'static str> {
        presentation(self).action
    }

    fn is_sensitive(&self) -> bool {
        presentation(self).sensitive
    }

    fn log_level(&self) -> LogLevel {
        presentation(self).level
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Validation(ref msg) => format!("Validation failed: {}", msg),
            AppError::BadRequest(ref msg) => msg.clone(),
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::Unauthorized(ref msg) => msg.clone(),
            AppError::PermissionDenied(ref msg) => format!("Permission denied: {}", msg),
            AppError::Conflict(ref msg) => msg.clone(),
            AppError::AlreadyExists(ref msg) => msg.clone(),
            AppError::PayloadTooLarge(ref msg) => msg.clone(),
            AppError::Identity(_) => "Identity service unavailable".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
