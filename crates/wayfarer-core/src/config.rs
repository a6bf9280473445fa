//! Configuration module
//!
//! This module provides configuration structures for the API: server, database,
//! identity provider, object storage and CRM defaults. Everything is read from the
//! environment (a `.env` file is loaded first when present).

use std::env;
use std::fmt;
use std::str::FromStr;

use crate::constants::{DEFAULT_BOOKING_CURRENCY, LEGAL_PDF_MAX_BYTES};

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const SESSION_COOKIE_NAME: &str = "wayfarer_session";
const HTTP_CONCURRENCY_LIMIT: usize = 256;

/// Where uploaded legal PDFs are kept.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StorageBackend {
    #[default]
    Local,
    S3,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Local => "local",
            StorageBackend::S3 => "s3",
        }
    }
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "local" | "fs" => Ok(StorageBackend::Local),
            "s3" => Ok(StorageBackend::S3),
            other => Err(anyhow::anyhow!(
                "STORAGE_BACKEND must be `local` or `s3`, got `{}`",
                other
            )),
        }
    }
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    pub log_format: String,
    pub http_concurrency_limit: usize,
}

/// CRM API configuration
#[derive(Clone, Debug)]
pub struct CrmConfig {
    pub base: BaseConfig,
    pub database_url: String,
    // External users service that owns sessions
    pub identity_service_url: String,
    pub identity_service_api_key: String,
    pub session_cookie_name: String,
    // Storage configuration
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, R2, ...)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub max_upload_bytes: usize,
    pub default_currency: String,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<CrmConfig>);

impl Config {
    fn as_crm(&self) -> &CrmConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        is_production_name(&self.as_crm().base.environment)
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = CrmConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_crm().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_crm().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_crm().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_crm().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_crm().base.log_format
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_crm().base.http_concurrency_limit
    }

    pub fn database_url(&self) -> &str {
        &self.as_crm().database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_crm().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_crm().base.db_timeout_seconds
    }

    pub fn identity_service_url(&self) -> &str {
        &self.as_crm().identity_service_url
    }

    pub fn identity_service_api_key(&self) -> &str {
        &self.as_crm().identity_service_api_key
    }

    pub fn session_cookie_name(&self) -> &str {
        &self.as_crm().session_cookie_name
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_crm().storage_backend.unwrap_or_default()
    }

    pub fn s3_bucket(&self) -> Option<&str> {
        self.as_crm().s3_bucket.as_deref()
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_crm().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_crm().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_crm().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_crm().local_storage_path.as_deref()
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.as_crm().max_upload_bytes
    }

    pub fn default_currency(&self) -> &str {
        &self.as_crm().default_currency
    }
}

fn is_production_name(environment: &str) -> bool {
    let env = environment.to_lowercase();
    env == "production" || env == "prod"
}

impl CrmConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        if is_production_name(&environment) && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "compact".to_string())
                .to_lowercase(),
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|limit: &usize| *limit > 0)
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
        };

        let storage_backend = match env::var("STORAGE_BACKEND") {
            Ok(raw) => Some(raw.parse::<StorageBackend>()?),
            Err(_) => None,
        };

        let max_upload_mb = env::var("MAX_UPLOAD_MB")
            .ok()
            .and_then(|s| s.parse::<usize>().ok());

        Ok(CrmConfig {
            base,
            database_url: env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?,
            identity_service_url: env::var("IDENTITY_SERVICE_URL")
                .map_err(|_| anyhow::anyhow!("IDENTITY_SERVICE_URL must be set"))?,
            identity_service_api_key: env::var("IDENTITY_SERVICE_API_KEY")
                .map_err(|_| anyhow::anyhow!("IDENTITY_SERVICE_API_KEY must be set"))?,
            session_cookie_name: env::var("SESSION_COOKIE_NAME")
                .unwrap_or_else(|_| SESSION_COOKIE_NAME.to_string()),
            storage_backend,
            s3_bucket: env::var("S3_BUCKET").ok(),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            max_upload_bytes: max_upload_mb
                .map(|mb| mb * 1024 * 1024)
                .unwrap_or(LEGAL_PDF_MAX_BYTES),
            default_currency: env::var("DEFAULT_CURRENCY")
                .unwrap_or_else(|_| DEFAULT_BOOKING_CURRENCY.to_string())
                .to_uppercase(),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.database_url.starts_with("postgres://")
            && !self.database_url.starts_with("postgresql://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if !self.identity_service_url.starts_with("http://")
            && !self.identity_service_url.starts_with("https://")
        {
            return Err(anyhow::anyhow!(
                "IDENTITY_SERVICE_URL must be an http(s) URL"
            ));
        }

        if self.default_currency.len() != 3 {
            return Err(anyhow::anyhow!(
                "DEFAULT_CURRENCY must be a three-letter currency code"
            ));
        }

        match self.storage_backend.unwrap_or_default() {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CrmConfig {
        CrmConfig {
            base: BaseConfig {
                server_port: 8080,
                cors_origins: vec!["*".to_string()],
                db_max_connections: 5,
                db_timeout_seconds: 5,
                environment: "development".to_string(),
                log_format: "compact".to_string(),
                http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
            },
            database_url: "postgres://localhost/wayfarer".to_string(),
            identity_service_url: "https://users.example.com".to_string(),
            identity_service_api_key: "key".to_string(),
            session_cookie_name: SESSION_COOKIE_NAME.to_string(),
            storage_backend: Some(StorageBackend::Local),
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some("/tmp/wayfarer".to_string()),
            max_upload_bytes: LEGAL_PDF_MAX_BYTES,
            default_currency: "INR".to_string(),
        }
    }

    #[test]
    fn test_valid_local_config() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_s3_requires_bucket_and_region() {
        let mut cfg = sample();
        cfg.storage_backend = Some(StorageBackend::S3);
        assert!(cfg.validate().is_err());
        cfg.s3_bucket = Some("docs".to_string());
        assert!(cfg.validate().is_err());
        cfg.aws_region = Some("ap-south-1".to_string());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_rejects_non_postgres_url() {
        let mut cfg = sample();
        cfg.database_url = "mysql://localhost/db".to_string();
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_storage_backend_parsing() {
        assert_eq!("S3".parse::<StorageBackend>().unwrap(), StorageBackend::S3);
        assert_eq!(" fs ".parse::<StorageBackend>().unwrap(), StorageBackend::Local);
        assert!("gcs".parse::<StorageBackend>().is_err());
        assert_eq!(StorageBackend::S3.to_string(), "s3");
    }

    #[test]
    fn test_production_detection() {
        let mut cfg = sample();
        cfg.base.environment = "PROD".to_string();
        assert!(Config(Box::new(cfg)).is_production());
    }
}
