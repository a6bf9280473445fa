//! Wayfarer Core Library
//!
//! Domain models, error types, configuration and the pure business rules
//! (RBAC policy, followup bucketing, referral codes and commissions) shared
//! by the persistence and HTTP crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod followup;
pub mod models;
pub mod rbac;
pub mod referral;

// Re-export commonly used types
pub use config::{BaseConfig, Config, CrmConfig, StorageBackend};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use followup::{followup_bucket, FollowupBucket, FollowupCounts};
pub use rbac::{Action, RbacPolicy, Resource, Role};
