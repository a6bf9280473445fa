//! HTTP handlers. Each checks the caller's permission first, then delegates
//! to a service and commits the resulting audit event.

pub mod audit_logs;
pub mod auth;
pub mod enquiries;
pub mod files;
pub mod health;
pub mod influencers;
pub mod leads;
pub mod legal;
pub mod payouts;
pub mod team;
