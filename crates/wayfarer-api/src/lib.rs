//! Wayfarer CRM HTTP API
//!
//! Handlers, auth middleware, domain services and application setup.

mod api_doc;
mod handlers;
mod telemetry;

pub mod audit;
pub mod auth;
pub mod error;
pub mod services;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::{AppState, HttpSettings, Stores};
