//! Persistence layer: PostgreSQL repositories and the store traits services depend on.

pub mod admin;
pub mod crm;
#[cfg(feature = "memory")]
pub mod memory;
pub mod referral;
pub mod store;
pub mod transaction;

pub use admin::{AdminRoleRepository, AuditLogRepository, LegalDocumentRepository};
pub use crm::{EnquiryRepository, LeadRepository, ENQUIRY_ACTOR};
#[cfg(feature = "memory")]
pub use memory::InMemoryStore;
pub use referral::{InfluencerRepository, PayoutRepository};
pub use store::{
    AdminRoleStore, AuditLogStore, ConversionPlan, EnquiryStore, LeadStore, LegalDocumentStore,
    PayoutStore, ReferralStore,
};
pub use transaction::TransactionGuard;
