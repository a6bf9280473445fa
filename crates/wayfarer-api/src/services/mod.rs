//! Domain services. Handlers stay thin and delegate here; mutations come back
//! wrapped in [`Audited`](wayfarer_core::models::Audited) for the audit trail.

pub mod audit_logs;
pub mod conversion;
pub mod enquiries;
pub mod influencers;
pub mod leads;
pub mod legal;
pub mod payouts;
pub mod team;

pub use audit_logs::AuditLogService;
pub use conversion::ConversionService;
pub use enquiries::EnquiryService;
pub use influencers::InfluencerService;
pub use leads::LeadService;
pub use legal::{LegalService, PdfUpload, FILES_URL_PREFIX};
pub use payouts::PayoutService;
pub use team::TeamService;
