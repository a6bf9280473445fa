//! Back-office tables: audit trail, admin roles and legal documents.

pub mod audit;
pub mod legal;
pub mod team;

pub use audit::AuditLogRepository;
pub use legal::LegalDocumentRepository;
pub use team::AdminRoleRepository;
