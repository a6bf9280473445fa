//! Leads, lead activities and public enquiries.

pub mod enquiry;
pub mod lead;

pub use enquiry::{EnquiryRepository, ENQUIRY_ACTOR};
pub use lead::LeadRepository;
