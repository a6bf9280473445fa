//! Object storage for uploaded documents.
//!
//! Keys are path-like (`legal/privacy/1736467200000-policy.pdf`). They must not be
//! empty, start with `/`, contain `..` or a backslash, or have a segment that starts
//! with `.`. Validation lives in the `keys` module so every backend rejects the same
//! inputs.

pub mod factory;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult, StoredObject};
pub use wayfarer_core::StorageBackend;
