//! Backend selection from `STORAGE_BACKEND`.

use crate::{Storage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use wayfarer_core::Config;

#[cfg_attr(
    not(any(feature = "storage-local", feature = "storage-s3")),
    allow(dead_code)
)]
fn missing(setting: &str, backend: StorageBackend) -> StorageError {
    StorageError::ConfigError(format!(
        "{} is required for the {} storage backend",
        setting, backend
    ))
}

#[cfg_attr(all(feature = "storage-local", feature = "storage-s3"), allow(dead_code))]
fn not_compiled(backend: StorageBackend, feature: &str) -> StorageError {
    StorageError::ConfigError(format!(
        "The {} storage backend is not compiled in; rebuild with the `{}` feature",
        backend, feature
    ))
}

/// Opens the object store that will hold legal PDFs.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let backend = config.storage_backend();
    match backend {
        StorageBackend::Local => open_local(config, backend).await,
        StorageBackend::S3 => open_s3(config, backend).await,
    }
}

#[cfg(feature = "storage-local")]
async fn open_local(config: &Config, backend: StorageBackend) -> StorageResult<Arc<dyn Storage>> {
    let root = config
        .local_storage_path()
        .ok_or_else(|| missing("LOCAL_STORAGE_PATH", backend))?;
    Ok(Arc::new(crate::LocalStorage::new(root).await?))
}

#[cfg(not(feature = "storage-local"))]
async fn open_local(_config: &Config, backend: StorageBackend) -> StorageResult<Arc<dyn Storage>> {
    Err(not_compiled(backend, "storage-local"))
}

#[cfg(feature = "storage-s3")]
async fn open_s3(config: &Config, backend: StorageBackend) -> StorageResult<Arc<dyn Storage>> {
    let bucket = config
        .s3_bucket()
        .ok_or_else(|| missing("S3_BUCKET", backend))?;
    let region = config
        .s3_region()
        .or_else(|| config.aws_region())
        .ok_or_else(|| missing("S3_REGION or AWS_REGION", backend))?;
    let storage = crate::S3Storage::new(
        bucket.to_string(),
        region.to_string(),
        config.s3_endpoint().map(String::from),
    )
    .await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-s3"))]
async fn open_s3(_config: &Config, backend: StorageBackend) -> StorageResult<Arc<dyn Storage>> {
    Err(not_compiled(backend, "storage-s3"))
}
