//! Builds the configured object store.

use std::sync::Arc;

use tracing::info;

use cloudfiles_core::config::StorageConfig;
use cloudfiles_core::error::AppError;
use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::storage::ObjectStore;

use crate::providers::local::LocalObjectStore;

/// Create the object store named by `storage.provider`.
pub async fn build_object_store(config: &StorageConfig) -> AppResult<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.provider.as_str() {
        "local" => Arc::new(LocalObjectStore::new(&config.local.root_path).await?),
        #[cfg(feature = "s3")]
        "s3" => Arc::new(crate::providers::s3::S3ObjectStore::new(&config.s3).await?),
        #[cfg(not(feature = "s3"))]
        "s3" => {
            return Err(AppError::configuration(
                "storage.provider = \"s3\" requires the `s3` feature",
            ));
        }
        other => {
            return Err(AppError::configuration(format!(
                "Unknown storage provider: {other}"
            )));
        }
    };

    info!(provider = store.provider_type(), "Object store ready");
    Ok(store)
}
