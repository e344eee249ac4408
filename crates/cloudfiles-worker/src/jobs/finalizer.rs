//! Upload of finished export archives.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_entity::task::TaskMessage;

use crate::error::PipelineError;

/// Object key of an export archive: `archive/{userId}/{taskId}/{zipFileName}`.
pub fn archive_key(message: &TaskMessage) -> String {
    format!(
        "archive/{}/{}/{}",
        message.user_id, message.task_id, message.zip_file_name
    )
}

/// Uploads a built archive under the task's namespace.
#[derive(Debug, Clone)]
pub struct UploadFinalizer {
    store: Arc<dyn ObjectStore>,
}

impl UploadFinalizer {
    /// Create a finalizer writing to `store`.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload `archive` and return its object key.
    pub async fn upload(&self, message: &TaskMessage, archive: &Path) -> Result<String, PipelineError> {
        let key = archive_key(message);
        let bytes = self
            .store
            .put_file(&key, archive)
            .await
            .map_err(|e| PipelineError::export("Failed to upload archive", e))?;
        info!(key = %key, bytes, "Archive uploaded");
        Ok(key)
    }
}
