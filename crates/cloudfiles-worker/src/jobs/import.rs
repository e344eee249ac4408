//! Archive import: download, validate, extract, import.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tracing::{info, warn};

use cloudfiles_core::config::worker::ImportConfig;
use cloudfiles_core::traits::cache::CacheProvider;
use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::Catalog;
use cloudfiles_entity::task::TaskKind;
use cloudfiles_storage::transfer::download_to_file;

use crate::archive::{ArchiveValidator, extract_archive};
use crate::error::PipelineError;
use crate::executor::{TaskContext, TaskHandler, TaskOutcome};
use crate::tree::{EditablePolicy, FolderImporter};

/// Handles `zip_import` tasks.
#[derive(Debug)]
pub struct ImportHandler {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    validator: ArchiveValidator,
    importer: FolderImporter,
}

impl ImportHandler {
    /// Create the handler.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        cache: Arc<dyn CacheProvider>,
        config: &ImportConfig,
    ) -> Self {
        Self {
            validator: ArchiveValidator::new(config.max_entry_bytes),
            importer: FolderImporter::new(
                Arc::clone(&catalog),
                Arc::clone(&store),
                cache,
                EditablePolicy::from_config(config),
            ),
            catalog,
            store,
        }
    }

    async fn source_key(&self, task_id: &str) -> Result<String, PipelineError> {
        let task = self
            .catalog
            .find_task(task_id)
            .await
            .map_err(|e| PipelineError::setup("Failed to load task", e))?;
        task.and_then(|t| t.object_path)
            .filter(|path| !path.is_empty())
            .ok_or_else(|| {
                PipelineError::Setup(format!("Task {task_id} not found or has no archive path"))
            })
    }

    async fn quota_headroom(&self, user_id: &str) -> Result<u128, PipelineError> {
        let quota = self
            .catalog
            .find_quota(user_id)
            .await
            .map_err(|e| PipelineError::setup("Failed to load storage quota", e))?
            .ok_or_else(|| {
                PipelineError::Setup(format!("Storage quota for user {user_id} not found"))
            })?;
        quota
            .headroom()
            .map_err(|e| PipelineError::setup("Invalid storage quota", e))
    }
}

#[async_trait]
impl TaskHandler for ImportHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Import
    }

    async fn execute(&self, ctx: &TaskContext<'_>) -> Result<TaskOutcome, PipelineError> {
        let message = ctx.message;
        let archive_path = ctx.staging.child(&message.zip_file_name)?;
        let key = self.source_key(&message.task_id).await?;

        download_to_file(self.store.as_ref(), &key, &archive_path)
            .await
            .map_err(|e| PipelineError::Extraction(format!("Failed to download archive: {}", e.message)))?;

        let headroom = self.quota_headroom(&message.user_id).await?;
        let manifest = self
            .validator
            .validate(&archive_path, headroom, &ctx.cancel)
            .await?;
        info!(
            files = manifest.files,
            directories = manifest.directories,
            declared_bytes = %manifest.total_bytes,
            headroom = %headroom,
            "Archive validated"
        );

        let extract_root = ctx.staging.path().join(archive_stem(&message.zip_file_name));
        let extracted = extract_archive(&archive_path, &extract_root, &ctx.cancel).await?;
        if let Err(e) = fs::remove_file(&archive_path).await {
            warn!(error = %e, "Failed to remove downloaded archive");
        }

        let summary = self
            .importer
            .import(&extract_root, &message.user_id, message.folder_id, &ctx.cancel)
            .await?;

        if u128::from(summary.bytes) > manifest.total_bytes {
            warn!(
                declared_bytes = %manifest.total_bytes,
                imported_bytes = summary.bytes,
                extracted_bytes = extracted.bytes,
                "Imported size exceeds the archive's declared size"
            );
        }

        Ok(TaskOutcome::default())
    }
}

/// Directory name an archive is extracted into: its file name without the
/// extension.
fn archive_stem(zip_file_name: &str) -> String {
    Path::new(zip_file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty() && *s != zip_file_name)
        .map(str::to_string)
        .unwrap_or_else(|| format!("{zip_file_name}.d"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_stem() {
        assert_eq!(archive_stem("photos.zip"), "photos");
        assert_eq!(archive_stem("backup.2024.zip"), "backup.2024");
        assert_eq!(archive_stem("noext"), "noext.d");
        assert_eq!(archive_stem(".zip"), ".zip.d");
    }
}
