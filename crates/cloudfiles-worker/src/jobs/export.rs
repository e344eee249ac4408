//! Folder export: assemble tree, build archive, upload.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::Catalog;
use cloudfiles_entity::task::TaskKind;

use crate::archive::build_archive;
use crate::error::PipelineError;
use crate::executor::{TaskContext, TaskHandler, TaskOutcome};
use crate::jobs::finalizer::UploadFinalizer;
use crate::tree::FolderExporter;

/// Handles `zip_export` tasks.
#[derive(Debug)]
pub struct ExportHandler {
    exporter: FolderExporter,
    finalizer: UploadFinalizer,
}

impl ExportHandler {
    /// Create the handler.
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn ObjectStore>) -> Self {
        Self {
            exporter: FolderExporter::new(catalog, Arc::clone(&store)),
            finalizer: UploadFinalizer::new(store),
        }
    }
}

#[async_trait]
impl TaskHandler for ExportHandler {
    fn kind(&self) -> TaskKind {
        TaskKind::Export
    }

    async fn execute(&self, ctx: &TaskContext<'_>) -> Result<TaskOutcome, PipelineError> {
        let message = ctx.message;
        let archive_path = ctx.staging.child(&message.zip_file_name)?;
        let root = ctx.staging.path().join(tree_dir_name(&message.zip_file_name));

        let summary = self
            .exporter
            .export(&message.user_id, message.folder_id, &root, &ctx.cancel)
            .await?;
        info!(
            folders = summary.folders,
            files = summary.files,
            bytes = summary.bytes,
            skipped = summary.skipped,
            "Folder tree assembled"
        );

        let size = build_archive(&root, &archive_path, &ctx.cancel).await?;
        info!(bytes = size, "Archive built");

        if ctx.cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        let key = self.finalizer.upload(message, &archive_path).await?;

        Ok(TaskOutcome {
            object_path: Some(key),
        })
    }
}

/// Directory the tree is assembled in: the archive name without a trailing
/// `.zip` (any case).
fn tree_dir_name(zip_file_name: &str) -> String {
    let len = zip_file_name.len();
    let stem = if len > 4
        && zip_file_name.is_char_boundary(len - 4)
        && zip_file_name[len - 4..].eq_ignore_ascii_case(".zip")
    {
        &zip_file_name[..len - 4]
    } else {
        ""
    };
    if stem.is_empty() {
        format!("{zip_file_name}.d")
    } else {
        stem.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tree_dir_name() {
        assert_eq!(tree_dir_name("photos.zip"), "photos");
        assert_eq!(tree_dir_name("Photos.ZIP"), "Photos");
        assert_eq!(tree_dir_name("photos.tar"), "photos.tar.d");
        assert_eq!(tree_dir_name(".zip"), ".zip.d");
    }
}
