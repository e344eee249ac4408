//! Folder export: catalog tree to local directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::Catalog;
use cloudfiles_storage::transfer::download_to_file;

use crate::error::PipelineError;
use crate::staging::is_plain_name;

/// Counts produced by one export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Folders created.
    pub folders: u64,
    /// Files written.
    pub files: u64,
    /// Bytes written.
    pub bytes: u64,
    /// File entries skipped because they have no stored object.
    pub skipped: u64,
}

/// Materializes a user's catalog subtree on local disk.
#[derive(Debug, Clone)]
pub struct FolderExporter {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
}

impl FolderExporter {
    /// Create an exporter.
    pub fn new(catalog: Arc<dyn Catalog>, store: Arc<dyn ObjectStore>) -> Self {
        Self { catalog, store }
    }

    /// Write the live contents of `folder_id` (`None` = the user's root)
    /// under `root`.
    pub async fn export(
        &self,
        user_id: &str,
        folder_id: Option<Uuid>,
        root: &Path,
        cancel: &CancellationToken,
    ) -> Result<ExportSummary, PipelineError> {
        if let Some(id) = folder_id {
            self.check_source(user_id, id).await?;
        }

        fs::create_dir_all(root).await.map_err(|e| io_error("create", root, e))?;

        let mut summary = ExportSummary::default();
        let mut pending: Vec<(Option<Uuid>, PathBuf)> = vec![(folder_id, root.to_path_buf())];

        while let Some((parent, dir)) = pending.pop() {
            let children = self
                .catalog
                .list_children(user_id, parent)
                .await
                .map_err(|e| PipelineError::export("Failed to list folder", e))?;

            for child in children {
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                if !is_plain_name(&child.name) {
                    return Err(PipelineError::ExportAssembly(format!(
                        "Entry {} has an invalid name '{}'",
                        child.id, child.name
                    )));
                }

                let path = dir.join(&child.name);
                if child.is_folder {
                    fs::create_dir_all(&path)
                        .await
                        .map_err(|e| io_error("create", &path, e))?;
                    summary.folders += 1;
                    pending.push((Some(child.id), path));
                } else if child.online_editable {
                    let content = self
                        .catalog
                        .find_content(child.id, user_id)
                        .await
                        .map_err(|e| {
                            PipelineError::export(&format!("Failed to load '{}'", child.name), e)
                        })?
                        .map(|blob| blob.content)
                        .unwrap_or_default();
                    fs::write(&path, content.as_bytes())
                        .await
                        .map_err(|e| io_error("write", &path, e))?;
                    summary.files += 1;
                    summary.bytes += content.len() as u64;
                } else if let Some(key) = child.object_path.as_deref() {
                    let bytes = download_to_file(self.store.as_ref(), key, &path)
                        .await
                        .map_err(|e| {
                            PipelineError::export(&format!("Failed to download '{}'", child.name), e)
                        })?;
                    debug!(key, bytes, "Downloaded object");
                    summary.files += 1;
                    summary.bytes += bytes;
                } else {
                    warn!(entry_id = %child.id, name = %child.name, "File has no stored object, skipping");
                    summary.skipped += 1;
                }
            }
        }

        Ok(summary)
    }

    async fn check_source(&self, user_id: &str, id: Uuid) -> Result<(), PipelineError> {
        let entry = self
            .catalog
            .find_entry(id)
            .await
            .map_err(|e| PipelineError::setup("Failed to load source folder", e))?;
        match entry {
            Some(entry) if entry.is_folder && entry.user_id == user_id => Ok(()),
            _ => Err(PipelineError::Setup(format!("Folder {id} not found"))),
        }
    }
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::ExportAssembly(format!("Failed to {action} {}: {err}", path.display()))
}

#[cfg(test)]
mod tests {
    use cloudfiles_database::{CatalogTransaction, MemoryCatalog};
    use cloudfiles_entity::entry::NewEntry;
    use cloudfiles_storage::LocalObjectStore;

    use super::*;

    async fn fixture() -> (tempfile::TempDir, MemoryCatalog, Arc<LocalObjectStore>) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().join("objects")).await.unwrap());
        (dir, MemoryCatalog::new(), store)
    }

    #[tokio::test]
    async fn test_exports_nested_tree() {
        let (dir, catalog, store) = fixture().await;
        let blob = dir.path().join("blob");
        std::fs::write(&blob, vec![9u8; 300]).unwrap();
        store.put_file("u-1/b.bin", &blob).await.unwrap();

        let mut tx = catalog.begin().await.unwrap();
        let docs = tx
            .insert_entry(&NewEntry::folder("u-1", "docs", None))
            .await
            .unwrap();
        let note = tx
            .insert_entry(&NewEntry::file("u-1", "a.md", Some(docs), true))
            .await
            .unwrap();
        tx.set_entry_object(note, None, 5, Some("md")).await.unwrap();
        tx.insert_content(note, "u-1", "a.md", Some("md"), "hello")
            .await
            .unwrap();
        let bin = tx
            .insert_entry(&NewEntry::file("u-1", "b.bin", None, false))
            .await
            .unwrap();
        tx.set_entry_object(bin, Some("u-1/b.bin"), 300, Some("bin"))
            .await
            .unwrap();
        tx.insert_entry(&NewEntry::folder("u-1", "empty", None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let out = dir.path().join("out");
        let summary = FolderExporter::new(Arc::new(catalog), store)
            .export("u-1", None, &out, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.folders, 2);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.bytes, 305);
        assert_eq!(std::fs::read_to_string(out.join("docs/a.md")).unwrap(), "hello");
        assert_eq!(std::fs::read(out.join("b.bin")).unwrap().len(), 300);
        assert!(out.join("empty").is_dir());
    }

    #[tokio::test]
    async fn test_missing_blob_writes_empty_file_and_missing_object_is_skipped() {
        let (dir, catalog, store) = fixture().await;
        let mut tx = catalog.begin().await.unwrap();
        tx.insert_entry(&NewEntry::file("u-1", "orphan.md", None, true))
            .await
            .unwrap();
        tx.insert_entry(&NewEntry::file("u-1", "pending.bin", None, false))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let out = dir.path().join("out");
        let summary = FolderExporter::new(Arc::new(catalog), store)
            .export("u-1", None, &out, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.skipped, 1);
        assert_eq!(std::fs::read(out.join("orphan.md")).unwrap().len(), 0);
        assert!(!out.join("pending.bin").exists());
    }

    #[tokio::test]
    async fn test_soft_deleted_entries_are_not_exported() {
        let (dir, catalog, store) = fixture().await;
        let mut tx = catalog.begin().await.unwrap();
        let gone = tx
            .insert_entry(&NewEntry::folder("u-1", "gone", None))
            .await
            .unwrap();
        tx.insert_entry(&NewEntry::folder("u-1", "kept", None))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        catalog.soft_delete(gone).await;

        let out = dir.path().join("out");
        FolderExporter::new(Arc::new(catalog), store)
            .export("u-1", None, &out, &CancellationToken::new())
            .await
            .unwrap();
        assert!(out.join("kept").is_dir());
        assert!(!out.join("gone").exists());
    }

    #[tokio::test]
    async fn test_traversal_name_is_rejected() {
        let (dir, catalog, store) = fixture().await;
        let mut tx = catalog.begin().await.unwrap();
        tx.insert_entry(&NewEntry::folder("u-1", "..", None))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let err = FolderExporter::new(Arc::new(catalog), store)
            .export("u-1", None, &dir.path().join("out"), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ExportAssembly(_)));
    }

    #[tokio::test]
    async fn test_unknown_source_folder_fails() {
        let (dir, catalog, store) = fixture().await;
        let err = FolderExporter::new(Arc::new(catalog), store)
            .export(
                "u-1",
                Some(Uuid::new_v4()),
                &dir.path().join("out"),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Setup(_)));
    }
}
