//! Transactional folder import.
//!
//! Walks an extracted tree and mirrors it into the catalog inside a single
//! [`CatalogTransaction`]. Files are uploaded to the object store, or stored
//! as text when they qualify as online-editable, and every byte is charged
//! to the user's quota. Any failure rolls back every row and quota increment
//! of the task. Objects uploaded before the failure stay behind unreferenced.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use cloudfiles_cache::keys;
use cloudfiles_core::config::worker::ImportConfig;
use cloudfiles_core::traits::cache::CacheProvider;
use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::{Catalog, CatalogTransaction};
use cloudfiles_entity::entry::{NewEntry, file_suffix};

use crate::error::PipelineError;

/// Decides which files are imported as online-editable text.
#[derive(Debug, Clone)]
pub struct EditablePolicy {
    suffixes: Vec<String>,
    max_bytes: u64,
}

impl EditablePolicy {
    /// Build the policy from import configuration.
    pub fn from_config(config: &ImportConfig) -> Self {
        Self {
            suffixes: config
                .editable_suffixes
                .iter()
                .map(|s| s.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_bytes: config.max_editable_bytes,
        }
    }

    /// Whether a file is a candidate before its bytes are inspected.
    pub fn accepts(&self, suffix: Option<&str>, size: u64) -> bool {
        size <= self.max_bytes
            && suffix.is_some_and(|s| self.suffixes.iter().any(|e| e.eq_ignore_ascii_case(s)))
    }
}

/// Counts produced by one import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Folders created.
    pub folders: u64,
    /// Files uploaded to the object store.
    pub objects: u64,
    /// Files stored as online-editable text.
    pub editable: u64,
    /// Bytes charged to the quota.
    pub bytes: u64,
}

/// Hands out millisecond timestamps that never repeat within one import.
#[derive(Debug, Default)]
struct UniqueMillis {
    last: i64,
}

impl UniqueMillis {
    fn next(&mut self, now: DateTime<Utc>) -> i64 {
        self.last = now.timestamp_millis().max(self.last + 1);
        self.last
    }
}

/// Object key for an imported file:
/// `{user}/{year}/{month:02}/{day}/{millis}-{name}`.
pub fn object_key(user_id: &str, now: DateTime<Utc>, millis: i64, name: &str) -> String {
    format!(
        "{user_id}/{}/{:02}/{}/{millis}-{name}",
        now.year(),
        now.month(),
        now.day()
    )
}

/// Imports extracted trees into the catalog.
#[derive(Debug, Clone)]
pub struct FolderImporter {
    catalog: Arc<dyn Catalog>,
    store: Arc<dyn ObjectStore>,
    cache: Arc<dyn CacheProvider>,
    policy: EditablePolicy,
}

impl FolderImporter {
    /// Create an importer.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        store: Arc<dyn ObjectStore>,
        cache: Arc<dyn CacheProvider>,
        policy: EditablePolicy,
    ) -> Self {
        Self {
            catalog,
            store,
            cache,
            policy,
        }
    }

    /// Import the contents of `root` under `parent_id` for `user_id`.
    ///
    /// Either the whole tree is committed or nothing is.
    pub async fn import(
        &self,
        root: &Path,
        user_id: &str,
        parent_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary, PipelineError> {
        let mut tx = self
            .catalog
            .begin()
            .await
            .map_err(|e| PipelineError::import("Failed to begin transaction", e))?;

        let summary = match self
            .import_tree(tx.as_mut(), root, user_id, parent_id, cancel)
            .await
        {
            Ok(summary) => summary,
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                return Err(err);
            }
        };

        tx.commit()
            .await
            .map_err(|e| PipelineError::import("Failed to commit import", e))?;

        info!(
            user_id,
            folders = summary.folders,
            objects = summary.objects,
            editable = summary.editable,
            bytes = summary.bytes,
            "Import committed"
        );

        if let Err(e) = self.cache.delete(&keys::recent_files(user_id)).await {
            warn!(user_id, error = %e, "Failed to invalidate recent files cache");
        }

        Ok(summary)
    }

    async fn import_tree(
        &self,
        tx: &mut dyn CatalogTransaction,
        root: &Path,
        user_id: &str,
        parent_id: Option<Uuid>,
        cancel: &CancellationToken,
    ) -> Result<ImportSummary, PipelineError> {
        let mut summary = ImportSummary::default();
        let mut clock = UniqueMillis::default();
        let mut pending: Vec<(PathBuf, Option<Uuid>)> = vec![(root.to_path_buf(), parent_id)];

        while let Some((dir, parent)) = pending.pop() {
            let mut subfolders = Vec::new();

            for (name, path, is_dir) in sorted_listing(&dir).await? {
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }

                if is_dir {
                    let id = tx
                        .insert_entry(&NewEntry::folder(user_id, &name, parent))
                        .await
                        .map_err(|e| PipelineError::import(&format!("Failed to insert folder '{name}'"), e))?;
                    summary.folders += 1;
                    subfolders.push((path, Some(id)));
                } else {
                    let size = self
                        .import_file(tx, &path, &name, user_id, parent, &mut clock, &mut summary)
                        .await?;
                    summary.bytes += size;
                }
            }

            // Pop subfolders in name order.
            pending.extend(subfolders.into_iter().rev());
        }

        Ok(summary)
    }

    #[allow(clippy::too_many_arguments)]
    async fn import_file(
        &self,
        tx: &mut dyn CatalogTransaction,
        path: &Path,
        name: &str,
        user_id: &str,
        parent: Option<Uuid>,
        clock: &mut UniqueMillis,
        summary: &mut ImportSummary,
    ) -> Result<u64, PipelineError> {
        let size = fs::metadata(path)
            .await
            .map_err(|e| PipelineError::ImportTransaction(format!("Failed to stat '{name}': {e}")))?
            .len();
        let suffix = file_suffix(name);

        let text = if self.policy.accepts(suffix, size) {
            let bytes = fs::read(path).await.map_err(|e| {
                PipelineError::ImportTransaction(format!("Failed to read '{name}': {e}"))
            })?;
            String::from_utf8(bytes).ok()
        } else {
            None
        };

        let id = tx
            .insert_entry(&NewEntry::file(user_id, name, parent, text.is_some()))
            .await
            .map_err(|e| PipelineError::import(&format!("Failed to insert file '{name}'"), e))?;

        match text {
            Some(text) => {
                tx.set_entry_object(id, None, size, suffix)
                    .await
                    .map_err(|e| PipelineError::import(&format!("Failed to update '{name}'"), e))?;
                tx.insert_content(id, user_id, name, suffix, &text)
                    .await
                    .map_err(|e| PipelineError::import(&format!("Failed to store '{name}'"), e))?;
                summary.editable += 1;
            }
            None => {
                let now = Utc::now();
                let key = object_key(user_id, now, clock.next(now), name);
                self.store
                    .put_file(&key, path)
                    .await
                    .map_err(|e| PipelineError::import(&format!("Failed to upload '{name}'"), e))?;
                tx.set_entry_object(id, Some(&key), size, suffix)
                    .await
                    .map_err(|e| PipelineError::import(&format!("Failed to update '{name}'"), e))?;
                debug!(key, bytes = size, "Uploaded object");
                summary.objects += 1;
            }
        }

        tx.increment_upload_used(user_id, size)
            .await
            .map_err(|e| PipelineError::import("Failed to update storage quota", e))?;

        Ok(size)
    }
}

/// `(name, path, is_dir)` for every file and directory in `dir`, sorted by name.
async fn sorted_listing(dir: &Path) -> Result<Vec<(String, PathBuf, bool)>, PipelineError> {
    let read_err =
        |e: std::io::Error| PipelineError::ImportTransaction(format!("Failed to read {}: {e}", dir.display()));

    let mut listing = Vec::new();
    let mut entries = fs::read_dir(dir).await.map_err(read_err)?;
    while let Some(entry) = entries.next_entry().await.map_err(read_err)? {
        let path = entry.path();
        let file_type = entry.file_type().await.map_err(read_err)?;
        if !file_type.is_dir() && !file_type.is_file() {
            warn!(path = %path.display(), "Skipping special file");
            continue;
        }
        let name = entry.file_name().into_string().map_err(|raw| {
            PipelineError::ImportTransaction(format!("Non UTF-8 file name {raw:?}"))
        })?;
        listing.push((name, path, file_type.is_dir()));
    }
    listing.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(listing)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_object_key_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        assert_eq!(
            object_key("u-1", now, 1741348800000, "a.png"),
            "u-1/2025/03/7/1741348800000-a.png"
        );
    }

    #[test]
    fn test_unique_millis_never_repeats() {
        let now = Utc.with_ymd_and_hms(2025, 3, 7, 12, 0, 0).unwrap();
        let mut clock = UniqueMillis::default();
        let a = clock.next(now);
        let b = clock.next(now);
        let c = clock.next(now);
        assert_eq!(a, now.timestamp_millis());
        assert_eq!(b, a + 1);
        assert_eq!(c, a + 2);
    }

    #[test]
    fn test_editable_policy() {
        let policy = EditablePolicy::from_config(&ImportConfig {
            max_entry_bytes: 1000,
            editable_suffixes: vec!["md".to_string(), ".TXT".to_string()],
            max_editable_bytes: 10,
        });
        assert!(policy.accepts(Some("md"), 10));
        assert!(policy.accepts(Some("MD"), 0));
        assert!(policy.accepts(Some("txt"), 5));
        assert!(!policy.accepts(Some("md"), 11));
        assert!(!policy.accepts(Some("png"), 1));
        assert!(!policy.accepts(None, 1));
    }
}
