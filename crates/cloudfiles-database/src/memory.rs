//! In-process catalog used by tests and local runs without PostgreSQL.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use cloudfiles_core::error::AppError;
use cloudfiles_core::result::AppResult;
use cloudfiles_entity::entry::{CatalogEntry, ContentBlob, NewEntry};
use cloudfiles_entity::quota::StorageQuota;
use cloudfiles_entity::task::{NewTask, Task, TaskStatus};

use crate::catalog::{Catalog, CatalogTransaction};

#[derive(Debug, Default)]
struct MemoryState {
    tasks: HashMap<String, Task>,
    entries: HashMap<Uuid, CatalogEntry>,
    contents: HashMap<Uuid, ContentBlob>,
    quotas: HashMap<String, StorageQuota>,
    failing_names: Vec<String>,
}

/// A catalog held entirely in memory.
///
/// Transactions buffer their writes and apply them under a single lock on
/// commit, so concurrent imports observe the same atomicity the database
/// gives.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create or replace a user's quota row.
    pub async fn set_quota(&self, user_id: &str, upload_limit: u128, upload_used: u128) {
        let mut state = self.state.lock().await;
        state.quotas.insert(
            user_id.to_string(),
            StorageQuota {
                user_id: user_id.to_string(),
                upload_limit: upload_limit.to_string(),
                upload_used: upload_used.to_string(),
                updated_at: Utc::now(),
            },
        );
    }

    /// Every committed entry of a user, deleted or not.
    pub async fn entries_for(&self, user_id: &str) -> Vec<CatalogEntry> {
        let state = self.state.lock().await;
        let mut entries: Vec<CatalogEntry> = state
            .entries
            .values()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Mark an entry and its content as deleted.
    pub async fn soft_delete(&self, id: Uuid) {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        if let Some(entry) = state.entries.get_mut(&id) {
            entry.deleted_at = Some(now);
        }
        if let Some(content) = state.contents.get_mut(&id) {
            content.deleted_at = Some(now);
        }
    }

    /// Make any later `insert_entry` for `name` fail, to exercise rollback.
    pub async fn fail_inserts_named(&self, name: &str) {
        self.state.lock().await.failing_names.push(name.to_string());
    }
}

#[async_trait]
impl Catalog for MemoryCatalog {
    async fn find_task(&self, task_id: &str) -> AppResult<Option<Task>> {
        Ok(self.state.lock().await.tasks.get(task_id).cloned())
    }

    async fn register_task(&self, task: &NewTask) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        state.tasks.entry(task.task_id.clone()).or_insert(Task {
            task_id: task.task_id.clone(),
            user_id: task.user_id.clone(),
            task_type: task.kind.task_type().to_string(),
            folder_id: task.folder_id,
            zip_file_name: task.zip_file_name.clone(),
            status: TaskStatus::Pending,
            message: Some("Waiting to be processed".to_string()),
            object_path: task.object_path.clone(),
            created_at: now,
            updated_at: now,
        });
        Ok(())
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
        object_path: Option<&str>,
    ) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        match state.tasks.get_mut(task_id) {
            Some(task) if !task.status.is_terminal() => {
                task.status = status;
                task.message = Some(message.to_string());
                if let Some(path) = object_path {
                    task.object_path = Some(path.to_string());
                }
                task.updated_at = Utc::now();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_quota(&self, user_id: &str) -> AppResult<Option<StorageQuota>> {
        Ok(self.state.lock().await.quotas.get(user_id).cloned())
    }

    async fn find_entry(&self, id: Uuid) -> AppResult<Option<CatalogEntry>> {
        Ok(self
            .state
            .lock()
            .await
            .entries
            .get(&id)
            .filter(|e| !e.is_deleted())
            .cloned())
    }

    async fn list_children(
        &self,
        user_id: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CatalogEntry>> {
        let state = self.state.lock().await;
        let mut children: Vec<CatalogEntry> = state
            .entries
            .values()
            .filter(|e| e.user_id == user_id && e.parent_id == parent_id && !e.is_deleted())
            .cloned()
            .collect();
        children.sort_by(|a, b| {
            b.is_folder
                .cmp(&a.is_folder)
                .then_with(|| a.name.cmp(&b.name))
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(children)
    }

    async fn find_content(&self, entry_id: Uuid, user_id: &str) -> AppResult<Option<ContentBlob>> {
        Ok(self
            .state
            .lock()
            .await
            .contents
            .get(&entry_id)
            .filter(|c| c.user_id == user_id && c.deleted_at.is_none())
            .cloned())
    }

    async fn begin(&self) -> AppResult<Box<dyn CatalogTransaction>> {
        Ok(Box::new(MemoryCatalogTransaction {
            state: Arc::clone(&self.state),
            entries: Vec::new(),
            contents: Vec::new(),
            quota_deltas: HashMap::new(),
        }))
    }
}

struct MemoryCatalogTransaction {
    state: Arc<Mutex<MemoryState>>,
    entries: Vec<CatalogEntry>,
    contents: Vec<ContentBlob>,
    quota_deltas: HashMap<String, u128>,
}

#[async_trait]
impl CatalogTransaction for MemoryCatalogTransaction {
    async fn insert_entry(&mut self, entry: &NewEntry) -> AppResult<Uuid> {
        if self
            .state
            .lock()
            .await
            .failing_names
            .iter()
            .any(|n| *n == entry.name)
        {
            return Err(AppError::database(format!(
                "Failed to insert entry '{}'",
                entry.name
            )));
        }

        let now = Utc::now();
        let id = Uuid::new_v4();
        self.entries.push(CatalogEntry {
            id,
            user_id: entry.user_id.clone(),
            name: entry.name.clone(),
            is_folder: entry.is_folder,
            parent_id: entry.parent_id,
            object_path: None,
            size: None,
            file_suffix: None,
            online_editable: entry.online_editable,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        Ok(id)
    }

    async fn set_entry_object(
        &mut self,
        id: Uuid,
        object_path: Option<&str>,
        size: u64,
        suffix: Option<&str>,
    ) -> AppResult<()> {
        let size = i64::try_from(size)
            .map_err(|_| AppError::validation(format!("File size {size} out of range")))?;
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| AppError::not_found(format!("Entry {id} not found")))?;
        entry.object_path = object_path.map(str::to_string);
        entry.size = Some(size);
        entry.file_suffix = suffix.map(str::to_string);
        entry.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_content(
        &mut self,
        entry_id: Uuid,
        user_id: &str,
        name: &str,
        suffix: Option<&str>,
        content: &str,
    ) -> AppResult<()> {
        let now = Utc::now();
        self.contents.push(ContentBlob {
            entry_id,
            user_id: user_id.to_string(),
            name: name.to_string(),
            file_suffix: suffix.map(str::to_string),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });
        Ok(())
    }

    async fn increment_upload_used(&mut self, user_id: &str, bytes: u64) -> AppResult<()> {
        if !self.state.lock().await.quotas.contains_key(user_id) {
            return Err(AppError::not_found(format!(
                "Storage quota for user {user_id} not found"
            )));
        }
        *self.quota_deltas.entry(user_id.to_string()).or_insert(0) += u128::from(bytes);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let Self {
            state,
            entries,
            contents,
            quota_deltas,
        } = *self;
        let mut state = state.lock().await;

        let mut updated = Vec::with_capacity(quota_deltas.len());
        for (user_id, delta) in &quota_deltas {
            let quota = state.quotas.get(user_id).ok_or_else(|| {
                AppError::not_found(format!("Storage quota for user {user_id} not found"))
            })?;
            let used = quota.used_bytes()? + delta;
            updated.push((user_id.clone(), used));
        }

        let now = Utc::now();
        for (user_id, used) in updated {
            if let Some(quota) = state.quotas.get_mut(&user_id) {
                quota.upload_used = used.to_string();
                quota.updated_at = now;
            }
        }
        for entry in entries {
            state.entries.insert(entry.id, entry);
        }
        for content in contents {
            state.contents.insert(content.entry_id, content);
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
}
