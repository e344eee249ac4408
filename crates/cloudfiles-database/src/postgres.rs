//! PostgreSQL implementation of the catalog seam.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_entity::entry::{CatalogEntry, ContentBlob, NewEntry};
use cloudfiles_entity::quota::StorageQuota;
use cloudfiles_entity::task::{NewTask, Task, TaskStatus};

use crate::catalog::{Catalog, CatalogTransaction};
use crate::repositories::{ContentRepository, EntryRepository, QuotaRepository, TaskRepository};

/// Catalog backed by the shared PostgreSQL database.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
    tasks: TaskRepository,
    entries: EntryRepository,
    contents: ContentRepository,
    quotas: QuotaRepository,
}

impl PgCatalog {
    /// Build the catalog over a connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            tasks: TaskRepository::new(pool.clone()),
            entries: EntryRepository::new(pool.clone()),
            contents: ContentRepository::new(pool.clone()),
            quotas: QuotaRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl Catalog for PgCatalog {
    async fn find_task(&self, task_id: &str) -> AppResult<Option<Task>> {
        self.tasks.find_by_id(task_id).await
    }

    async fn register_task(&self, task: &NewTask) -> AppResult<()> {
        self.tasks.create(task).await
    }

    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
        object_path: Option<&str>,
    ) -> AppResult<bool> {
        self.tasks
            .update_status(task_id, status, message, object_path)
            .await
    }

    async fn find_quota(&self, user_id: &str) -> AppResult<Option<StorageQuota>> {
        self.quotas.find_by_user(user_id).await
    }

    async fn find_entry(&self, id: Uuid) -> AppResult<Option<CatalogEntry>> {
        self.entries.find_by_id(id).await
    }

    async fn list_children(
        &self,
        user_id: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CatalogEntry>> {
        self.entries.find_children(user_id, parent_id).await
    }

    async fn find_content(&self, entry_id: Uuid, user_id: &str) -> AppResult<Option<ContentBlob>> {
        self.contents.find_by_entry(entry_id, user_id).await
    }

    async fn begin(&self) -> AppResult<Box<dyn CatalogTransaction>> {
        let tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;
        Ok(Box::new(PgCatalogTransaction { tx: Some(tx) }))
    }
}

/// An open PostgreSQL transaction. sqlx rolls it back if it is dropped.
struct PgCatalogTransaction {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgCatalogTransaction {
    fn conn(&mut self) -> AppResult<&mut PgConnection> {
        self.tx
            .as_deref_mut()
            .ok_or_else(|| AppError::conflict("Transaction already finished"))
    }

    fn take(&mut self) -> AppResult<Transaction<'static, Postgres>> {
        self.tx
            .take()
            .ok_or_else(|| AppError::conflict("Transaction already finished"))
    }
}

#[async_trait]
impl CatalogTransaction for PgCatalogTransaction {
    async fn insert_entry(&mut self, entry: &NewEntry) -> AppResult<Uuid> {
        EntryRepository::insert(self.conn()?, entry).await
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
        EntryRepository::set_object(self.conn()?, id, object_path, size, suffix).await
    }

    async fn insert_content(
        &mut self,
        entry_id: Uuid,
        user_id: &str,
        name: &str,
        suffix: Option<&str>,
        content: &str,
    ) -> AppResult<()> {
        ContentRepository::insert(self.conn()?, entry_id, user_id, name, suffix, content).await
    }

    async fn increment_upload_used(&mut self, user_id: &str, bytes: u64) -> AppResult<()> {
        QuotaRepository::increment_upload_used(self.conn()?, user_id, bytes).await
    }

    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        self.take()?
            .commit()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to commit", e))?;
        debug!("Committed catalog transaction");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> AppResult<()> {
        self.take()?
            .rollback()
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to roll back", e))?;
        debug!("Rolled back catalog transaction");
        Ok(())
    }
}
