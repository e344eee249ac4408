//! The catalog seam used by the archive workers.
//!
//! The workers never talk to sqlx directly. They depend on [`Catalog`] for
//! reads and tracker writes, and on [`CatalogTransaction`] for the
//! all-or-nothing folder import.

use std::fmt::Debug;

use async_trait::async_trait;
use uuid::Uuid;

use cloudfiles_core::result::AppResult;
use cloudfiles_entity::entry::{CatalogEntry, ContentBlob, NewEntry};
use cloudfiles_entity::quota::StorageQuota;
use cloudfiles_entity::task::{NewTask, Task, TaskStatus};

/// Catalog operations consumed by the import and export pipelines.
#[async_trait]
pub trait Catalog: Send + Sync + Debug + 'static {
    /// Find a task register row.
    async fn find_task(&self, task_id: &str) -> AppResult<Option<Task>>;

    /// Register a pending task.
    async fn register_task(&self, task: &NewTask) -> AppResult<()>;

    /// Move a non-terminal task to `status`. `object_path`, when given,
    /// replaces the stored path; `None` leaves it untouched.
    ///
    /// Returns `false` if the row is missing or already terminal.
    async fn update_task_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
        object_path: Option<&str>,
    ) -> AppResult<bool>;

    /// Read a user's quota row.
    async fn find_quota(&self, user_id: &str) -> AppResult<Option<StorageQuota>>;

    /// Find a live entry by ID.
    async fn find_entry(&self, id: Uuid) -> AppResult<Option<CatalogEntry>>;

    /// Live children of `parent_id` (`None` = the user's root) in a stable order.
    async fn list_children(
        &self,
        user_id: &str,
        parent_id: Option<Uuid>,
    ) -> AppResult<Vec<CatalogEntry>>;

    /// Live content of an online-editable entry.
    async fn find_content(&self, entry_id: Uuid, user_id: &str) -> AppResult<Option<ContentBlob>>;

    /// Open a transaction for a folder import.
    async fn begin(&self) -> AppResult<Box<dyn CatalogTransaction>>;
}

/// Writes performed by one folder import.
///
/// Nothing is visible to other readers until [`commit`](Self::commit).
/// Dropping the transaction without committing rolls it back.
#[async_trait]
pub trait CatalogTransaction: Send {
    /// Insert an entry and return its generated ID.
    async fn insert_entry(&mut self, entry: &NewEntry) -> AppResult<Uuid>;

    /// Record a file's object path, size and suffix.
    async fn set_entry_object(
        &mut self,
        id: Uuid,
        object_path: Option<&str>,
        size: u64,
        suffix: Option<&str>,
    ) -> AppResult<()>;

    /// Store the text of an online-editable entry.
    async fn insert_content(
        &mut self,
        entry_id: Uuid,
        user_id: &str,
        name: &str,
        suffix: Option<&str>,
        content: &str,
    ) -> AppResult<()>;

    /// Atomically add `bytes` to the user's used upload quota.
    async fn increment_upload_used(&mut self, user_id: &str, bytes: u64) -> AppResult<()>;

    /// Make every write visible.
    async fn commit(self: Box<Self>) -> AppResult<()>;

    /// Discard every write.
    async fn rollback(self: Box<Self>) -> AppResult<()>;
}
