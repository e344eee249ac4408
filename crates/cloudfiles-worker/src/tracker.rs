//! Task status tracker.
//!
//! Writes `processing`, then `successed` or `failed`, onto the task register.
//! The catalog guards every write so a terminal row is never changed.

use std::sync::Arc;

use tracing::warn;

use cloudfiles_core::result::AppResult;
use cloudfiles_database::Catalog;
use cloudfiles_entity::task::TaskStatus;

use crate::error::PipelineError;

/// Message stored while a task runs.
pub const PROCESSING_MESSAGE: &str = "Task is being processed";

/// Message stored when a task succeeds.
pub const SUCCEEDED_MESSAGE: &str = "Task succeeded";

/// Persists task lifecycle transitions.
#[derive(Debug, Clone)]
pub struct TaskTracker {
    catalog: Arc<dyn Catalog>,
}

impl TaskTracker {
    /// Create a tracker over the given catalog.
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Record that a task was dequeued.
    ///
    /// Returns `false` when the row is missing or already terminal, in which
    /// case the task must not run.
    pub async fn mark_processing(&self, task_id: &str) -> AppResult<bool> {
        self.transition(task_id, TaskStatus::Processing, PROCESSING_MESSAGE, None)
            .await
    }

    /// Record success, along with the produced archive's object path if any.
    pub async fn mark_succeeded(&self, task_id: &str, object_path: Option<&str>) -> AppResult<()> {
        self.transition(task_id, TaskStatus::Successed, SUCCEEDED_MESSAGE, object_path)
            .await
            .map(|_| ())
    }

    /// Record failure with the error's message.
    pub async fn mark_failed(&self, task_id: &str, error: &PipelineError) -> AppResult<()> {
        self.transition(task_id, TaskStatus::Failed, &error.to_string(), None)
            .await
            .map(|_| ())
    }

    async fn transition(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
        object_path: Option<&str>,
    ) -> AppResult<bool> {
        let updated = self
            .catalog
            .update_task_status(task_id, status, message, object_path)
            .await?;
        if !updated {
            warn!(
                task_id,
                status = %status,
                "Task row missing or already terminal, status not written"
            );
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudfiles_database::MemoryCatalog;
    use cloudfiles_entity::task::{NewTask, TaskKind};

    async fn catalog_with_task() -> MemoryCatalog {
        let catalog = MemoryCatalog::new();
        catalog
            .register_task(&NewTask {
                task_id: "t-1".to_string(),
                user_id: "u-1".to_string(),
                kind: TaskKind::Export,
                folder_id: None,
                zip_file_name: "out.zip".to_string(),
                object_path: None,
            })
            .await
            .unwrap();
        catalog
    }

    #[tokio::test]
    async fn test_success_path() {
        let catalog = catalog_with_task().await;
        let tracker = TaskTracker::new(Arc::new(catalog.clone()));

        assert!(tracker.mark_processing("t-1").await.unwrap());
        let task = catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Processing);
        assert_eq!(task.message.as_deref(), Some(PROCESSING_MESSAGE));

        tracker
            .mark_succeeded("t-1", Some("archive/u-1/t-1/out.zip"))
            .await
            .unwrap();
        let task = catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Successed);
        assert_eq!(task.message.as_deref(), Some(SUCCEEDED_MESSAGE));
        assert_eq!(task.object_path.as_deref(), Some("archive/u-1/t-1/out.zip"));
    }

    #[tokio::test]
    async fn test_failure_message_is_error_text() {
        let catalog = catalog_with_task().await;
        let tracker = TaskTracker::new(Arc::new(catalog.clone()));

        tracker.mark_processing("t-1").await.unwrap();
        tracker
            .mark_failed("t-1", &PipelineError::Cancelled)
            .await
            .unwrap();

        let task = catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.message.as_deref(), Some("Task was cancelled"));
    }

    #[tokio::test]
    async fn test_terminal_row_is_left_alone() {
        let catalog = catalog_with_task().await;
        let tracker = TaskTracker::new(Arc::new(catalog.clone()));

        tracker.mark_failed("t-1", &PipelineError::Cancelled).await.unwrap();
        tracker.mark_succeeded("t-1", Some("late")).await.unwrap();
        assert!(!tracker.mark_processing("t-1").await.unwrap());

        let task = catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert!(task.object_path.is_none());
    }

    #[tokio::test]
    async fn test_missing_row_is_not_an_error() {
        let tracker = TaskTracker::new(Arc::new(MemoryCatalog::new()));
        assert!(!tracker.mark_processing("ghost").await.unwrap());
    }
}
