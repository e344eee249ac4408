//! Task register repository.

use sqlx::PgPool;

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_entity::task::{NewTask, Task, TaskStatus};

/// Repository for the `tasks_register` table.
#[derive(Debug, Clone)]
pub struct TaskRepository {
    pool: PgPool,
}

impl TaskRepository {
    /// Create a new task repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find a task by ID.
    pub async fn find_by_id(&self, task_id: &str) -> AppResult<Option<Task>> {
        sqlx::query_as::<_, Task>("SELECT * FROM tasks_register WHERE task_id = $1")
            .bind(task_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find task", e))
    }

    /// Register a pending task. An existing row with the same ID is left
    /// untouched.
    pub async fn create(&self, data: &NewTask) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO tasks_register \
             (task_id, task_type, user_id, status, message, folder_id, extra1, oss_path, created_at, updated_at) \
             VALUES ($1, $2, $3, 'pending', 'Waiting to be processed', $4, $5, $6, NOW(), NOW()) \
             ON CONFLICT (task_id) DO NOTHING",
        )
        .bind(&data.task_id)
        .bind(data.kind.task_type())
        .bind(&data.user_id)
        .bind(data.folder_id)
        .bind(&data.zip_file_name)
        .bind(&data.object_path)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to register task", e))?;
        Ok(())
    }

    /// Move a non-terminal task to `status`.
    ///
    /// Returns `false` when no row was updated, either because the task does
    /// not exist or because it already reached a terminal state.
    pub async fn update_status(
        &self,
        task_id: &str,
        status: TaskStatus,
        message: &str,
        object_path: Option<&str>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE tasks_register \
             SET status = $2, message = $3, oss_path = COALESCE($4, oss_path), updated_at = NOW() \
             WHERE task_id = $1 AND status NOT IN ('successed', 'failed')",
        )
        .bind(task_id)
        .bind(status)
        .bind(message)
        .bind(object_path)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to update task status", e)
        })?;

        Ok(result.rows_affected() > 0)
    }
}
