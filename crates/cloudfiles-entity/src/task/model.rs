//! Task register entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::payload::TaskMessage;
use super::status::{TaskKind, TaskStatus};

/// A row of the task register.
///
/// Rows are created by the producer that also publishes the queue message.
/// Workers only ever update `status`, `message`, and `object_path`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    /// Task identifier shared with the queue message.
    pub task_id: String,
    /// Owning user.
    pub user_id: String,
    /// `"zip_import"` or `"zip_export"`.
    pub task_type: String,
    /// Destination folder (import) or source folder (export); `None` is the root.
    pub folder_id: Option<Uuid>,
    /// Archive file name.
    #[sqlx(rename = "extra1")]
    pub zip_file_name: String,
    /// Current status.
    pub status: TaskStatus,
    /// Human-readable progress or error message.
    pub message: Option<String>,
    /// Storage key of the uploaded archive (imports) or of the produced
    /// archive once an export succeeds.
    #[sqlx(rename = "oss_path")]
    pub object_path: Option<String>,
    /// When the task was registered.
    pub created_at: DateTime<Utc>,
    /// When the task was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Data required to register a task before its message is published.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTask {
    /// Task identifier shared with the queue message.
    pub task_id: String,
    /// Owning user.
    pub user_id: String,
    /// Which pipeline handles the task.
    pub kind: TaskKind,
    /// Destination or source folder.
    pub folder_id: Option<Uuid>,
    /// Archive file name.
    pub zip_file_name: String,
    /// Storage key of an already uploaded archive (imports).
    #[serde(default)]
    pub object_path: Option<String>,
}

impl NewTask {
    /// The queue message announcing this task.
    pub fn message(&self) -> TaskMessage {
        TaskMessage {
            task_id: self.task_id.clone(),
            user_id: self.user_id.clone(),
            folder_id: self.folder_id,
            zip_file_name: self.zip_file_name.clone(),
        }
    }
}
