//! Queue message payload.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A message popped from the import or export queue.
///
/// For imports `zip_file_name` is the name of the uploaded archive (its object
/// key lives on the task row) and `folder_id` is the destination folder
/// (`None` means the user's root). For exports `zip_file_name` is the name of
/// the archive to produce and `folder_id` is the folder to export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMessage {
    /// Task register identifier.
    pub task_id: String,
    /// Owning user.
    pub user_id: String,
    /// Destination or source folder.
    #[serde(default)]
    pub folder_id: Option<Uuid>,
    /// Archive file name.
    pub zip_file_name: String,
}

impl TaskMessage {
    /// Parse a raw queue payload.
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Serialize to the queue wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
