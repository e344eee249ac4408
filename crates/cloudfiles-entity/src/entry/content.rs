//! Online-editable content entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Text content of an online-editable catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ContentBlob {
    /// Identifier of the owning catalog entry.
    #[sqlx(rename = "id")]
    pub entry_id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// File name, mirrored from the entry.
    pub name: String,
    /// File suffix, mirrored from the entry.
    pub file_suffix: Option<String>,
    /// The text content.
    pub content: String,
    /// When the content was created.
    pub created_at: DateTime<Utc>,
    /// When the content was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}
