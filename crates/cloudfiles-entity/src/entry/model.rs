//! Catalog entry entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A file or folder node in a user's catalog tree.
///
/// A non-folder entry is either online-editable (content lives in a
/// [`ContentBlob`](super::ContentBlob), `object_path` is `None`) or backed by
/// an object in the object store (`object_path` is set).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CatalogEntry {
    /// Unique entry identifier.
    pub id: Uuid,
    /// Owning user.
    pub user_id: String,
    /// File or folder name.
    pub name: String,
    /// Whether this entry is a folder.
    pub is_folder: bool,
    /// Parent folder (`None` = the user's root).
    pub parent_id: Option<Uuid>,
    /// Object store key for non-editable files.
    #[sqlx(rename = "oss_path")]
    pub object_path: Option<String>,
    /// File size in bytes.
    pub size: Option<i64>,
    /// File name suffix without the dot.
    pub file_suffix: Option<String>,
    /// Whether the content is stored as editable text.
    pub online_editable: bool,
    /// When the entry was created.
    pub created_at: DateTime<Utc>,
    /// When the entry was last updated.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl CatalogEntry {
    /// Check if the entry has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Data required to insert a catalog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewEntry {
    /// Owning user.
    pub user_id: String,
    /// File or folder name.
    pub name: String,
    /// Whether this entry is a folder.
    pub is_folder: bool,
    /// Parent folder.
    pub parent_id: Option<Uuid>,
    /// Whether the content is stored as editable text.
    pub online_editable: bool,
}

impl NewEntry {
    /// A folder under `parent_id`.
    pub fn folder(user_id: &str, name: &str, parent_id: Option<Uuid>) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
            is_folder: true,
            parent_id,
            online_editable: false,
        }
    }

    /// A file under `parent_id`.
    pub fn file(user_id: &str, name: &str, parent_id: Option<Uuid>, online_editable: bool) -> Self {
        Self {
            user_id: user_id.to_string(),
            name: name.to_string(),
            is_folder: false,
            parent_id,
            online_editable,
        }
    }
}

/// The text after the last `.` of a file name, if any.
pub fn file_suffix(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, suffix)| suffix)
}
