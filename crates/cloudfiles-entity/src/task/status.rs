//! Task status and kind enumerations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of an archive task in the task register.
///
/// `Successed` is the literal value stored in the register and read by the
/// front end, so the spelling is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Registered by the producer, not yet picked up.
    Pending,
    /// A worker is handling the task.
    Processing,
    /// Finished without error.
    Successed,
    /// Finished with an error.
    Failed,
}

impl TaskStatus {
    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Successed | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Successed => "successed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which pipeline a task belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskKind {
    /// Zip archive to folder tree.
    Import,
    /// Folder tree to zip archive.
    Export,
}

impl TaskKind {
    /// Return the kind as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Import => "import",
            Self::Export => "export",
        }
    }

    /// Value of the `task_type` column in the task register.
    pub fn task_type(&self) -> &'static str {
        match self {
            Self::Import => "zip_import",
            Self::Export => "zip_export",
        }
    }

    /// Subdirectory of the staging root used by this pipeline.
    pub fn staging_dir(&self) -> &'static str {
        match self {
            Self::Import => "upload",
            Self::Export => "gen",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(TaskStatus::Successed.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Successed).unwrap();
        assert_eq!(json, "\"successed\"");
    }
}
