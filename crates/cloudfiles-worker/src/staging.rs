//! Per-task scratch directories.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, warn};

use cloudfiles_entity::task::TaskKind;

use crate::error::PipelineError;

/// Whether `name` can be used as a single path component.
pub fn is_plain_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// Local scratch directory owned by one task.
///
/// Lives at `<root>/<upload|gen>/<taskId>`. The runner awaits
/// [`cleanup`](Self::cleanup) on every exit path; `Drop` removes the
/// directory synchronously if that never happened.
#[derive(Debug)]
pub struct StagingArea {
    path: PathBuf,
    removed: bool,
}

impl StagingArea {
    /// Create a fresh staging directory for a task.
    ///
    /// A directory left behind by a crashed run of the same task is removed
    /// first.
    pub async fn create(
        root: impl AsRef<Path>,
        kind: TaskKind,
        task_id: &str,
    ) -> Result<Self, PipelineError> {
        if !is_plain_name(task_id) {
            return Err(PipelineError::Setup(format!("Invalid task id '{task_id}'")));
        }

        let path = root.as_ref().join(kind.staging_dir()).join(task_id);
        if fs::try_exists(&path).await.unwrap_or(false) {
            warn!(path = %path.display(), "Removing stale staging directory");
            fs::remove_dir_all(&path).await.map_err(|e| {
                PipelineError::Setup(format!("Failed to clear {}: {e}", path.display()))
            })?;
        }
        fs::create_dir_all(&path).await.map_err(|e| {
            PipelineError::Setup(format!("Failed to create {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), "Created staging directory");
        Ok(Self {
            path,
            removed: false,
        })
    }

    /// The staging directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path directly inside the staging directory.
    pub fn child(&self, name: &str) -> Result<PathBuf, PipelineError> {
        if !is_plain_name(name) {
            return Err(PipelineError::Validation(format!(
                "Invalid archive file name '{name}'"
            )));
        }
        Ok(self.path.join(name))
    }

    /// Remove the directory and everything in it.
    ///
    /// Failures are logged, never returned.
    pub async fn cleanup(mut self) {
        match fs::remove_dir_all(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Removed staging directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Failed to remove staging directory"),
        }
        self.removed = true;
    }
}

impl Drop for StagingArea {
    fn drop(&mut self) {
        if self.removed {
            return;
        }
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to remove staging directory on drop")
            }
        }
    }
}
