//! Error type for the archive pipelines.
//!
//! Every stage reports failures as a [`PipelineError`]. Its `Display` output
//! is exactly the message the tracker stores on a failed task.

use thiserror::Error;

use cloudfiles_core::error::AppError;

/// A failure that ends a task.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The archive breaks a size limit or the user has no quota left.
    #[error("{0}")]
    Validation(String),

    /// The archive could not be downloaded, read, or written to disk.
    #[error("Extraction failed: {0}")]
    Extraction(String),

    /// A catalog write, quota update, or upload failed mid-import. Nothing
    /// was committed.
    #[error("Import failed: {0}")]
    ImportTransaction(String),

    /// The export tree, the archive, or its upload could not be produced.
    #[error("Export failed: {0}")]
    ExportAssembly(String),

    /// The queue payload could not be decoded.
    #[error("Malformed task payload: {0}")]
    QueueOrSchema(String),

    /// The task ran past its deadline.
    #[error("Task exceeded its deadline of {0} seconds")]
    Timeout(u64),

    /// The task was cancelled before it finished.
    #[error("Task was cancelled")]
    Cancelled,

    /// The task row, quota row, or staging area was unusable.
    #[error("{0}")]
    Setup(String),
}

impl PipelineError {
    /// Build an import error from a catalog or storage failure.
    pub fn import(context: &str, err: AppError) -> Self {
        Self::ImportTransaction(format!("{context}: {}", err.message))
    }

    /// Build an export error from a catalog or storage failure.
    pub fn export(context: &str, err: AppError) -> Self {
        Self::ExportAssembly(format!("{context}: {}", err.message))
    }

    /// Build a setup error from a catalog failure.
    pub fn setup(context: &str, err: AppError) -> Self {
        Self::Setup(format!("{context}: {}", err.message))
    }
}

impl From<zip::result::ZipError> for PipelineError {
    fn from(err: zip::result::ZipError) -> Self {
        Self::Extraction(err.to_string())
    }
}
