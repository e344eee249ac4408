//! Task handler seam.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use cloudfiles_entity::task::{TaskKind, TaskMessage};

use crate::error::PipelineError;
use crate::staging::StagingArea;

/// Everything a handler needs to run one task.
#[derive(Debug)]
pub struct TaskContext<'a> {
    /// The decoded queue message.
    pub message: &'a TaskMessage,
    /// The task's scratch directory.
    pub staging: &'a StagingArea,
    /// Cancelled when the deadline passes or shutdown is requested.
    pub cancel: CancellationToken,
}

/// Result of a successful task.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskOutcome {
    /// Object path to record on the task row.
    pub object_path: Option<String>,
}

/// Runs the pipeline for one kind of task.
#[async_trait]
pub trait TaskHandler: Send + Sync + std::fmt::Debug {
    /// The kind of task this handler processes.
    fn kind(&self) -> TaskKind;

    /// Run the pipeline for one task.
    async fn execute(&self, ctx: &TaskContext<'_>) -> Result<TaskOutcome, PipelineError>;
}
