//! Worker runner: the blocking dequeue loop for one queue.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use cloudfiles_core::config::WorkerConfig;
use cloudfiles_core::traits::queue::TaskQueue;
use cloudfiles_entity::task::TaskMessage;

use crate::error::PipelineError;
use crate::executor::{TaskContext, TaskHandler, TaskOutcome};
use crate::staging::StagingArea;
use crate::tracker::TaskTracker;

/// Pops tasks from one queue and runs them one at a time.
#[derive(Debug)]
pub struct WorkerRunner {
    /// Queue backend
    queue: Arc<dyn TaskQueue>,
    /// List this runner consumes
    queue_name: String,
    /// Pipeline for the queue's task kind
    handler: Arc<dyn TaskHandler>,
    /// Status writer
    tracker: TaskTracker,
    /// Worker configuration
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<dyn TaskQueue>,
        queue_name: impl Into<String>,
        handler: Arc<dyn TaskHandler>,
        tracker: TaskTracker,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            queue_name: queue_name.into(),
            handler,
            tracker,
            config,
        }
    }

    /// Run until the shutdown signal turns `true` or its sender is dropped.
    ///
    /// The signal is checked between bounded queue polls, never while a pop
    /// is in flight, so a popped message is always processed. A task in
    /// flight is only asked to stop through its cancellation token.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            queue = %self.queue_name,
            kind = %self.handler.kind(),
            backend = self.queue.backend(),
            "Worker started"
        );

        let retry = Duration::from_secs(self.config.dequeue_retry_seconds);

        loop {
            if *shutdown.borrow() || shutdown.has_changed().is_err() {
                break;
            }

            match self.queue.try_dequeue(&self.queue_name).await {
                Ok(Some(raw)) => self.process(&raw, &mut shutdown).await,
                Ok(None) => {}
                Err(e) => {
                    tracing::error!(queue = %self.queue_name, error = %e, "Failed to dequeue task");
                    tokio::select! {
                        changed = shutdown.changed() => {
                            if changed.is_err() || *shutdown.borrow() {
                                break;
                            }
                        }
                        _ = time::sleep(retry) => {}
                    }
                }
            }
        }

        tracing::info!(queue = %self.queue_name, "Worker shut down");
    }

    /// Decode and run one raw queue payload.
    ///
    /// Malformed payloads are logged and dropped.
    pub async fn process(&self, raw: &str, shutdown: &mut watch::Receiver<bool>) {
        let message = match TaskMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                let err = PipelineError::QueueOrSchema(e.to_string());
                tracing::error!(queue = %self.queue_name, payload = raw, error = %err, "Dropping task");
                return;
            }
        };

        let span = tracing::info_span!(
            "task",
            task_id = %message.task_id,
            user_id = %message.user_id,
            queue = %self.queue_name,
        );
        self.run_task(&message, shutdown).instrument(span).await;
    }

    async fn run_task(&self, message: &TaskMessage, shutdown: &mut watch::Receiver<bool>) {
        let started = Instant::now();
        tracing::info!(zip_file_name = %message.zip_file_name, "Task received");

        match self.tracker.mark_processing(&message.task_id).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!("Task is unknown or already finished, dropping message");
                return;
            }
            Err(e) => tracing::error!(error = %e, "Failed to mark task processing"),
        }

        let (result, staging) = match StagingArea::create(
            &self.config.staging_root,
            self.handler.kind(),
            &message.task_id,
        )
        .await
        {
            Ok(staging) => {
                let result = {
                    let ctx = TaskContext {
                        message,
                        staging: &staging,
                        cancel: CancellationToken::new(),
                    };
                    self.execute(&ctx, shutdown).await
                };
                (result, Some(staging))
            }
            Err(e) => (Err(e), None),
        };

        let written = match &result {
            Ok(outcome) => {
                tracing::info!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    object_path = outcome.object_path.as_deref().unwrap_or(""),
                    "Task succeeded"
                );
                self.tracker
                    .mark_succeeded(&message.task_id, outcome.object_path.as_deref())
                    .await
            }
            Err(err) => {
                tracing::error!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %err,
                    "Task failed"
                );
                self.tracker.mark_failed(&message.task_id, err).await
            }
        };
        if let Err(e) = written {
            tracing::error!(error = %e, "Failed to record task status");
        }

        if let Some(staging) = staging {
            staging.cleanup().await;
        }
    }

    /// Run the handler under the task deadline, cancelling it on shutdown.
    async fn execute(
        &self,
        ctx: &TaskContext<'_>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Result<TaskOutcome, PipelineError> {
        let deadline = Duration::from_secs(self.config.task_timeout_seconds);
        let run = time::timeout(deadline, self.handler.execute(ctx));
        tokio::pin!(run);

        let mut watching = true;
        loop {
            tokio::select! {
                outcome = &mut run => {
                    return match outcome {
                        Ok(result) => result,
                        Err(_) => {
                            ctx.cancel.cancel();
                            Err(PipelineError::Timeout(deadline.as_secs()))
                        }
                    };
                }
                changed = shutdown.changed(), if watching => {
                    match changed {
                        Ok(()) if *shutdown.borrow() => {
                            tracing::warn!("Shutdown requested, cancelling task");
                            ctx.cancel.cancel();
                            watching = false;
                        }
                        Ok(()) => {}
                        Err(_) => watching = false,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use cloudfiles_cache::memory::MemoryTaskQueue;
    use cloudfiles_database::{Catalog, MemoryCatalog};
    use cloudfiles_entity::task::{NewTask, TaskKind, TaskStatus};

    use super::*;

    #[derive(Debug)]
    enum Behavior {
        Succeed,
        Fail,
        Hang,
    }

    #[derive(Debug)]
    struct FakeHandler {
        behavior: Behavior,
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TaskHandler for FakeHandler {
        fn kind(&self) -> TaskKind {
            TaskKind::Export
        }

        async fn execute(&self, ctx: &TaskContext<'_>) -> Result<TaskOutcome, PipelineError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            std::fs::write(ctx.staging.path().join("scratch"), b"x").unwrap();
            match self.behavior {
                Behavior::Succeed => Ok(TaskOutcome {
                    object_path: Some(format!("archive/{}", ctx.message.task_id)),
                }),
                Behavior::Fail => Err(PipelineError::ExportAssembly("boom".to_string())),
                Behavior::Hang => {
                    ctx.cancel.cancelled().await;
                    Err(PipelineError::Cancelled)
                }
            }
        }
    }

    struct Fixture {
        _root: tempfile::TempDir,
        catalog: MemoryCatalog,
        queue: Arc<MemoryTaskQueue>,
        runs: Arc<AtomicUsize>,
        runner: WorkerRunner,
    }

    async fn fixture(behavior: Behavior, timeout_seconds: u64) -> Fixture {
        let root = tempfile::tempdir().unwrap();
        let catalog = MemoryCatalog::new();
        let queue = Arc::new(MemoryTaskQueue::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let config = WorkerConfig {
            staging_root: root.path().to_string_lossy().to_string(),
            task_timeout_seconds: timeout_seconds,
            ..WorkerConfig::default()
        };
        let runner = WorkerRunner::new(
            queue.clone(),
            "zip_export",
            Arc::new(FakeHandler {
                behavior,
                runs: Arc::clone(&runs),
            }),
            TaskTracker::new(Arc::new(catalog.clone())),
            config,
        );
        for id in ["t-1", "t-2"] {
            catalog
                .register_task(&NewTask {
                    task_id: id.to_string(),
                    user_id: "u-1".to_string(),
                    kind: TaskKind::Export,
                    folder_id: None,
                    zip_file_name: "out.zip".to_string(),
                    object_path: None,
                })
                .await
                .unwrap();
        }
        Fixture {
            _root: root,
            catalog,
            queue,
            runs,
            runner,
        }
    }

    fn payload(task_id: &str) -> String {
        format!(r#"{{"taskId":"{task_id}","userId":"u-1","folderId":null,"zipFileName":"out.zip"}}"#)
    }

    #[tokio::test]
    async fn test_success_marks_task_and_cleans_staging() {
        let fx = fixture(Behavior::Succeed, 60).await;
        let (_tx, mut rx) = watch::channel(false);

        fx.runner.process(&payload("t-1"), &mut rx).await;

        let task = fx.catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Successed);
        assert_eq!(task.object_path.as_deref(), Some("archive/t-1"));
        assert!(!fx._root.path().join("gen").join("t-1").exists());
    }

    #[tokio::test]
    async fn test_failure_message_is_recorded() {
        let fx = fixture(Behavior::Fail, 60).await;
        let (_tx, mut rx) = watch::channel(false);

        fx.runner.process(&payload("t-1"), &mut rx).await;

        let task = fx.catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.message.as_deref(), Some("Export failed: boom"));
        assert!(!fx._root.path().join("gen").join("t-1").exists());
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_task() {
        let fx = fixture(Behavior::Hang, 5).await;
        let (_tx, mut rx) = watch::channel(false);

        fx.runner.process(&payload("t-1"), &mut rx).await;

        let task = fx.catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(
            task.message.as_deref(),
            Some("Task exceeded its deadline of 5 seconds")
        );
    }

    #[tokio::test]
    async fn test_finished_task_is_not_run_again() {
        let fx = fixture(Behavior::Succeed, 60).await;
        let (_tx, mut rx) = watch::channel(false);

        fx.runner.process(&payload("t-1"), &mut rx).await;
        let first = fx.catalog.find_task("t-1").await.unwrap().unwrap();

        fx.runner.process(&payload("t-1"), &mut rx).await;
        let second = fx.catalog.find_task("t-1").await.unwrap().unwrap();

        assert_eq!(fx.runs.load(Ordering::SeqCst), 1);
        assert_eq!(second.status, TaskStatus::Successed);
        assert_eq!(second.updated_at, first.updated_at);
        assert!(!fx._root.path().join("gen").join("t-1").exists());
    }

    #[tokio::test]
    async fn test_unknown_task_is_dropped() {
        let fx = fixture(Behavior::Succeed, 60).await;
        let (_tx, mut rx) = watch::channel(false);

        fx.runner.process(&payload("t-404"), &mut rx).await;

        assert_eq!(fx.runs.load(Ordering::SeqCst), 0);
        assert!(fx.catalog.find_task("t-404").await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_worker_stops_between_polls() {
        let fx = fixture(Behavior::Succeed, 60).await;
        let (tx, rx) = watch::channel(false);
        let Fixture {
            queue, runs, runner, ..
        } = fx;
        let handle = tokio::spawn(async move { runner.run(rx).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        queue.enqueue("zip_export", &payload("t-1")).await.unwrap();
        assert_eq!(queue.pending("zip_export").await, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_payload_is_dropped() {
        let fx = fixture(Behavior::Succeed, 60).await;
        let (_tx, mut rx) = watch::channel(false);

        fx.runner.process("{not json", &mut rx).await;

        for id in ["t-1", "t-2"] {
            let task = fx.catalog.find_task(id).await.unwrap().unwrap();
            assert_eq!(task.status, TaskStatus::Pending);
        }
    }

    #[tokio::test]
    async fn test_run_processes_queue_until_shutdown() {
        let fx = fixture(Behavior::Succeed, 60).await;
        fx.queue.enqueue("zip_export", "garbage").await.unwrap();
        fx.queue.enqueue("zip_export", &payload("t-1")).await.unwrap();
        fx.queue.enqueue("zip_export", &payload("t-2")).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let Fixture {
            _root,
            catalog,
            queue,
            runner,
            ..
        } = fx;
        let handle = tokio::spawn(async move { runner.run(rx).await });

        for _ in 0..200 {
            let done = catalog.find_task("t-2").await.unwrap().unwrap().status.is_terminal();
            if done {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        for id in ["t-1", "t-2"] {
            let task = catalog.find_task(id).await.unwrap().unwrap();
            assert_eq!(task.status, TaskStatus::Successed);
        }
        assert_eq!(queue.pending("zip_export").await, 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_in_flight_task() {
        let fx = fixture(Behavior::Hang, 3600).await;
        fx.queue.enqueue("zip_export", &payload("t-1")).await.unwrap();

        let (tx, rx) = watch::channel(false);
        let Fixture {
            _root,
            catalog,
            runner,
            ..
        } = fx;
        let handle = tokio::spawn(async move { runner.run(rx).await });

        for _ in 0..200 {
            let status = catalog.find_task("t-1").await.unwrap().unwrap().status;
            if status == TaskStatus::Processing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        tx.send(true).unwrap();
        handle.await.unwrap();

        let task = catalog.find_task("t-1").await.unwrap().unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.message.as_deref(), Some("Task was cancelled"));
        assert!(!_root.path().join("gen").join("t-1").exists());
    }
}
