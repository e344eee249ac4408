//! Cloudfiles archive worker.
//!
//! Wires the catalog, object store, cache and work queue together and runs
//! one worker per archive queue until SIGINT or SIGTERM.

use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};
use uuid::Uuid;

use cloudfiles_cache::{CacheManager, build_task_queue};
use cloudfiles_core::config::AppConfig;
use cloudfiles_core::error::AppError;
use cloudfiles_core::traits::cache::CacheProvider;
use cloudfiles_core::traits::queue::TaskQueue;
use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::{Catalog, DatabasePool, PgCatalog};
use cloudfiles_entity::task::{NewTask, TaskKind};
use cloudfiles_storage::build_object_store;
use cloudfiles_worker::{ExportHandler, ImportHandler, TaskHandler, TaskTracker, WorkerRunner};

/// Cloudfiles archive import/export worker
#[derive(Debug, Parser)]
#[command(name = "cloudfiles-worker", version, about, long_about = None)]
struct Cli {
    /// Directory holding default.toml and the environment overlays
    #[arg(long, default_value = "config")]
    config_dir: String,

    /// Environment overlay to load (falls back to CLOUDFILES_ENV)
    #[arg(long)]
    env: Option<String>,

    /// Which queues to consume
    #[arg(long, value_enum, default_value = "all")]
    queue: QueueSelection,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Register a task and publish its message
    Enqueue(EnqueueArgs),
}

#[derive(Debug, clap::Args)]
struct EnqueueArgs {
    /// Pipeline that should run the task
    #[arg(long, value_enum)]
    kind: KindArg,
    /// Task id (a v4 UUID is generated when omitted)
    #[arg(long)]
    task_id: Option<String>,
    /// Owning user
    #[arg(long)]
    user_id: String,
    /// Destination folder for imports, source folder for exports
    #[arg(long)]
    folder_id: Option<Uuid>,
    /// Archive file name
    #[arg(long)]
    zip_file_name: String,
    /// Object key of an uploaded archive (imports only)
    #[arg(long)]
    object_path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QueueSelection {
    Import,
    Export,
    All,
}

impl QueueSelection {
    fn kinds(self) -> &'static [TaskKind] {
        match self {
            Self::Import => &[TaskKind::Import],
            Self::Export => &[TaskKind::Export],
            Self::All => &[TaskKind::Import, TaskKind::Export],
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum KindArg {
    Import,
    Export,
}

impl From<KindArg> for TaskKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Import => TaskKind::Import,
            KindArg::Export => TaskKind::Export,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let env = cli
        .env
        .clone()
        .unwrap_or_else(|| std::env::var("CLOUDFILES_ENV").unwrap_or_else(|_| "development".to_string()));

    let config = match AppConfig::load_from(&cli.config_dir, &env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(config_dir = %cli.config_dir, env = %env, "Configuration loaded");

    let result = match &cli.command {
        Some(Commands::Enqueue(args)) => enqueue(&config, args).await,
        None => run(config, cli.queue).await,
    };

    if let Err(e) = result {
        tracing::error!("Worker error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Run the selected workers until a shutdown signal arrives.
async fn run(config: AppConfig, selection: QueueSelection) -> Result<(), AppError> {
    tracing::info!("Starting cloudfiles-worker v{}", env!("CARGO_PKG_VERSION"));

    let db = DatabasePool::connect(&config.database).await?;
    if !db.health_check().await? {
        return Err(AppError::database("Catalog database failed its health check"));
    }
    let catalog: Arc<dyn Catalog> = Arc::new(PgCatalog::new(db.pool().clone()));

    let store: Arc<dyn ObjectStore> = build_object_store(&config.storage).await?;
    if !store.health_check().await? {
        return Err(AppError::storage(format!(
            "Object store '{}' failed its health check",
            store.provider_type()
        )));
    }

    let cache: Arc<dyn CacheProvider> = Arc::new(CacheManager::new(&config.cache).await?);
    let queue: Arc<dyn TaskQueue> = build_task_queue(&config.queue, &config.cache).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();

    for kind in selection.kinds() {
        let queue_name = queue_for(&config, *kind);
        let handler: Arc<dyn TaskHandler> = match kind {
            TaskKind::Import => Arc::new(ImportHandler::new(
                Arc::clone(&catalog),
                Arc::clone(&store),
                Arc::clone(&cache),
                &config.worker.import,
            )),
            TaskKind::Export => Arc::new(ExportHandler::new(Arc::clone(&catalog), Arc::clone(&store))),
        };

        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            queue_name,
            handler,
            TaskTracker::new(Arc::clone(&catalog)),
            config.worker.clone(),
        );
        let rx = shutdown_rx.clone();
        handles.push(tokio::spawn(async move { runner.run(rx).await }));
    }

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping workers");
    let _ = shutdown_tx.send(true);

    for handle in handles {
        if let Err(e) = handle.await {
            tracing::error!("Worker task panicked: {e}");
        }
    }

    db.close().await;
    tracing::info!("All workers stopped");
    Ok(())
}

/// Register a task in the catalog and push its message to the matching queue.
async fn enqueue(config: &AppConfig, args: &EnqueueArgs) -> Result<(), AppError> {
    let kind = TaskKind::from(args.kind);
    let task = NewTask {
        task_id: args
            .task_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string()),
        user_id: args.user_id.clone(),
        kind,
        folder_id: args.folder_id,
        zip_file_name: args.zip_file_name.clone(),
        object_path: args.object_path.clone(),
    };

    if kind == TaskKind::Import && task.object_path.is_none() {
        return Err(AppError::validation("Imports need --object-path"));
    }

    let db = DatabasePool::connect(&config.database).await?;
    let catalog = PgCatalog::new(db.pool().clone());
    catalog.register_task(&task).await?;
    db.close().await;

    let queue = build_task_queue(&config.queue, &config.cache).await?;
    let queue_name = queue_for(config, kind);
    let payload = task
        .message()
        .to_json()
        .map_err(|e| AppError::internal(format!("Failed to encode task message: {e}")))?;
    queue.enqueue(queue_name, &payload).await?;

    tracing::info!(task_id = %task.task_id, queue = %queue_name, "Task enqueued");
    println!("{}", task.task_id);
    Ok(())
}

fn queue_for(config: &AppConfig, kind: TaskKind) -> &str {
    match kind {
        TaskKind::Import => &config.queue.import_queue,
        TaskKind::Export => &config.queue.export_queue,
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
