//! Shared fixtures for the pipeline tests.
//!
//! Everything runs in-process: `MemoryCatalog`, a `LocalObjectStore` in a
//! temp dir, and the in-memory cache.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::watch;
use uuid::Uuid;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use cloudfiles_cache::memory::{MemoryCacheProvider, MemoryTaskQueue};
use cloudfiles_core::config::WorkerConfig;
use cloudfiles_core::config::cache::MemoryCacheConfig;
use cloudfiles_core::traits::queue::TaskQueue;
use cloudfiles_core::traits::storage::ObjectStore;
use cloudfiles_database::{Catalog, MemoryCatalog};
use cloudfiles_entity::entry::CatalogEntry;
use cloudfiles_entity::task::{NewTask, Task, TaskKind};
use cloudfiles_storage::LocalObjectStore;
use cloudfiles_storage::transfer::download_to_file;
use cloudfiles_worker::{ExportHandler, ImportHandler, TaskHandler, TaskTracker, WorkerRunner};

pub const MIB: usize = 1024 * 1024;

/// An in-memory deployment of both pipelines.
pub struct Harness {
    pub dir: tempfile::TempDir,
    pub catalog: MemoryCatalog,
    pub store: Arc<LocalObjectStore>,
    pub cache: Arc<MemoryCacheProvider>,
    pub config: WorkerConfig,
}

impl Harness {
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(LocalObjectStore::new(dir.path().join("objects")).await.unwrap());
        let config = WorkerConfig {
            staging_root: dir.path().join("staging").to_string_lossy().to_string(),
            ..WorkerConfig::default()
        };
        Self {
            dir,
            catalog: MemoryCatalog::new(),
            store,
            cache: Arc::new(MemoryCacheProvider::new(&MemoryCacheConfig::default())),
            config,
        }
    }

    pub fn staging_dir(&self, kind: TaskKind, task_id: &str) -> PathBuf {
        Path::new(&self.config.staging_root)
            .join(kind.staging_dir())
            .join(task_id)
    }

    pub fn runner(&self, kind: TaskKind) -> WorkerRunner {
        self.runner_on(kind, Arc::new(MemoryTaskQueue::new()))
    }

    pub fn runner_on(&self, kind: TaskKind, queue: Arc<dyn TaskQueue>) -> WorkerRunner {
        let catalog: Arc<dyn Catalog> = Arc::new(self.catalog.clone());
        let handler: Arc<dyn TaskHandler> = match kind {
            TaskKind::Import => Arc::new(ImportHandler::new(
                Arc::clone(&catalog),
                self.store.clone(),
                self.cache.clone(),
                &self.config.import,
            )),
            TaskKind::Export => Arc::new(ExportHandler::new(Arc::clone(&catalog), self.store.clone())),
        };
        WorkerRunner::new(
            queue,
            kind.task_type(),
            handler,
            TaskTracker::new(catalog),
            self.config.clone(),
        )
    }

    /// Upload an archive and register an import task for it. Returns the
    /// queue payload.
    pub async fn stage_import(
        &self,
        task_id: &str,
        user_id: &str,
        folder_id: Option<Uuid>,
        zip_file_name: &str,
        archive: &[u8],
    ) -> String {
        let key = format!("uploads/{user_id}/{task_id}/{zip_file_name}");
        let local = self.dir.path().join(format!("{task_id}-{zip_file_name}"));
        std::fs::write(&local, archive).unwrap();
        self.store.put_file(&key, &local).await.unwrap();
        self.register(task_id, user_id, TaskKind::Import, folder_id, zip_file_name, Some(key))
            .await
    }

    /// Register an export task. Returns the queue payload.
    pub async fn stage_export(
        &self,
        task_id: &str,
        user_id: &str,
        folder_id: Option<Uuid>,
        zip_file_name: &str,
    ) -> String {
        self.register(task_id, user_id, TaskKind::Export, folder_id, zip_file_name, None)
            .await
    }

    /// Register an import of an archive that is already in the store.
    pub async fn stage_import_from_key(
        &self,
        task_id: &str,
        user_id: &str,
        folder_id: Option<Uuid>,
        zip_file_name: &str,
        key: &str,
    ) -> String {
        self.register(
            task_id,
            user_id,
            TaskKind::Import,
            folder_id,
            zip_file_name,
            Some(key.to_string()),
        )
        .await
    }

    async fn register(
        &self,
        task_id: &str,
        user_id: &str,
        kind: TaskKind,
        folder_id: Option<Uuid>,
        zip_file_name: &str,
        object_path: Option<String>,
    ) -> String {
        let task = NewTask {
            task_id: task_id.to_string(),
            user_id: user_id.to_string(),
            kind,
            folder_id,
            zip_file_name: zip_file_name.to_string(),
            object_path,
        };
        self.catalog.register_task(&task).await.unwrap();
        task.message().to_json().unwrap()
    }

    /// Run one payload through a fresh runner of the given kind.
    pub async fn run(&self, kind: TaskKind, payload: &str) -> Task {
        let (_tx, mut rx) = watch::channel(false);
        self.runner(kind).process(payload, &mut rx).await;
        let message = cloudfiles_entity::task::TaskMessage::parse(payload).unwrap();
        self.catalog.find_task(&message.task_id).await.unwrap().unwrap()
    }

    pub async fn files_of(&self, user_id: &str) -> Vec<CatalogEntry> {
        self.catalog
            .entries_for(user_id)
            .await
            .into_iter()
            .filter(|e| !e.is_folder)
            .collect()
    }

    pub async fn used_bytes(&self, user_id: &str) -> u128 {
        self.catalog
            .find_quota(user_id)
            .await
            .unwrap()
            .unwrap()
            .used_bytes()
            .unwrap()
    }

    /// Download an object and return its bytes.
    pub async fn object_bytes(&self, key: &str) -> Vec<u8> {
        let dest = self.dir.path().join(format!("download-{}", Uuid::new_v4()));
        download_to_file(self.store.as_ref(), key, &dest).await.unwrap();
        std::fs::read(dest).unwrap()
    }
}

/// Build a zip in memory. Names ending in `/` become directory entries.
pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, data) in entries {
        if name.ends_with('/') {
            zip.add_directory(*name, options).unwrap();
        } else {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data).unwrap();
        }
    }
    zip.finish().unwrap().into_inner()
}

/// `(name, bytes)` of every file entry in an archive, sorted by name.
pub fn zip_contents(archive: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(Cursor::new(archive)).unwrap();
    let mut files = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).unwrap();
        if entry.is_dir() {
            continue;
        }
        let mut data = Vec::new();
        entry.read_to_end(&mut data).unwrap();
        files.push((entry.name().to_string(), data));
    }
    files.sort();
    files
}

/// Deterministic binary payload.
pub fn payload_bytes(len: usize, seed: u8) -> Vec<u8> {
    (0..len).map(|i| (i as u8).wrapping_mul(31).wrapping_add(seed)).collect()
}
