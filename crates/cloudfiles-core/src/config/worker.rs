//! Archive worker configuration.

use serde::{Deserialize, Serialize};

/// Archive worker configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Root of the per-task staging directories.
    #[serde(default = "default_staging_root")]
    pub staging_root: String,
    /// Wall-clock limit for a single task, in seconds.
    #[serde(default = "default_task_timeout")]
    pub task_timeout_seconds: u64,
    /// Back-off after a failed dequeue, in seconds.
    #[serde(default = "default_dequeue_retry")]
    pub dequeue_retry_seconds: u64,
    /// Import pipeline limits.
    #[serde(default)]
    pub import: ImportConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            staging_root: default_staging_root(),
            task_timeout_seconds: default_task_timeout(),
            dequeue_retry_seconds: default_dequeue_retry(),
            import: ImportConfig::default(),
        }
    }
}

/// Limits applied while importing an archive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Largest declared uncompressed size accepted for one archive entry.
    #[serde(default = "default_max_entry_bytes")]
    pub max_entry_bytes: u64,
    /// File suffixes (without the dot, case-insensitive) imported as
    /// online-editable text.
    #[serde(default = "default_editable_suffixes")]
    pub editable_suffixes: Vec<String>,
    /// Files larger than this are always imported as objects.
    #[serde(default = "default_max_editable_bytes")]
    pub max_editable_bytes: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            max_entry_bytes: default_max_entry_bytes(),
            editable_suffixes: default_editable_suffixes(),
            max_editable_bytes: default_max_editable_bytes(),
        }
    }
}

fn default_staging_root() -> String {
    "/var/zip_temp".to_string()
}

fn default_task_timeout() -> u64 {
    3600
}

fn default_dequeue_retry() -> u64 {
    5
}

fn default_max_entry_bytes() -> u64 {
    524_288_000 // 500 MiB
}

fn default_editable_suffixes() -> Vec<String> {
    vec!["md".to_string(), "txt".to_string()]
}

fn default_max_editable_bytes() -> u64 {
    1_048_576 // 1 MiB
}
