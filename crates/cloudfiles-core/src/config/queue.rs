//! Work queue configuration.

use serde::{Deserialize, Serialize};

/// Names and backend of the archive work queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Queue backend: `"redis"` or `"memory"`.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// List consumed by the import worker.
    #[serde(default = "default_import_queue")]
    pub import_queue: String,
    /// List consumed by the export worker.
    #[serde(default = "default_export_queue")]
    pub export_queue: String,
    /// Server-side wait of each BLPOP round trip, in milliseconds. Workers
    /// check for shutdown between round trips, so this also bounds how long
    /// an idle worker takes to stop.
    #[serde(default = "default_block_timeout_ms")]
    pub block_timeout_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            import_queue: default_import_queue(),
            export_queue: default_export_queue(),
            block_timeout_ms: default_block_timeout_ms(),
        }
    }
}

fn default_backend() -> String {
    "redis".to_string()
}

fn default_import_queue() -> String {
    "zip_import".to_string()
}

fn default_export_queue() -> String {
    "zip_export".to_string()
}

fn default_block_timeout_ms() -> u64 {
    400
}
