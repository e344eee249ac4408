//! In-process work queue.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};

use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::queue::TaskQueue;

/// Default wait of one `try_dequeue` call on an empty queue.
const DEFAULT_BLOCK_TIMEOUT: Duration = Duration::from_millis(50);

#[derive(Debug, Default)]
struct Slot {
    items: Mutex<VecDeque<String>>,
    ready: Notify,
}

/// FIFO queues held in memory, keyed by queue name.
///
/// Clones share the same queues, so a test can hand one clone to a worker
/// and enqueue through another.
#[derive(Debug, Clone)]
pub struct MemoryTaskQueue {
    slots: Arc<DashMap<String, Arc<Slot>>>,
    block_timeout: Duration,
}

impl Default for MemoryTaskQueue {
    fn default() -> Self {
        Self::with_block_timeout(DEFAULT_BLOCK_TIMEOUT)
    }
}

impl MemoryTaskQueue {
    /// Create an empty queue set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty queue set whose pops wait at most `block_timeout`.
    pub fn with_block_timeout(block_timeout: Duration) -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
            block_timeout,
        }
    }

    /// Number of messages waiting on `queue`.
    pub async fn pending(&self, queue: &str) -> usize {
        self.slot(queue).items.lock().await.len()
    }

    fn slot(&self, queue: &str) -> Arc<Slot> {
        Arc::clone(self.slots.entry(queue.to_string()).or_default().value())
    }
}

#[async_trait]
impl TaskQueue for MemoryTaskQueue {
    fn backend(&self) -> &str {
        "memory"
    }

    async fn try_dequeue(&self, queue: &str) -> AppResult<Option<String>> {
        let slot = self.slot(queue);
        if let Some(payload) = slot.items.lock().await.pop_front() {
            return Ok(Some(payload));
        }
        // notify_one stores a permit, so a push between the check and this
        // wait is not lost.
        if tokio::time::timeout(self.block_timeout, slot.ready.notified())
            .await
            .is_err()
        {
            return Ok(None);
        }
        Ok(slot.items.lock().await.pop_front())
    }

    async fn enqueue(&self, queue: &str, payload: &str) -> AppResult<()> {
        let slot = self.slot(queue);
        slot.items.lock().await.push_back(payload.to_string());
        slot.ready.notify_one();
        Ok(())
    }
}
