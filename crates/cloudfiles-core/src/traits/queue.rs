//! Work queue trait.
//!
//! Messages travel as raw JSON strings so that a consumer can tell a
//! transport failure (an `Err` from [`TaskQueue::try_dequeue`]) apart from a
//! malformed payload (a string that does not parse).

use async_trait::async_trait;

use crate::result::AppResult;

/// A named FIFO of task descriptors.
#[async_trait]
pub trait TaskQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend name (e.g., "redis", "memory").
    fn backend(&self) -> &str;

    /// Pop one message from `queue`, waiting at most the backend's block
    /// timeout. Returns `None` when the wait elapsed with the queue empty.
    ///
    /// Callers must let the returned future complete: a pop that is dropped
    /// mid-flight may already have removed its message.
    async fn try_dequeue(&self, queue: &str) -> AppResult<Option<String>>;

    /// Append a message to `queue`.
    async fn enqueue(&self, queue: &str, payload: &str) -> AppResult<()>;
}
