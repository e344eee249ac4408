//! Redis list work queue.
//!
//! The worker pops from the head of the list with `BLPOP`. [`enqueue`]
//! appends with `RPUSH` so messages it publishes are consumed oldest first.
//!
//! [`enqueue`]: RedisTaskQueue::enqueue

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use tracing::debug;

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::queue::TaskQueue;

use super::client::RedisClient;

/// Work queue stored in Redis lists.
///
/// Queue names are used verbatim; the cache key prefix does not apply.
#[derive(Debug, Clone)]
pub struct RedisTaskQueue {
    client: RedisClient,
    block_timeout: Duration,
}

impl RedisTaskQueue {
    /// Create a queue over an existing client.
    pub fn new(client: RedisClient, block_timeout: Duration) -> Self {
        Self {
            client,
            block_timeout,
        }
    }

    fn map_err(e: redis::RedisError) -> AppError {
        AppError::with_source(ErrorKind::Queue, format!("Redis queue error: {e}"), e)
    }
}

#[async_trait]
impl TaskQueue for RedisTaskQueue {
    fn backend(&self) -> &str {
        "redis"
    }

    async fn try_dequeue(&self, queue: &str) -> AppResult<Option<String>> {
        let mut conn = self.client.conn();
        let popped: Option<(String, String)> = redis::cmd("BLPOP")
            .arg(queue)
            .arg(self.block_timeout.as_secs_f64())
            .query_async(&mut conn)
            .await
            .map_err(Self::map_err)?;

        Ok(popped.map(|(_, payload)| {
            debug!(queue, bytes = payload.len(), "Dequeued message");
            payload
        }))
    }

    async fn enqueue(&self, queue: &str, payload: &str) -> AppResult<()> {
        let mut conn = self.client.conn();
        let _: () = conn.rpush(queue, payload).await.map_err(Self::map_err)?;
        debug!(queue, "Enqueued message");
        Ok(())
    }
}
