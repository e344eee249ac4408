//! Builds the configured cache provider and work queue.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::info;

use cloudfiles_core::config::cache::CacheConfig;
use cloudfiles_core::config::queue::QueueConfig;
use cloudfiles_core::error::AppError;
use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::cache::CacheProvider;
use cloudfiles_core::traits::queue::TaskQueue;

/// Cache manager that wraps the configured cache provider.
#[derive(Debug, Clone)]
pub struct CacheManager {
    inner: Arc<dyn CacheProvider>,
}

impl CacheManager {
    /// Create a new cache manager from configuration.
    pub async fn new(config: &CacheConfig) -> AppResult<Self> {
        let inner: Arc<dyn CacheProvider> = match config.provider.as_str() {
            #[cfg(feature = "redis-backend")]
            "redis" => {
                info!("Initializing Redis cache provider");
                let client = crate::redis::RedisClient::connect(&config.redis).await?;
                Arc::new(crate::redis::RedisCacheProvider::new(client))
            }
            #[cfg(feature = "memory")]
            "memory" => {
                info!("Initializing in-memory cache provider");
                Arc::new(crate::memory::MemoryCacheProvider::new(&config.memory))
            }
            other => {
                return Err(AppError::configuration(format!(
                    "Unknown cache provider: '{other}'. Supported: memory, redis"
                )));
            }
        };

        Ok(Self { inner })
    }
}

#[async_trait]
impl CacheProvider for CacheManager {
    async fn delete(&self, key: &str) -> AppResult<()> {
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.inner.exists(key).await
    }
}

/// Create the work queue named by `queue.backend`.
///
/// The Redis backend connects with the cache's Redis URL.
pub async fn build_task_queue(
    queue: &QueueConfig,
    cache: &CacheConfig,
) -> AppResult<Arc<dyn TaskQueue>> {
    let built: Arc<dyn TaskQueue> = match queue.backend.as_str() {
        #[cfg(feature = "redis-backend")]
        "redis" => {
            let client = crate::redis::RedisClient::connect(&cache.redis).await?;
            Arc::new(crate::redis::RedisTaskQueue::new(
                client,
                Duration::from_millis(queue.block_timeout_ms),
            ))
        }
        #[cfg(feature = "memory")]
        "memory" => Arc::new(crate::memory::MemoryTaskQueue::new()),
        other => {
            return Err(AppError::configuration(format!(
                "Unknown queue backend: '{other}'. Supported: memory, redis"
            )));
        }
    };

    info!(backend = built.backend(), "Work queue ready");
    Ok(built)
}
