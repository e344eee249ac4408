//! In-memory cache implementation using the moka crate.

use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;

use cloudfiles_core::config::cache::MemoryCacheConfig;
use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::cache::CacheProvider;

/// In-memory cache provider using moka.
///
/// Entries expire after the cache-wide `time_to_live_seconds`.
#[derive(Debug, Clone)]
pub struct MemoryCacheProvider {
    cache: Cache<String, String>,
}

impl MemoryCacheProvider {
    /// Create a new in-memory cache from configuration.
    pub fn new(config: &MemoryCacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_capacity)
            .time_to_live(Duration::from_secs(config.time_to_live_seconds))
            .build();
        Self { cache }
    }

    /// Store a value directly, standing in for the web application that
    /// fills these keys.
    pub async fn insert(&self, key: &str, value: &str) {
        self.cache.insert(key.to_string(), value.to_string()).await;
    }
}

impl Default for MemoryCacheProvider {
    fn default() -> Self {
        Self::new(&MemoryCacheConfig::default())
    }
}

#[async_trait]
impl CacheProvider for MemoryCacheProvider {
    async fn delete(&self, key: &str) -> AppResult<()> {
        self.cache.invalidate(key).await;
        Ok(())
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        Ok(self.cache.contains_key(key))
    }
}
