//! Redis-backed queue and cache.

pub mod client;
pub mod operations;
pub mod queue;

pub use client::RedisClient;
pub use operations::RedisCacheProvider;
pub use queue::RedisTaskQueue;
