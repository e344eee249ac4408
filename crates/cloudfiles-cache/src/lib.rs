//! # cloudfiles-cache
//!
//! Redis-backed work queues and cache for the Cloudfiles workers, plus
//! in-process equivalents for tests and single-node runs:
//!
//! - **redis**: BLPOP/RPUSH work queues and a key/value cache using the
//!   [redis](https://crates.io/crates/redis) crate
//! - **memory**: an in-process queue and a [moka](https://crates.io/crates/moka) cache
//!
//! The backends are selected at runtime based on configuration.

pub mod keys;
#[cfg(feature = "memory")]
pub mod memory;
pub mod provider;
#[cfg(feature = "redis-backend")]
pub mod redis;

pub use provider::{CacheManager, build_task_queue};
