//! Core traits defined in `cloudfiles-core` and implemented by other crates.

pub mod cache;
pub mod queue;
pub mod storage;

pub use cache::CacheProvider;
pub use queue::TaskQueue;
pub use storage::ObjectStore;
