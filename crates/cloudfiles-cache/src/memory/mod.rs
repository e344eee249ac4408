//! In-process queue and cache.

pub mod queue;
pub mod store;

pub use queue::MemoryTaskQueue;
pub use store::MemoryCacheProvider;
