//! Per-user storage quota.

pub mod model;

pub use model::StorageQuota;
