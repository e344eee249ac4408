//! # cloudfiles-storage
//!
//! Object store implementations for the Cloudfiles workers: the local
//! filesystem and, behind the `s3` feature, S3-compatible services.

pub mod factory;
pub mod providers;
pub mod transfer;

pub use factory::build_object_store;
pub use providers::local::LocalObjectStore;
#[cfg(feature = "s3")]
pub use providers::s3::S3ObjectStore;
