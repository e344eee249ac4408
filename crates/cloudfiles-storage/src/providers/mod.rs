//! Object store provider implementations.

pub mod local;
#[cfg(feature = "s3")]
pub mod s3;
