//! # cloudfiles-core
//!
//! Core crate for the Cloudfiles archive workers. Contains the seam traits
//! (object store, work queue, cache), configuration schemas, and the unified
//! error system.
//!
//! This crate has **no** internal dependencies on other Cloudfiles crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;

pub use error::AppError;
pub use result::AppResult;
