//! # cloudfiles-entity
//!
//! Domain entity models for the Cloudfiles archive workers. Every struct in
//! this crate represents a database table row or a domain value object. All
//! entities derive `Debug`, `Clone`, `Serialize`, `Deserialize`, and database
//! entities additionally derive `sqlx::FromRow`.

pub mod entry;
pub mod quota;
pub mod task;
