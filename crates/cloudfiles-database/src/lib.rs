//! # cloudfiles-database
//!
//! PostgreSQL connection management, repositories for the task register,
//! catalog and quota tables, and the [`Catalog`] seam the workers depend on.
//! [`MemoryCatalog`] is an in-process implementation used by tests.

pub mod catalog;
pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;

pub use catalog::{Catalog, CatalogTransaction};
pub use connection::DatabasePool;
pub use memory::MemoryCatalog;
pub use postgres::PgCatalog;
