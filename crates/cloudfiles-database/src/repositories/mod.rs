//! Concrete repositories over the catalog tables.
//!
//! Read methods run on the pool. Methods that belong to the import
//! transaction take a `&mut PgConnection` so they can be executed on a
//! transaction.

pub mod content;
pub mod entry;
pub mod quota;
pub mod task;

pub use content::ContentRepository;
pub use entry::EntryRepository;
pub use quota::QuotaRepository;
pub use task::TaskRepository;
