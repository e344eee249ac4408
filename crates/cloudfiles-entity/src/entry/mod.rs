//! Catalog entries (files and folders) and online-editable content.

pub mod content;
pub mod model;

pub use content::ContentBlob;
pub use model::{CatalogEntry, NewEntry, file_suffix};
