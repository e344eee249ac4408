//! Moving file trees between local staging directories and the catalog.

pub mod exporter;
pub mod importer;

pub use exporter::{ExportSummary, FolderExporter};
pub use importer::{EditablePolicy, FolderImporter, ImportSummary};
