//! Built-in task handlers.

pub mod export;
pub mod finalizer;
pub mod import;

pub use export::ExportHandler;
pub use finalizer::UploadFinalizer;
pub use import::ImportHandler;
