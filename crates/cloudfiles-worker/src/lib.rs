//! Archive import and export workers for Cloudfiles.
//!
//! This crate provides:
//! - A worker runner that blocks on a work queue and runs one task at a time
//! - Import and export task handlers built from the archive and tree stages
//! - A tracker that records task status on the task register
//! - Per-task staging directories that are removed on every exit path

pub mod archive;
pub mod error;
pub mod executor;
pub mod jobs;
pub mod runner;
pub mod staging;
pub mod tracker;
pub mod tree;

pub use error::PipelineError;
pub use executor::{TaskContext, TaskHandler, TaskOutcome};
pub use jobs::{ExportHandler, ImportHandler};
pub use runner::WorkerRunner;
pub use staging::StagingArea;
pub use tracker::TaskTracker;
