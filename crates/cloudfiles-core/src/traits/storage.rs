//! Object store trait for pluggable blob storage backends.

use std::path::Path;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;

use crate::result::AppResult;

/// A byte stream type used for reading object contents.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Trait for object store backends.
///
/// Object keys are `/`-separated paths such as
/// `alice/2024/05/7/1715070000000-report.pdf`. The pipeline treats the
/// store as append-only: it uploads and downloads, and never lists.
#[async_trait]
pub trait ObjectStore: Send + Sync + std::fmt::Debug + 'static {
    /// Return the provider type name (e.g., "local", "s3").
    fn provider_type(&self) -> &str;

    /// Check whether the provider is healthy and reachable.
    async fn health_check(&self) -> AppResult<bool>;

    /// Open an object for streamed download.
    async fn get(&self, key: &str) -> AppResult<ByteStream>;

    /// Upload a byte stream as an object. Returns the number of bytes written.
    async fn put_stream(&self, key: &str, stream: ByteStream) -> AppResult<u64>;

    /// Upload a local file as an object, in parts when the backend supports
    /// it. Returns the number of bytes written.
    async fn put_file(&self, key: &str, source: &Path) -> AppResult<u64>;

    /// Check whether an object exists.
    async fn exists(&self, key: &str) -> AppResult<bool>;
}
