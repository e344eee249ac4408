//! Moving objects between the object store and local files.

use std::path::Path;

use futures::stream::StreamExt;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use cloudfiles_core::error::{AppError, ErrorKind};
use cloudfiles_core::result::AppResult;
use cloudfiles_core::traits::storage::ObjectStore;

/// Stream the object at `key` into a new file at `dest`, chunk by chunk.
///
/// Returns the number of bytes written. The parent directory must exist.
pub async fn download_to_file(store: &dyn ObjectStore, key: &str, dest: &Path) -> AppResult<u64> {
    let mut stream = store.get(key).await?;
    let mut file = fs::File::create(dest).await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to create {}", dest.display()),
            e,
        )
    })?;

    let mut total_bytes = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| {
            AppError::with_source(ErrorKind::Storage, format!("Failed to download {key}"), e)
        })?;
        total_bytes += chunk.len() as u64;
        file.write_all(&chunk).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write {}", dest.display()),
                e,
            )
        })?;
    }
    file.flush().await.map_err(|e| {
        AppError::with_source(
            ErrorKind::Storage,
            format!("Failed to flush {}", dest.display()),
            e,
        )
    })?;

    debug!(key, bytes = total_bytes, dest = %dest.display(), "Downloaded object");
    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::local::LocalObjectStore;

    #[tokio::test]
    async fn test_download_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path().join("objects")).await.unwrap();
        let source = dir.path().join("src.bin");
        let payload: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &payload).await.unwrap();
        store.put_file("u-1/src.bin", &source).await.unwrap();

        let dest = dir.path().join("out.bin");
        let written = download_to_file(&store, "u-1/src.bin", &dest).await.unwrap();
        assert_eq!(written, payload.len() as u64);
        assert_eq!(fs::read(&dest).await.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_download_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalObjectStore::new(dir.path()).await.unwrap();
        let err = download_to_file(&store, "missing.bin", &dir.path().join("x"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!dir.path().join("x").exists());
    }
}
