//! Pre-extraction size checks.
//!
//! Only the central directory is read; payload bytes are never
//! decompressed. Declared sizes are summed in `u128` so that multi-gigabyte
//! archives cannot overflow the running total.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use zip::ZipArchive;

use crate::error::PipelineError;

/// What the validator learned about an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveManifest {
    /// File entries.
    pub files: u64,
    /// Directory entries.
    pub directories: u64,
    /// Sum of declared uncompressed sizes.
    pub total_bytes: u128,
}

/// Checks declared entry sizes against the per-file cap and quota headroom.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveValidator {
    max_entry_bytes: u64,
}

impl ArchiveValidator {
    /// Create a validator with the given per-entry cap.
    pub fn new(max_entry_bytes: u64) -> Self {
        Self { max_entry_bytes }
    }

    /// Validate the archive at `path` against `headroom` bytes of quota.
    pub async fn validate(
        &self,
        path: &Path,
        headroom: u128,
        cancel: &CancellationToken,
    ) -> Result<ArchiveManifest, PipelineError> {
        if headroom == 0 {
            return Err(PipelineError::Validation(
                "User storage space is exhausted".to_string(),
            ));
        }

        let path: PathBuf = path.to_path_buf();
        let cancel = cancel.clone();
        let max_entry_bytes = self.max_entry_bytes;
        tokio::task::spawn_blocking(move || scan(&path, max_entry_bytes, headroom, &cancel))
            .await
            .map_err(|e| PipelineError::Extraction(format!("Archive scan aborted: {e}")))?
    }
}

fn scan(
    path: &Path,
    max_entry_bytes: u64,
    headroom: u128,
    cancel: &CancellationToken,
) -> Result<ArchiveManifest, PipelineError> {
    let file = File::open(path)
        .map_err(|e| PipelineError::Extraction(format!("Failed to open {}: {e}", path.display())))?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;

    let mut manifest = ArchiveManifest {
        files: 0,
        directories: 0,
        total_bytes: 0,
    };

    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let entry = archive.by_index_raw(index)?;
        let size = entry.size();

        if size > max_entry_bytes {
            return Err(PipelineError::Validation(format!(
                "Archive entry '{}' is {size} bytes uncompressed, exceeding the per-file limit of {max_entry_bytes} bytes",
                entry.name()
            )));
        }

        manifest.total_bytes += u128::from(size);
        if manifest.total_bytes > headroom {
            return Err(PipelineError::Validation(format!(
                "Archive uncompressed size exceeds the remaining storage quota of {headroom} bytes"
            )));
        }

        if entry.is_dir() {
            manifest.directories += 1;
        } else {
            manifest.files += 1;
        }
    }

    Ok(manifest)
}
