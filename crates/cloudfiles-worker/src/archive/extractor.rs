//! Streaming zip extraction.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use zip::ZipArchive;

use super::{BUFFER_SIZE, copy_chunks};
use crate::error::PipelineError;

/// Counts produced by an extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Files written.
    pub files: u64,
    /// Directory entries created.
    pub directories: u64,
    /// Decompressed bytes written.
    pub bytes: u64,
}

/// Extract every entry of `archive` under `dest`.
///
/// Entries are written in archive order. An entry whose name would land
/// outside `dest` fails the whole extraction.
pub async fn extract_archive(
    archive: &Path,
    dest: &Path,
    cancel: &CancellationToken,
) -> Result<ExtractionSummary, PipelineError> {
    let archive = archive.to_path_buf();
    let dest = dest.to_path_buf();
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || extract_blocking(&archive, &dest, &cancel))
        .await
        .map_err(|e| PipelineError::Extraction(format!("Extraction aborted: {e}")))?
}

fn extract_blocking(
    archive_path: &Path,
    dest: &Path,
    cancel: &CancellationToken,
) -> Result<ExtractionSummary, PipelineError> {
    let file = File::open(archive_path).map_err(|e| io_error("open", archive_path, e))?;
    let mut archive = ZipArchive::new(BufReader::new(file))?;
    fs::create_dir_all(dest).map_err(|e| io_error("create", dest, e))?;

    let mut summary = ExtractionSummary::default();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    for index in 0..archive.len() {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let mut entry = archive.by_index(index)?;
        let relative: PathBuf = match entry.enclosed_name() {
            Some(path) => path.to_path_buf(),
            None => {
                return Err(PipelineError::Extraction(format!(
                    "Entry '{}' escapes the extraction directory",
                    entry.name()
                )));
            }
        };
        let out_path = dest.join(relative);

        if entry.is_dir() {
            fs::create_dir_all(&out_path).map_err(|e| io_error("create", &out_path, e))?;
            summary.directories += 1;
            continue;
        }

        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error("create", parent, e))?;
        }
        let mut out = File::create(&out_path).map_err(|e| io_error("create", &out_path, e))?;
        match copy_chunks(&mut entry, &mut out, &mut buffer, cancel)
            .map_err(|e| io_error("extract", &out_path, e))?
        {
            Some(n) => summary.bytes += n,
            None => return Err(PipelineError::Cancelled),
        }
        out.flush().map_err(|e| io_error("write", &out_path, e))?;
        summary.files += 1;
    }

    Ok(summary)
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> PipelineError {
    PipelineError::Extraction(format!("Failed to {action} {}: {err}", path.display()))
}
