//! Directory tree to zip archive.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{BUFFER_SIZE, copy_chunks};
use crate::error::PipelineError;

/// Write the contents of `source` (not `source` itself) into a new archive
/// at `output`, at maximum deflate compression.
///
/// Entries are added in sorted order and empty directories are kept.
/// Returns the archive's size once it has been flushed to disk.
pub async fn build_archive(
    source: &Path,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<u64, PipelineError> {
    let source = source.to_path_buf();
    let output = output.to_path_buf();
    let cancel = cancel.clone();
    tokio::task::spawn_blocking(move || write_archive(&source, &output, &cancel))
        .await
        .map_err(|e| PipelineError::ExportAssembly(format!("Archive build aborted: {e}")))?
}

struct TreeEntry {
    name: String,
    path: PathBuf,
    is_dir: bool,
}

fn write_archive(
    source: &Path,
    output: &Path,
    cancel: &CancellationToken,
) -> Result<u64, PipelineError> {
    let entries = collect_entries(source)?;

    let file = File::create(output).map_err(|e| io_error("create", output, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));
    let mut buffer = vec![0u8; BUFFER_SIZE];

    for entry in entries {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        if entry.is_dir {
            zip.add_directory(entry.name.as_str(), options)
                .map_err(|e| zip_error(&entry.name, e))?;
            continue;
        }

        let mut input = File::open(&entry.path).map_err(|e| io_error("open", &entry.path, e))?;
        let len = input
            .metadata()
            .map_err(|e| io_error("stat", &entry.path, e))?
            .len();
        zip.start_file(
            entry.name.as_str(),
            options.large_file(len >= u64::from(u32::MAX)),
        )
        .map_err(|e| zip_error(&entry.name, e))?;
        if copy_chunks(&mut input, &mut zip, &mut buffer, cancel)
            .map_err(|e| io_error("compress", &entry.path, e))?
            .is_none()
        {
            return Err(PipelineError::Cancelled);
        }
    }

    let mut writer = zip
        .finish()
        .map_err(|e| PipelineError::ExportAssembly(format!("Failed to finish archive: {e}")))?;
    writer.flush().map_err(|e| io_error("write", output, e))?;
    let file = writer
        .into_inner()
        .map_err(|e| io_error("write", output, e.into_error()))?;
    file.sync_all().map_err(|e| io_error("sync", output, e))?;

    let size = fs::metadata(output)
        .map_err(|e| io_error("stat", output, e))?
        .len();
    Ok(size)
}

/// Every file and directory under `root`, sorted by archive name.
fn collect_entries(root: &Path) -> Result<Vec<TreeEntry>, PipelineError> {
    let mut entries = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let listing = fs::read_dir(&dir).map_err(|e| io_error("read", &dir, e))?;
        for item in listing {
            let item = item.map_err(|e| io_error("read", &dir, e))?;
            let path = item.path();
            let file_type = item.file_type().map_err(|e| io_error("stat", &path, e))?;
            let name = archive_name(root, &path)?;

            if file_type.is_dir() {
                entries.push(TreeEntry {
                    name: format!("{name}/"),
                    path: path.clone(),
                    is_dir: true,
                });
                pending.push(path);
            } else if file_type.is_file() {
                entries.push(TreeEntry {
                    name,
                    path,
                    is_dir: false,
                });
            }
        }
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

fn archive_name(root: &Path, path: &Path) -> Result<String, PipelineError> {
    let relative = path.strip_prefix(root).map_err(|_| {
        PipelineError::ExportAssembly(format!("{} is outside the export root", path.display()))
    })?;
    let parts = relative
        .components()
        .map(|c| {
            c.as_os_str().to_str().ok_or_else(|| {
                PipelineError::ExportAssembly(format!("Non UTF-8 path {}", path.display()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(parts.join("/"))
}

fn io_error(action: &str, path: &Path, err: io::Error) -> PipelineError {
    PipelineError::ExportAssembly(format!("Failed to {action} {}: {err}", path.display()))
}

fn zip_error(name: &str, err: zip::result::ZipError) -> PipelineError {
    PipelineError::ExportAssembly(format!("Failed to add '{name}' to archive: {err}"))
}
