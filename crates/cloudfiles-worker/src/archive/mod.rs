//! Zip archive stages: size validation, extraction, and assembly.
//!
//! The zip reader and writer are synchronous, so each stage runs on the
//! blocking pool and polls the task's cancellation token between entries
//! and between the chunks of each entry.

pub mod builder;
pub mod extractor;
pub mod validator;

use std::io::{self, Read, Write};

use tokio_util::sync::CancellationToken;

pub use builder::build_archive;
pub use extractor::{ExtractionSummary, extract_archive};
pub use validator::{ArchiveManifest, ArchiveValidator};

/// Copy buffer used when streaming entry payloads.
pub(crate) const BUFFER_SIZE: usize = 64 * 1024;

/// Stream `reader` into `writer` one buffer at a time.
///
/// Returns the bytes copied, or `None` once `cancel` fires.
pub(crate) fn copy_chunks<R, W>(
    reader: &mut R,
    writer: &mut W,
    buffer: &mut [u8],
    cancel: &CancellationToken,
) -> io::Result<Option<u64>>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut copied = 0u64;
    loop {
        if cancel.is_cancelled() {
            return Ok(None);
        }
        let n = match reader.read(buffer) {
            Ok(0) => return Ok(Some(copied)),
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
    }
}
