//! Temp-file spool for large bodies.

use std::io;

use bytes::Bytes;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};
use tracing::debug;

/// A request body spilled to a temporary file.
///
/// The file is anonymous (unlinked at creation), so the storage is
/// reclaimed when the handle drops, on every exit path including failure.
#[derive(Debug)]
pub struct SpooledBody {
    file: File,
    len: u64,
}

impl SpooledBody {
    pub(crate) fn create() -> io::Result<Self> {
        let file = tempfile::tempfile()?;
        debug!("created body spool file");
        Ok(Self { file: File::from_std(file), len: 0 })
    }

    pub(crate) async fn push(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.file.write_all(bytes).await?;
        self.len += bytes.len() as u64;
        Ok(())
    }

    /// Total number of body bytes in the spool.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Reads the whole spool back into memory.
    pub async fn into_bytes(mut self) -> io::Result<Bytes> {
        self.file.rewind().await?;
        let mut out = Vec::with_capacity(self.len as usize);
        self.file.read_to_end(&mut out).await?;
        Ok(Bytes::from(out))
    }

    /// Hands out the underlying file, rewound to the body start, for
    /// callers that want to stream the spooled bytes themselves.
    pub async fn into_file(mut self) -> io::Result<File> {
        self.file.rewind().await?;
        Ok(self.file)
    }
}
