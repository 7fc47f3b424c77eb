//! Archive byte sources.

use crate::error::{ErrorKind, Result};
use bytes::Bytes;
use exn::ResultExt;
use futures::stream::{self, BoxStream};
use futures::{Stream, StreamExt};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::io;
use std::path::Path;
use tokio_util::io::ReaderStream;

/// Chunk size used when slicing in-memory archives.
pub const DEFAULT_CHUNK_SIZE: usize = 64 * 1024;

/// An ordered stream of compressed archive bytes, with an optional known
/// total length.
///
/// Sources are read front to back exactly once; there is no seeking, and
/// dropping the source is how reading is abandoned early.
pub struct ByteSource {
    chunks: BoxStream<'static, io::Result<Bytes>>,
    total: Option<u64>,
}

impl ByteSource {
    /// Wrap any stream of byte chunks (an HTTP body, a pipe, ...).
    pub fn from_stream<S>(chunks: S, total: Option<u64>) -> Self
    where
        S: Stream<Item = io::Result<Bytes>> + Send + 'static,
    {
        Self { chunks: chunks.boxed(), total }
    }

    /// Serve an in-memory archive in `chunk_size` slices. The total is known.
    ///
    /// ```
    /// use bookcase_library::source::ByteSource;
    ///
    /// let source = ByteSource::from_bytes(vec![0_u8; 10], 4);
    /// assert_eq!(source.total(), Some(10));
    /// ```
    pub fn from_bytes(data: impl Into<Bytes>, chunk_size: usize) -> Self {
        let data = data.into();
        let chunk_size = chunk_size.max(1);
        let total = data.len() as u64;
        let chunks = (0..data.len()).step_by(chunk_size).map(move |start| {
            let end = (start + chunk_size).min(data.len());
            Ok::<_, io::Error>(data.slice(start..end))
        });
        Self::from_stream(stream::iter(chunks.collect::<Vec<_>>()), Some(total))
    }

    /// Stream a local file. The total is taken from the file's metadata.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = tokio::fs::File::open(path).await.or_raise(|| ErrorKind::Source)?;
        let total = file.metadata().await.or_raise(|| ErrorKind::Source)?.len();
        tracing::debug!(path = %path.display(), total, "opened archive");
        Ok(Self::from_stream(ReaderStream::with_capacity(file, DEFAULT_CHUNK_SIZE), Some(total)))
    }

    /// Total length in bytes, if known up front.
    pub fn total(&self) -> Option<u64> {
        self.total
    }

    pub(crate) fn into_parts(self) -> (BoxStream<'static, io::Result<Bytes>>, Option<u64>) {
        (self.chunks, self.total)
    }
}

impl Debug for ByteSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ByteSource").field("total", &self.total).finish_non_exhaustive()
    }
}
