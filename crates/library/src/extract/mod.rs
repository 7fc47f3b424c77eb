//! Streaming archive extraction.
//!
//! [`extract`] turns a [`ByteSource`] of a compressed tarball into a stream
//! of [`ArchiveEntry`]s, one per regular file, in archive order. The whole
//! archive is never held in memory: a blocking worker pulls compressed chunks
//! through the decoder and the tar reader, and hands finished entries over a
//! bounded channel. When the channel is full the worker blocks, and so does
//! reading from the source.
//!
//! Cancellation is checked at every chunk boundary (a stalled source is
//! abandoned immediately) and at every entry boundary, and is always
//! reported as [`ErrorKind::Cancelled`], never as a format error.

mod envelope;
pub mod error;
mod tap;

pub use self::envelope::Envelope;
use self::error::{ErrorKind, Result};
use self::tap::{SourceGauge, tap};
use crate::source::ByteSource;
use async_stream::stream;
use bytes::Bytes;
use exn::ResultExt;
use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use std::io::Read;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::io::{StreamReader, SyncIoBridge};
use tokio_util::sync::{CancellationToken, DropGuard};

/// Entries buffered between the extraction worker and the consumer, unless
/// told otherwise.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;
// Don't trust a header's declared size for preallocation.
const MAX_PREALLOCATION: usize = 8 * 1024 * 1024;

/// One regular file recovered from the archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    /// Path relative to the archive root.
    pub path: PathBuf,
    pub content: Bytes,
    pub size_bytes: u64,
    /// Compressed bytes pulled from the source by the time this entry was
    /// complete. Never decreases from one entry to the next.
    pub bytes_consumed: u64,
}

/// The lazy entry stream returned by [`extract`].
///
/// Finite and not restartable. Ends after the last entry, or right after the
/// first error. Dropping it stops the worker, even one waiting on a stalled
/// source, and releases the source.
pub struct Extraction {
    entries: BoxStream<'static, Result<ArchiveEntry>>,
    gauge: Arc<SourceGauge>,
    total: Option<u64>,
    _stop: DropGuard,
}

impl Extraction {
    /// Compressed bytes pulled from the source so far.
    pub fn bytes_consumed(&self) -> u64 {
        self.gauge.consumed()
    }

    /// Total compressed size, if the source knew it.
    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

impl Stream for Extraction {
    type Item = Result<ArchiveEntry>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.entries.poll_next_unpin(cx)
    }
}

/// Extract regular files from a (possibly compressed) tarball.
///
/// Nothing happens until the returned stream is first polled, which must be
/// from within a Tokio runtime. Directories, links and metadata members are
/// skipped.
///
/// ```no_run
/// use bookcase_library::extract::extract;
/// use bookcase_library::source::ByteSource;
/// use futures::TryStreamExt;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let source = ByteSource::from_file("gutenberg.tar.gz").await?;
/// let mut entries = extract(source, CancellationToken::new(), 16);
/// while let Some(entry) = entries.try_next().await? {
///     println!("{} ({} bytes)", entry.path.display(), entry.size_bytes);
/// }
/// # Ok(())
/// # }
/// ```
pub fn extract(source: ByteSource, cancel: CancellationToken, capacity: usize) -> Extraction {
    let (chunks, total) = source.into_parts();
    // Cancelled with the caller's token, or when the extraction is dropped.
    let cancel = cancel.child_token();
    let stop = cancel.clone().drop_guard();
    let gauge = Arc::new(SourceGauge::default());
    let worker_gauge = gauge.clone();
    let entries = stream! {
        let (tx, mut rx) = mpsc::channel(capacity.max(1));
        let reader = SyncIoBridge::new(StreamReader::new(tap(chunks, worker_gauge.clone(), cancel.clone())));
        let span = tracing::Span::current();
        let worker = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            if let Err(err) = read_archive(reader, &worker_gauge, &cancel, &tx) {
                tracing::debug!(kind = %*err, consumed = worker_gauge.consumed(), "extraction stopped");
                // Nobody to tell if the consumer has already gone.
                _ = tx.blocking_send(Err(err));
            }
        });
        while let Some(item) = rx.recv().await {
            yield item;
        }
        if let Err(e) = worker.await {
            if e.is_panic() {
                yield Err(exn::Exn::from(ErrorKind::Worker));
            }
        }
    };
    Extraction { entries: entries.boxed(), gauge, total, _stop: stop }
}

/// Runs on the blocking worker. Returns once the archive is exhausted, the
/// consumer has gone away, or something failed.
fn read_archive(
    reader: impl Read,
    gauge: &SourceGauge,
    cancel: &CancellationToken,
    tx: &mpsc::Sender<Result<ArchiveEntry>>,
) -> Result<()> {
    let classify = || gauge.classify(cancel);
    let (envelope, decoder) = envelope::open(reader).or_raise(classify)?;
    tracing::debug!(%envelope, "detected archive envelope");

    let mut archive = tar::Archive::new(decoder);
    let mut yielded = 0_u64;
    for entry in archive.entries().or_raise(classify)? {
        if cancel.is_cancelled() {
            exn::bail!(ErrorKind::Cancelled);
        }
        let mut entry = entry.or_raise(classify)?;
        if !entry.header().entry_type().is_file() {
            tracing::trace!(entry_type = ?entry.header().entry_type(), "skipping non-file member");
            continue;
        }
        let path = entry.path().or_raise(classify)?.into_owned();
        let size_bytes = entry.size();
        let mut content = Vec::with_capacity(usize::try_from(size_bytes).unwrap_or(usize::MAX).min(MAX_PREALLOCATION));
        entry.read_to_end(&mut content).or_raise(classify)?;
        if (content.len() as u64) < size_bytes {
            tracing::debug!(path = %path.display(), size_bytes, read = content.len(), "archive ended mid-entry");
            exn::bail!(classify());
        }
        let entry = ArchiveEntry {
            path,
            content: Bytes::from(content),
            size_bytes,
            bytes_consumed: gauge.consumed(),
        };
        if tx.blocking_send(Ok(entry)).is_err() {
            tracing::debug!(yielded, "consumer went away");
            return Ok(());
        }
        yielded += 1;
    }
    tracing::debug!(yielded, consumed = gauge.consumed(), "archive exhausted");
    Ok(())
}
