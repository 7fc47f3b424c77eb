use super::error::ErrorKind;
use async_stream::stream;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

/// Shared between the async side that pulls chunks and the blocking worker
/// that decodes them.
#[derive(Debug, Default)]
pub(crate) struct SourceGauge {
    consumed: AtomicU64,
    failed: AtomicBool,
}

impl SourceGauge {
    /// Compressed bytes pulled from the source so far.
    pub fn consumed(&self) -> u64 {
        self.consumed.load(Ordering::Acquire)
    }

    /// Whether the source itself reported an error.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Decide what an I/O error seen by the decoder actually means.
    pub fn classify(&self, cancel: &CancellationToken) -> ErrorKind {
        if cancel.is_cancelled() {
            ErrorKind::Cancelled
        } else if self.failed() {
            ErrorKind::Stream
        } else {
            ErrorKind::Format
        }
    }
}

/// Count every chunk pulled from `chunks`, and stop at the next chunk
/// boundary once `cancel` fires (even if the source is stalled).
pub(crate) fn tap(
    mut chunks: BoxStream<'static, io::Result<Bytes>>,
    gauge: Arc<SourceGauge>,
    cancel: CancellationToken,
) -> BoxStream<'static, io::Result<Bytes>> {
    let tapped = stream! {
        loop {
            let next = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                next = chunks.next() => Some(next),
            };
            match next {
                None => {
                    yield Err(io::Error::other(ErrorKind::Cancelled));
                    break;
                },
                Some(Some(Ok(chunk))) => {
                    gauge.consumed.fetch_add(chunk.len() as u64, Ordering::AcqRel);
                    yield Ok(chunk);
                },
                Some(Some(Err(e))) => {
                    tracing::warn!(error = %e, consumed = gauge.consumed(), "archive source failed");
                    gauge.failed.store(true, Ordering::Release);
                    yield Err(e);
                    break;
                },
                Some(None) => break,
            }
        }
    };
    tapped.boxed()
}
