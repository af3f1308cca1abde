//! Streaming the upstream body back in bounded chunks.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_core::Stream;

/// Re-chunks an upstream byte stream so that no chunk handed to the caller's
/// connection exceeds `chunk_size` bytes.
///
/// Splitting is zero-copy (`Bytes::split_to`); at most one upstream chunk is
/// held at a time. When the inner stream ends, the total byte count is
/// recorded as `bytes_relayed` on `span`.
pub struct BoundedChunks<S> {
    inner: Pin<Box<S>>,
    pending: Bytes,
    chunk_size: usize,
    relayed: u64,
    span: tracing::Span,
}

impl<S> BoundedChunks<S> {
    pub fn new(inner: S, chunk_size: usize, span: tracing::Span) -> Self {
        Self {
            inner: Box::pin(inner),
            pending: Bytes::new(),
            chunk_size: chunk_size.max(1),
            relayed: 0,
            span,
        }
    }

    fn take_chunk(&mut self) -> Bytes {
        let n = self.pending.len().min(self.chunk_size);
        self.relayed += n as u64;
        self.pending.split_to(n)
    }
}

impl<S, E> Stream for BoundedChunks<S>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    type Item = Result<Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            if !self.pending.is_empty() {
                return Poll::Ready(Some(Ok(self.take_chunk())));
            }
            match self.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(chunk))) => {
                    self.pending = chunk;
                }
                Poll::Ready(Some(Err(e))) => {
                    tracing::warn!(parent: &self.span, relayed = self.relayed, "Upstream body read failed");
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(None) => {
                    self.span.record("bytes_relayed", self.relayed);
                    return Poll::Ready(None);
                }
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
