//! # Streaming Archive Writer
//!
//! Two ways to produce a [`CarStream`]:
//!
//! - **Pull** ([`pack`]): wrap a `Stream` of blocks. The header is emitted on
//!   the first poll and every later poll pulls exactly one upstream block, so
//!   production runs at the consumer's pace.
//! - **Push** ([`CarWriter::create`]): a producer task calls
//!   [`CarWriter::put`] as blocks become available. The channel holds one
//!   record, so `put` suspends while the consumer is behind.
//!
//! In both modes the stream ends with a single `Err(StreamAbortedError)` if
//! production fails, and yields nothing after it.

use std::fmt;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use carpost_core::{Block, BlockSet, Identifier};
use futures::future;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use tokio::sync::mpsc;

use crate::error::{CarError, StreamAbortedError};
use crate::header::{encode_record, CarHeader};

/// A lazily produced archive byte stream.
pub struct CarStream {
    inner: BoxStream<'static, Result<Bytes, StreamAbortedError>>,
}

impl CarStream {
    fn new(inner: impl Stream<Item = Result<Bytes, StreamAbortedError>> + Send + 'static) -> Self {
        Self {
            inner: stop_after_error(inner).boxed(),
        }
    }

    /// Drain the stream into one buffer.
    pub async fn into_bytes(mut self) -> Result<Bytes, StreamAbortedError> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.inner.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out.freeze())
    }
}

impl Stream for CarStream {
    type Item = Result<Bytes, StreamAbortedError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.poll_next_unpin(cx)
    }
}

impl fmt::Debug for CarStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CarStream").finish_non_exhaustive()
    }
}

fn stop_after_error<S>(stream: S) -> impl Stream<Item = Result<Bytes, StreamAbortedError>>
where
    S: Stream<Item = Result<Bytes, StreamAbortedError>>,
{
    stream.scan(false, |failed, item| {
        if *failed {
            return future::ready(None);
        }
        *failed = item.is_err();
        future::ready(Some(item))
    })
}

/// Pack a stream of blocks behind `roots`.
///
/// Roots are written first and are not checked against the blocks that
/// follow. An upstream error ends the archive with [`StreamAbortedError`].
pub fn pack<S, E>(roots: Vec<Identifier>, blocks: S) -> CarStream
where
    S: Stream<Item = Result<Block, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    let header = CarHeader::new(roots)
        .and_then(|h| h.encode())
        .map_err(|e| StreamAbortedError::new(e.to_string()));
    let records = blocks.map(|item| match item {
        Ok(block) => Ok(encode_record(&block)),
        Err(e) => {
            tracing::warn!(error = %e, "block producer failed, aborting archive");
            Err(StreamAbortedError::new(format!("block producer failed: {e}")))
        }
    });
    CarStream::new(stream::once(future::ready(header)).chain(records))
}

/// Pack a complete block set, roots first, blocks in set order.
pub fn pack_block_set(set: &BlockSet) -> CarStream {
    let blocks: Vec<Result<Block, std::convert::Infallible>> = set.iter().cloned().map(Ok).collect();
    pack(set.roots().to_vec(), stream::iter(blocks))
}

enum Frame {
    Record(Bytes),
    End,
    Abort(String),
}

/// Push-mode archive producer.
///
/// Dropping a writer without calling [`close`](Self::close) aborts the
/// stream.
#[derive(Debug)]
pub struct CarWriter {
    tx: mpsc::Sender<Frame>,
}

impl CarWriter {
    /// Start an archive declaring `roots`. The header is available to the
    /// consumer immediately.
    pub fn create(roots: Vec<Identifier>) -> Result<(Self, CarStream), CarError> {
        let header = CarHeader::new(roots)?.encode()?;
        let (tx, rx) = mpsc::channel(1);

        let frames = stream::unfold((rx, false), |(mut rx, done)| async move {
            if done {
                return None;
            }
            match rx.recv().await {
                Some(Frame::Record(bytes)) => Some((Ok(bytes), (rx, false))),
                Some(Frame::End) => None,
                Some(Frame::Abort(reason)) => Some((Err(StreamAbortedError::new(reason)), (rx, true))),
                None => Some((
                    Err(StreamAbortedError::new("archive writer dropped before close")),
                    (rx, true),
                )),
            }
        });
        let stream = CarStream::new(stream::once(future::ready(Ok(header))).chain(frames));
        Ok((Self { tx }, stream))
    }

    /// Append a block, waiting while the consumer is one record behind.
    ///
    /// Fails once the consumer has dropped the stream.
    pub async fn put(&mut self, block: &Block) -> Result<(), StreamAbortedError> {
        self.tx
            .send(Frame::Record(encode_record(block)))
            .await
            .map_err(|_| StreamAbortedError::consumer_closed())
    }

    /// Finish the archive.
    pub async fn close(self) -> Result<(), StreamAbortedError> {
        self.tx
            .send(Frame::End)
            .await
            .map_err(|_| StreamAbortedError::consumer_closed())
    }

    /// End the archive with an error the consumer will observe.
    pub async fn abort(self, reason: impl Into<String>) {
        // A gone consumer has nothing left to tell.
        let _ = self.tx.send(Frame::Abort(reason.into())).await;
    }
}
