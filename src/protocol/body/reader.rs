//! Pull-model request body reader.
//!
//! A [`BodyReader`] borrows the connection's decoded frame stream for the
//! duration of one request and exposes the body two mutually exclusive
//! ways: incremental [`read_chunk`](BodyReader::read_chunk) calls in
//! caller-chosen sizes, or a wholesale [`load`](BodyReader::load) that
//! buffers in memory up to a threshold and spills to a temp-file spool
//! beyond it. Loading after incremental reading has begun is a usage
//! error, since the already-consumed bytes cannot be recovered.

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use std::io;
use tracing::{debug, trace};

use crate::protocol::body::SpooledBody;
use crate::protocol::{BodySize, HttpError, Message, ParseError, PayloadItem, RequestHead, UsageError};

/// Read size used internally by `load` and `drain`.
const INTERNAL_CHUNK_BYTES: usize = 16 * 1024;

/// The decoded frames a body reader pulls from. In production this is the
/// connection's `FramedRead`; tests substitute an in-memory stream.
pub(crate) trait FrameSource:
    Stream<Item = Result<Message<(RequestHead, BodySize)>, ParseError>> + Send + Unpin
{
}

impl<S> FrameSource for S where
    S: Stream<Item = Result<Message<(RequestHead, BodySize)>, ParseError>> + Send + Unpin
{
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    NotStarted,
    Streaming,
    Exhausted,
    Failed,
}

/// Lazy, on-demand reader over one request's body bytes.
pub struct BodyReader<'a> {
    frames: &'a mut dyn FrameSource,
    /// Surplus of a decoded chunk that exceeded the caller's `max_bytes`.
    stash: Bytes,
    state: ReadState,
    consumed: u64,
    spool_threshold: usize,
}

/// A wholesale-loaded body: in memory when it fit under the threshold,
/// spooled to a temp file when it did not. Both paths expose identical
/// bytes.
#[derive(Debug)]
pub enum LoadedBody {
    Memory(Bytes),
    Spooled(SpooledBody),
}

impl LoadedBody {
    pub fn len(&self) -> u64 {
        match self {
            Self::Memory(bytes) => bytes.len() as u64,
            Self::Spooled(spool) => spool.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_spooled(&self) -> bool {
        matches!(self, Self::Spooled(_))
    }

    /// The complete body bytes, reading the spool back when necessary.
    pub async fn into_bytes(self) -> io::Result<Bytes> {
        match self {
            Self::Memory(bytes) => Ok(bytes),
            Self::Spooled(spool) => spool.into_bytes().await,
        }
    }
}

impl<'a> BodyReader<'a> {
    pub(crate) fn new(frames: &'a mut dyn FrameSource, spool_threshold: usize) -> Self {
        Self { frames, stash: Bytes::new(), state: ReadState::NotStarted, consumed: 0, spool_threshold }
    }

    /// Total body bytes handed out so far.
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    pub fn is_exhausted(&self) -> bool {
        self.state == ReadState::Exhausted
    }

    /// Returns up to `max_bytes` of body data, or `None` at the end of
    /// the body. The end is sticky: further calls keep returning `None`
    /// even if the peer has sent more bytes (those belong to the next
    /// pipelined request). A transport or framing failure poisons the
    /// reader; the connection must be closed afterwards.
    pub async fn read_chunk(&mut self, max_bytes: usize) -> Result<Option<Bytes>, HttpError> {
        match self.state {
            ReadState::Exhausted => return Ok(None),
            ReadState::Failed => {
                return Err(ParseError::io(io::Error::other("body reader is in a failed state")).into());
            }
            ReadState::NotStarted | ReadState::Streaming => {}
        }

        if !self.stash.is_empty() {
            let take = self.stash.len().min(max_bytes);
            let out = self.stash.split_to(take);
            self.advance(out.len() as u64);
            return Ok(Some(out));
        }

        loop {
            match self.frames.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(mut bytes)))) => {
                    if bytes.is_empty() {
                        continue;
                    }
                    if bytes.len() > max_bytes {
                        self.stash = bytes.split_off(max_bytes);
                    }
                    self.advance(bytes.len() as u64);
                    trace!(len = bytes.len(), "body chunk read");
                    return Ok(Some(bytes));
                }
                Some(Ok(Message::Payload(PayloadItem::Eof))) => {
                    self.state = ReadState::Exhausted;
                    return Ok(None);
                }
                Some(Ok(Message::Head(_))) => {
                    // the decoder never interleaves a head inside a body
                    self.state = ReadState::Failed;
                    return Err(ParseError::io(io::Error::other("message head inside a body stream")).into());
                }
                Some(Err(e)) => {
                    self.state = ReadState::Failed;
                    return Err(e.into());
                }
                None => {
                    self.state = ReadState::Failed;
                    return Err(ParseError::TruncatedBody.into());
                }
            }
        }
    }

    /// Reads the body to completion, keeping at most `max_memory_bytes`
    /// in memory; past that threshold the whole body (including what was
    /// already buffered) moves to a temp-file spool. Fails with a usage
    /// error once any `read_chunk` call has occurred.
    pub async fn load(&mut self, max_memory_bytes: usize) -> Result<LoadedBody, HttpError> {
        if self.state != ReadState::NotStarted {
            return Err(UsageError::LoadAfterRead.into());
        }

        let mut buffered = BytesMut::new();
        let mut spool: Option<SpooledBody> = None;

        while let Some(bytes) = self.read_chunk(INTERNAL_CHUNK_BYTES).await? {
            match &mut spool {
                Some(spool) => spool.push(&bytes).await.map_err(ParseError::io)?,
                None => {
                    buffered.extend_from_slice(&bytes);
                    if buffered.len() > max_memory_bytes {
                        debug!(buffered = buffered.len(), threshold = max_memory_bytes, "spilling body to spool");
                        let mut new_spool = SpooledBody::create().map_err(ParseError::io)?;
                        new_spool.push(&buffered).await.map_err(ParseError::io)?;
                        buffered.clear();
                        spool = Some(new_spool);
                    }
                }
            }
        }

        Ok(match spool {
            Some(spool) => LoadedBody::Spooled(spool),
            None => LoadedBody::Memory(buffered.freeze()),
        })
    }

    /// Like [`load`](Self::load), with the connection's configured spool
    /// threshold.
    pub async fn load_to_end(&mut self) -> Result<LoadedBody, HttpError> {
        let threshold = self.spool_threshold;
        self.load(threshold).await
    }

    /// Reads and discards everything up to the end of the body. The
    /// connection driver calls this before reusing the connection, so an
    /// unread body can never desynchronize the next request.
    pub(crate) async fn drain(&mut self) -> Result<(), HttpError> {
        while self.read_chunk(INTERNAL_CHUNK_BYTES).await?.is_some() {}
        Ok(())
    }

    fn advance(&mut self, n: u64) {
        self.consumed += n;
        self.state = ReadState::Streaming;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    type Frame = Result<Message<(RequestHead, BodySize)>, ParseError>;

    fn frames(chunks: &[&'static [u8]], terminated: bool) -> Vec<Frame> {
        let mut out: Vec<Frame> =
            chunks.iter().map(|c| Ok(Message::Payload(PayloadItem::Chunk(Bytes::from_static(c))))).collect();
        if terminated {
            out.push(Ok(Message::Payload(PayloadItem::Eof)));
        }
        out
    }

    #[tokio::test]
    async fn caps_reads_at_max_bytes() {
        let mut source = stream::iter(frames(&[b"hello", b" world"], true));
        let mut reader = BodyReader::new(&mut source, 1024);

        assert_eq!(reader.read_chunk(3).await.unwrap().unwrap().as_ref(), b"hel");
        assert_eq!(reader.read_chunk(100).await.unwrap().unwrap().as_ref(), b"lo");
        assert_eq!(reader.read_chunk(100).await.unwrap().unwrap().as_ref(), b" world");
        assert!(reader.read_chunk(100).await.unwrap().is_none());
        // exhaustion is sticky
        assert!(reader.read_chunk(100).await.unwrap().is_none());
        assert!(reader.is_exhausted());
        assert_eq!(reader.consumed(), 11);
    }

    #[tokio::test]
    async fn tracks_consumed_while_streaming() {
        let mut source = stream::iter(frames(&[b"abcdef"], true));
        let mut reader = BodyReader::new(&mut source, 1024);
        reader.read_chunk(4).await.unwrap();
        assert_eq!(reader.consumed(), 4);
        reader.read_chunk(4).await.unwrap();
        assert_eq!(reader.consumed(), 6);
    }

    #[tokio::test]
    async fn load_small_body_stays_in_memory() {
        let mut source = stream::iter(frames(&[b"hello", b" world"], true));
        let mut reader = BodyReader::new(&mut source, 1024);

        let body = reader.load(1024).await.unwrap();
        assert!(!body.is_spooled());
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"hello world");
    }

    #[tokio::test]
    async fn load_large_body_spills_to_spool() {
        let mut source = stream::iter(frames(&[b"hello", b" world", b" and more"], true));
        let mut reader = BodyReader::new(&mut source, 1024);

        let body = reader.load(8).await.unwrap();
        assert!(body.is_spooled());
        // both paths expose byte-identical content
        assert_eq!(body.into_bytes().await.unwrap().as_ref(), b"hello world and more");
    }

    #[tokio::test]
    async fn load_after_read_is_a_usage_error() {
        let mut source = stream::iter(frames(&[b"hello"], true));
        let mut reader = BodyReader::new(&mut source, 1024);

        reader.read_chunk(2).await.unwrap();
        let err = reader.load(1024).await.unwrap_err();
        assert!(matches!(err, HttpError::Usage { source: UsageError::LoadAfterRead }));
    }

    #[tokio::test]
    async fn unterminated_stream_fails_instead_of_truncating() {
        let mut source = stream::iter(frames(&[b"hello"], false));
        let mut reader = BodyReader::new(&mut source, 1024);

        assert_eq!(reader.read_chunk(100).await.unwrap().unwrap().as_ref(), b"hello");
        let err = reader.read_chunk(100).await.unwrap_err();
        assert!(matches!(err, HttpError::Parse { source: ParseError::TruncatedBody }));
        // the failure is sticky too
        assert!(reader.read_chunk(100).await.is_err());
    }

    #[tokio::test]
    async fn drain_discards_to_exhaustion() {
        let mut source = stream::iter(frames(&[b"hello", b" world"], true));
        let mut reader = BodyReader::new(&mut source, 1024);
        reader.drain().await.unwrap();
        assert!(reader.is_exhausted());
    }
}
