//! Incremental response writing with framing enforcement.

use bytes::Bytes;
use futures::SinkExt;
use tokio::io::AsyncWrite;
use tokio_util::codec::FramedWrite;
use tracing::error;

use crate::codec::ResponseEncoder;
use crate::protocol::{BodySize, HttpError, Message, PayloadItem, ResponseHead, SendError, UsageError};

/// Writes one response onto the connection, holding the caller to the
/// framing mode declared with the head: a fixed-length body must add up to
/// exactly the declared byte count, a chunked body gets one chunk per
/// write and the terminator on [`finish`](Self::finish). Writes are
/// buffered by the framed sink; `finish` flushes.
pub struct ResponseWriter<'a, W> {
    framed_write: &'a mut FramedWrite<W, ResponseEncoder>,
    mode: Option<BodySize>,
    written: u64,
    finished: bool,
}

impl<'a, W> ResponseWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(framed_write: &'a mut FramedWrite<W, ResponseEncoder>) -> Self {
        Self { framed_write, mode: None, written: 0, finished: false }
    }

    /// Declares the status line, headers and body framing mode. Must be
    /// called exactly once, before any body write.
    pub async fn write_head(&mut self, head: ResponseHead, body_size: BodySize) -> Result<(), HttpError> {
        if self.mode.is_some() {
            return Err(UsageError::HeadAlreadyWritten.into());
        }
        self.framed_write.feed(Message::<_, Bytes>::Head((head, body_size))).await?;
        self.mode = Some(body_size);
        Ok(())
    }

    /// Appends body bytes under the declared mode. Exceeding a declared
    /// fixed length fails without touching the wire.
    pub async fn write_body(&mut self, bytes: Bytes) -> Result<(), HttpError> {
        if self.finished {
            return Err(UsageError::ResponseFinished.into());
        }
        let Some(mode) = self.mode else {
            return Err(UsageError::HeadNotWritten.into());
        };
        if bytes.is_empty() {
            // a zero-length chunk would be the chunked terminator
            return Ok(());
        }

        let declared = match mode {
            BodySize::Empty => Some(0),
            BodySize::Length(n) => Some(n),
            BodySize::Chunked | BodySize::UntilClose => None,
        };
        if let Some(declared) = declared {
            let total = self.written + bytes.len() as u64;
            if total > declared {
                error!(total, declared, "response body exceeds the declared length");
                return Err(SendError::framing_mismatch(total, declared).into());
            }
        }

        self.written += bytes.len() as u64;
        self.framed_write.feed(Message::Payload(PayloadItem::Chunk(bytes))).await?;
        Ok(())
    }

    /// Completes the response: validates the declared length was met,
    /// emits the chunked terminator when applicable and flushes.
    pub async fn finish(&mut self) -> Result<(), HttpError> {
        if self.finished {
            return Err(UsageError::ResponseFinished.into());
        }
        let Some(mode) = self.mode else {
            return Err(UsageError::HeadNotWritten.into());
        };
        if let BodySize::Length(declared) = mode {
            if self.written != declared {
                error!(written = self.written, declared, "response body shorter than declared");
                return Err(SendError::framing_mismatch(self.written, declared).into());
            }
        }
        self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
        self.finished = true;
        Ok(())
    }

    /// True when the body is close-delimited, so the connection must be
    /// closed to mark the end of the response.
    pub fn wants_close(&self) -> bool {
        matches!(self.mode, Some(BodySize::UntilClose))
    }
}
