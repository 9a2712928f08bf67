//! Unified body encoder, dispatching on the framing mode.

use crate::codec::body::chunked_encoder::ChunkedEncoder;
use crate::codec::body::length_encoder::LengthEncoder;
use crate::protocol::{BodySize, PayloadItem, SendError};
use bytes::{Buf, BytesMut};

use tokio_util::codec::Encoder;

/// Encodes a response body according to its [`BodySize`].
///
/// Close-delimited bodies pass bytes through unframed; the connection
/// driver closes the socket after `finish`, which is the terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadEncoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthEncoder),
    Chunked(ChunkedEncoder),
    CloseDelimited { eof: bool },
    NoBody,
}

impl PayloadEncoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedEncoder::new()) }
    }

    pub fn fixed_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthEncoder::new(size)) }
    }

    pub fn close_delimited() -> Self {
        Self { kind: Kind::CloseDelimited { eof: false } }
    }

    /// True once the body is completely encoded (declared length reached,
    /// terminating chunk written, or Eof seen).
    pub fn is_finished(&self) -> bool {
        match &self.kind {
            Kind::Length(encoder) => encoder.is_finished(),
            Kind::Chunked(encoder) => encoder.is_finished(),
            Kind::CloseDelimited { eof } => *eof,
            Kind::NoBody => true,
        }
    }
}

impl From<BodySize> for PayloadEncoder {
    fn from(size: BodySize) -> Self {
        match size {
            BodySize::Empty => Self::empty(),
            BodySize::Length(n) => Self::fixed_length(n),
            BodySize::Chunked => Self::chunked(),
            BodySize::UntilClose => Self::close_delimited(),
        }
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for PayloadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match &mut self.kind {
            Kind::Length(encoder) => encoder.encode(item, dst),
            Kind::Chunked(encoder) => encoder.encode(item, dst),
            Kind::CloseDelimited { eof } => match item {
                PayloadItem::Chunk(bytes) => {
                    dst.extend_from_slice(bytes.chunk());
                    Ok(())
                }
                PayloadItem::Eof => {
                    *eof = true;
                    Ok(())
                }
            },
            Kind::NoBody => Ok(()),
        }
    }
}
