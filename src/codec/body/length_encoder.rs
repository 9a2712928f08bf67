//! Encoder for fixed-length response bodies.

use crate::protocol::{PayloadItem, SendError};
use bytes::{Buf, BytesMut};
use tokio_util::codec::Encoder;

/// Emits body bytes verbatim, counting them against the declared
/// `Content-Length`. Exceeding the declared length is a framing mismatch;
/// the exactness check at the end of the body is the response writer's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthEncoder {
    declared: u64,
    remaining: u64,
}

impl LengthEncoder {
    pub fn new(length: u64) -> Self {
        Self { declared: length, remaining: length }
    }

    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }
}

impl<D: Buf> Encoder<PayloadItem<D>> for LengthEncoder {
    type Error = SendError;

    fn encode(&mut self, item: PayloadItem<D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            PayloadItem::Chunk(bytes) => {
                let len = bytes.remaining() as u64;
                if len == 0 {
                    return Ok(());
                }
                if len > self.remaining {
                    return Err(SendError::framing_mismatch(self.declared - self.remaining + len, self.declared));
                }
                dst.extend_from_slice(bytes.chunk());
                self.remaining -= len;
                Ok(())
            }
            PayloadItem::Eof => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn counts_down_declared_length() {
        let mut encoder = LengthEncoder::new(5);
        let mut dst = BytesMut::new();
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hel")), &mut dst).unwrap();
        assert!(!encoder.is_finished());
        encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"lo")), &mut dst).unwrap();
        assert!(encoder.is_finished());
        assert_eq!(&dst[..], b"hello");
    }

    #[test]
    fn overrun_is_a_framing_mismatch() {
        let mut encoder = LengthEncoder::new(3);
        let mut dst = BytesMut::new();
        let err = encoder.encode(PayloadItem::Chunk(Bytes::from_static(b"hello")), &mut dst).unwrap_err();
        assert!(matches!(err, SendError::FramingMismatch { written: 5, declared: 3 }));
    }
}
