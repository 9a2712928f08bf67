//! Decoder for close-delimited bodies.

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Passes bytes through until the peer closes the connection; the close
/// itself is the body terminator, reported via `decode_eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntilCloseDecoder {
    done: bool,
}

impl UntilCloseDecoder {
    pub fn new() -> Self {
        Self { done: false }
    }
}

impl Default for UntilCloseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for UntilCloseDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.done {
            return Ok(Some(PayloadItem::Eof));
        }
        if src.is_empty() {
            return Ok(None);
        }
        Ok(Some(PayloadItem::Chunk(src.split().freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if !src.is_empty() {
            return self.decode(src);
        }
        self.done = true;
        Ok(Some(PayloadItem::Eof))
    }
}
