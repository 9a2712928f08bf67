//! Decoder for bodies framed by `Content-Length`.

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Counts down a declared content length, handing out at most the
/// remaining bytes. Anything past the declared length stays in the buffer:
/// it belongs to the next pipelined request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let take = cmp::min(self.remaining, src.len() as u64) as usize;
        let bytes = src.split_to(take).freeze();
        self.remaining -= bytes.len() as u64;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            // connection closed short of the declared length
            None => Err(ParseError::TruncatedBody),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_declared_length() {
        let mut buf = BytesMut::from(&b"1012345678 and the next pipelined request"[..]);
        let mut decoder = LengthDecoder::new(10);

        let item = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"1012345678");

        // follow-up bytes are untouched and the decoder reports Eof
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_eof());
        assert_eq!(&buf[..], b" and the next pipelined request");
    }

    #[test]
    fn partial_delivery() {
        let mut buf = BytesMut::from(&b"abc"[..]);
        let mut decoder = LengthDecoder::new(5);

        let item = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"abc");
        assert!(decoder.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"de");
        let item = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"de");
        assert!(decoder.decode(&mut buf).unwrap().unwrap().is_eof());
    }

    #[test]
    fn truncation_is_an_error() {
        let mut buf = BytesMut::from(&b"ab"[..]);
        let mut decoder = LengthDecoder::new(5);
        let item = decoder.decode(&mut buf).unwrap().unwrap();
        assert_eq!(item.as_bytes().unwrap().as_ref(), b"ab");
        let err = decoder.decode_eof(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::TruncatedBody));
    }
}
