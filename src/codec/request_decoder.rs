//! Two-phase request decoder.
//!
//! Alternates between head parsing and body decoding: after a head is
//! produced, payload items are yielded until `Eof`, at which point the
//! decoder is back in head phase and the next pipelined request (possibly
//! already buffered) can be parsed without further input.

use crate::codec::body::PayloadDecoder;
use crate::codec::head::HeadDecoder;
use crate::config::EngineConfig;
use crate::protocol::{BodySize, Message, ParseError, PayloadItem, RequestHead};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Decoder for a request stream: heads interleaved with their payloads.
///
/// The phase is carried by `payload_decoder`: `None` means a head is being
/// parsed, `Some` means the current request's body is being decoded.
pub struct RequestDecoder {
    head_decoder: HeadDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new(config: &EngineConfig) -> Self {
        Self { head_decoder: HeadDecoder::new(config), payload_decoder: None }
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHead, BodySize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };
            return Ok(message);
        }

        let message = match self.head_decoder.decode(src)? {
            Some((head, body_size)) => {
                self.payload_decoder = Some(body_size.into());
                Some(Message::Head((head, body_size)))
            }
            None => None,
        };
        Ok(message)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode_eof(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(item @ PayloadItem::Eof) => {
                    self.payload_decoder.take();
                    Some(Message::Payload(item))
                }
                None => None,
            };
            return Ok(message);
        }

        // head phase: a clean close between requests is a normal end of
        // stream, a close mid-head is a truncated request
        if src.is_empty() {
            Ok(None)
        } else {
            self.decode(src)
        }
    }
}
