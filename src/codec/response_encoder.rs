//! Two-phase response encoder.

use crate::codec::body::PayloadEncoder;
use crate::codec::head::HeadEncoder;
use crate::protocol::{BodySize, Message, ResponseHead, SendError};
use bytes::{Buf, BytesMut};
use std::io;
use std::io::ErrorKind;
use tokio_util::codec::Encoder;
use tracing::error;

/// Encoder for a response stream: a head locks in the body framing mode,
/// payload items are framed accordingly until the body is finished, then
/// the encoder is ready for the next response.
pub struct ResponseEncoder {
    head_encoder: HeadEncoder,
    payload_encoder: Option<PayloadEncoder>,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Default::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { head_encoder: HeadEncoder, payload_encoder: None }
    }
}

impl<D: Buf> Encoder<Message<(ResponseHead, BodySize), D>> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: Message<(ResponseHead, BodySize), D>, dst: &mut BytesMut) -> Result<(), Self::Error> {
        match item {
            Message::Head((head, body_size)) => {
                if self.payload_encoder.is_some() {
                    error!("response head while the previous body is unfinished");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                }
                self.payload_encoder = Some(body_size.into());
                self.head_encoder.encode((head, body_size), dst)
            }

            Message::Payload(payload_item) => {
                let Some(payload_encoder) = &mut self.payload_encoder else {
                    // a trailing Eof after the body completed is benign
                    if payload_item.is_eof() {
                        return Ok(());
                    }
                    error!("payload item before a response head");
                    return Err(io::Error::from(ErrorKind::InvalidInput).into());
                };

                let result = payload_encoder.encode(payload_item, dst);
                if payload_encoder.is_finished() {
                    self.payload_encoder.take();
                }
                result
            }
        }
    }
}
