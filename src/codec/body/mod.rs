//! Body framing codecs.
//!
//! One decoder and one encoder per framing mode (fixed length, chunked,
//! close-delimited), unified behind [`PayloadDecoder`] and
//! [`PayloadEncoder`] which dispatch on [`crate::protocol::BodySize`].
//! All of them are pure state machines over `BytesMut`: they never touch
//! the transport and report "need more data" by returning `None`.

mod chunked_decoder;
mod chunked_encoder;
mod length_decoder;
mod length_encoder;
mod payload_decoder;
mod payload_encoder;
mod until_close_decoder;

pub use payload_decoder::PayloadDecoder;
pub use payload_encoder::PayloadEncoder;
