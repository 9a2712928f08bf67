//! Wire codecs for HTTP/1.x messages.
//!
//! Everything here implements `tokio_util::codec::{Decoder, Encoder}` and
//! operates purely on buffered bytes: feeding is the caller's business
//! (typically through `FramedRead`/`FramedWrite`), and "need more data" is
//! an explicit `None`, never a block. [`RequestDecoder`] sequences head
//! parsing and body decoding on the read side; [`ResponseEncoder`] does
//! the mirror image on the write side.

pub mod body;
pub mod head;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
