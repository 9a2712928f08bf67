//! Response head serialization.

use crate::protocol::{BodySize, ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{header, HeaderValue, Version};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

const INIT_HEAD_SIZE: usize = 4 * 1024;

/// Serializes the status line and headers, inserting the framing header
/// implied by the chosen [`BodySize`]: `Content-Length` for fixed-length
/// and empty bodies, `Transfer-Encoding: chunked` for chunked ones, and
/// neither for close-delimited responses.
pub struct HeadEncoder;

impl Encoder<(ResponseHead, BodySize)> for HeadEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, BodySize), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, body_size) = item;

        dst.reserve(INIT_HEAD_SIZE);
        match head.version() {
            Version::HTTP_11 | Version::HTTP_10 => {
                let version = if head.version() == Version::HTTP_10 { "HTTP/1.0" } else { "HTTP/1.1" };
                write!(
                    FastWrite(dst),
                    "{} {} {}\r\n",
                    version,
                    head.status().as_str(),
                    head.status().canonical_reason().unwrap_or("Unknown")
                )
                .map_err(SendError::io)?;
            }
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        }

        match body_size {
            BodySize::Length(n) => {
                head.headers_mut().insert(header::CONTENT_LENGTH, n.into());
            }
            BodySize::Chunked => {
                head.headers_mut().insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            }
            BodySize::Empty => {
                head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from_static("0"));
            }
            // the body runs until the connection closes; no framing header
            BodySize::UntilClose => {}
        }

        for (name, value) in head.headers().iter() {
            dst.put_slice(name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// Writes into the already-reserved buffer without intermediate checks.
struct FastWrite<'a>(&'a mut BytesMut);

impl Write for FastWrite<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
