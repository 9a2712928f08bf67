//! Decoder for chunked transfer encoding (RFC 9112 §7.1).
//!
//! The body arrives as a sequence of size-prefixed chunks; a zero-size
//! chunk ends the body, optionally followed by trailer fields which are
//! read and discarded.

use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;
use ChunkedState::*;

/// State machine decoding one chunked body.
///
/// `decode` yields `Chunk` items for payload bytes (a single chunk may be
/// delivered across several items if it spans multiple reads), `Eof` after
/// the terminating zero-size chunk, and `None` while more input is needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Hex chunk-size digits.
    Size,
    /// Whitespace between the size and the extension or CR.
    SizeLws,
    /// Chunk extension, skipped up to the CR.
    Extension,
    /// LF closing the size line.
    SizeLf,
    /// Payload bytes of the current chunk.
    Body,
    /// CR after the chunk payload.
    BodyCr,
    /// LF after the chunk payload.
    BodyLf,
    /// A trailer field line, skipped.
    Trailer,
    /// LF closing a trailer line.
    TrailerLf,
    /// CR of the final empty line.
    EndCr,
    /// LF of the final empty line.
    EndLf,
    /// Terminating zero-size chunk fully consumed.
    End,
}

/// Outcome of one state step: either the next state, or "need more input".
enum Step {
    Next(ChunkedState),
    Incomplete,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: Size, remaining: 0 }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == End {
                trace!("chunked body complete");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            let mut out = None;
            self.state = match self.state.step(src, &mut self.remaining, &mut out)? {
                Step::Next(state) => state,
                Step::Incomplete => return Ok(None),
            };

            if let Some(bytes) = out {
                trace!(len = bytes.len(), "decoded chunk bytes");
                return Ok(Some(PayloadItem::Chunk(bytes)));
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            // the peer closed before the terminating zero-size chunk
            None => Err(ParseError::TruncatedBody),
        }
    }
}

macro_rules! next_byte {
    ($src:ident) => {{
        if $src.is_empty() {
            return Ok(Step::Incomplete);
        }
        $src.get_u8()
    }};
}

impl ChunkedState {
    fn step(
        &self,
        src: &mut BytesMut,
        remaining: &mut u64,
        out: &mut Option<Bytes>,
    ) -> Result<Step, ParseError> {
        match self {
            Size => Self::read_size(src, remaining),
            SizeLws => Self::read_size_lws(src),
            Extension => Self::read_extension(src),
            SizeLf => Self::read_size_lf(src, *remaining),
            Body => Self::read_body(src, remaining, out),
            BodyCr => Self::expect(src, b'\r', BodyLf, "missing CR after chunk data"),
            BodyLf => Self::expect(src, b'\n', Size, "missing LF after chunk data"),
            Trailer => Self::read_trailer(src),
            TrailerLf => Self::expect(src, b'\n', EndCr, "missing LF after trailer line"),
            EndCr => Self::read_end_cr(src),
            EndLf => Self::expect(src, b'\n', End, "missing final LF"),
            End => Ok(Step::Next(End)),
        }
    }

    fn expect(src: &mut BytesMut, byte: u8, then: ChunkedState, reason: &str) -> Result<Step, ParseError> {
        if next_byte!(src) == byte {
            Ok(Step::Next(then))
        } else {
            Err(ParseError::invalid_chunk(reason))
        }
    }

    fn read_size(src: &mut BytesMut, remaining: &mut u64) -> Result<Step, ParseError> {
        let overflow = || ParseError::invalid_chunk("chunk size overflows u64");
        let digit = match next_byte!(src) {
            b @ b'0'..=b'9' => b - b'0',
            b @ b'a'..=b'f' => b + 10 - b'a',
            b @ b'A'..=b'F' => b + 10 - b'A',
            b'\t' | b' ' => return Ok(Step::Next(SizeLws)),
            b';' => return Ok(Step::Next(Extension)),
            b'\r' => return Ok(Step::Next(SizeLf)),
            _ => return Err(ParseError::invalid_chunk("invalid chunk size digit")),
        };
        *remaining = remaining.checked_mul(16).ok_or_else(overflow)?;
        *remaining = remaining.checked_add(u64::from(digit)).ok_or_else(overflow)?;
        Ok(Step::Next(Size))
    }

    fn read_size_lws(src: &mut BytesMut) -> Result<Step, ParseError> {
        match next_byte!(src) {
            // whitespace may follow the size, but no further digits
            b'\t' | b' ' => Ok(Step::Next(SizeLws)),
            b';' => Ok(Step::Next(Extension)),
            b'\r' => Ok(Step::Next(SizeLf)),
            _ => Err(ParseError::invalid_chunk("invalid byte after chunk size")),
        }
    }

    fn read_extension(src: &mut BytesMut) -> Result<Step, ParseError> {
        // extensions are ignored; they end at CRLF. A bare LF inside an
        // extension is rejected so sloppy peers cannot smuggle a line end.
        match next_byte!(src) {
            b'\r' => Ok(Step::Next(SizeLf)),
            b'\n' => Err(ParseError::invalid_chunk("bare LF in chunk extension")),
            _ => Ok(Step::Next(Extension)),
        }
    }

    fn read_size_lf(src: &mut BytesMut, remaining: u64) -> Result<Step, ParseError> {
        match next_byte!(src) {
            b'\n' if remaining == 0 => Ok(Step::Next(EndCr)),
            b'\n' => Ok(Step::Next(Body)),
            _ => Err(ParseError::invalid_chunk("missing LF after chunk size")),
        }
    }

    fn read_body(src: &mut BytesMut, remaining: &mut u64, out: &mut Option<Bytes>) -> Result<Step, ParseError> {
        if src.is_empty() {
            return Ok(Step::Next(Body));
        }
        if *remaining == 0 {
            return Ok(Step::Next(BodyCr));
        }

        let take = std::cmp::min(*remaining, src.len() as u64) as usize;
        *remaining -= take as u64;
        *out = Some(src.split_to(take).freeze());

        if *remaining > 0 {
            Ok(Step::Next(Body))
        } else {
            Ok(Step::Next(BodyCr))
        }
    }

    fn read_trailer(src: &mut BytesMut) -> Result<Step, ParseError> {
        match next_byte!(src) {
            b'\r' => Ok(Step::Next(TrailerLf)),
            _ => Ok(Step::Next(Trailer)),
        }
    }

    fn read_end_cr(src: &mut BytesMut) -> Result<Step, ParseError> {
        match next_byte!(src) {
            b'\r' => Ok(Step::Next(EndLf)),
            // not the final empty line, so it must be a trailer field
            _ => Ok(Step::Next(Trailer)),
        }
    }
}
