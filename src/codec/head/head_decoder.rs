//! Request head parser.
//!
//! A hand-written state machine over the line scanner: request line first,
//! then header lines until the empty line that ends the head. The scan
//! records byte spans only; nothing is materialized (and nothing consumed
//! from the buffer) until the whole head has arrived, so a head delivered
//! in arbitrarily small pieces parses identically to one delivered whole:
//! each `decode` call simply re-scans from the buffer start.
//!
//! Once the empty line is seen the head bytes are split off and frozen,
//! and the recorded spans are materialized against that frozen block:
//! header values reference it without copying.

use bytes::BytesMut;
use http::{HeaderMap, HeaderName, HeaderValue, Method, Request, Uri, Version};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::buffer::{LineScanner, Span};
use crate::config::EngineConfig;
use crate::protocol::{BodySize, ParseError, RequestHead};
use crate::utils::ensure;

/// Decoder for the request head, yielding the parsed head and the body
/// framing mode derived from its headers.
#[derive(Debug)]
pub struct HeadDecoder {
    max_line_bytes: usize,
    max_head_bytes: usize,
    max_headers: usize,
}

impl HeadDecoder {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            max_line_bytes: config.max_header_line_bytes,
            max_head_bytes: config.max_head_bytes,
            max_headers: config.max_headers,
        }
    }
}

impl Default for HeadDecoder {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}

/// Byte ranges of one header's name and value within the head block.
#[derive(Debug, Clone, Copy, Default)]
struct HeaderIndex {
    name: Span,
    value: Span,
}

impl Decoder for HeadDecoder {
    type Item = (RequestHead, BodySize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let mut scanner = LineScanner::new(self.max_line_bytes);

        let Some(request_line) = scanner.next_line(src)? else {
            return self.need_more(src);
        };

        let (method_span, target_span, version_span) = split_request_line(src, request_line.content)?;

        let mut headers: Vec<HeaderIndex> = Vec::new();
        let head_end = loop {
            let Some(line) = scanner.next_line(src)? else {
                return self.need_more(src);
            };
            if line.is_empty() {
                break line.next;
            }
            ensure!(headers.len() < self.max_headers, ParseError::too_many_headers(self.max_headers));
            headers.push(split_header_line(src, line.content)?);
        };
        ensure!(head_end <= self.max_head_bytes, ParseError::head_too_large(head_end, self.max_head_bytes));

        trace!(head_bytes = head_end, headers = headers.len(), "parsed request head");

        let method = Method::from_bytes(method_span.slice(src))
            .map_err(|_| ParseError::invalid_request_line("invalid method token"))?;
        let uri = Uri::try_from(target_span.slice(src))
            .map_err(|_| ParseError::invalid_request_line("invalid request target"))?;
        let version = parse_version(version_span.slice(src))?;

        let mut builder = Request::builder().method(method).uri(uri).version(version);
        let header_map = builder
            .headers_mut()
            .ok_or_else(|| ParseError::invalid_request_line("malformed request head"))?;
        header_map.reserve(headers.len());

        // Materialize before compacting: the head block is split off and
        // frozen, header values slice into it without copying.
        let head_bytes = src.split_to(head_end).freeze();
        for index in &headers {
            let name = HeaderName::from_bytes(index.name.slice(&head_bytes))
                .map_err(|e| ParseError::invalid_header(e.to_string()))?;
            let value = HeaderValue::from_maybe_shared(head_bytes.slice(index.value.start..index.value.end))
                .map_err(|e| ParseError::invalid_header(e.to_string()))?;
            header_map.append(name, value);
        }

        let head: RequestHead = builder
            .body(())
            .map_err(|e| ParseError::invalid_request_line(e.to_string()))?
            .into();
        let body_size = derive_body_size(&head)?;

        Ok(Some((head, body_size)))
    }
}

impl HeadDecoder {
    /// Incomplete head: keep waiting, unless it is already oversized.
    fn need_more(&self, src: &BytesMut) -> Result<Option<(RequestHead, BodySize)>, ParseError> {
        ensure!(src.len() <= self.max_head_bytes, ParseError::head_too_large(src.len(), self.max_head_bytes));
        Ok(None)
    }
}

/// Splits `METHOD SP TARGET SP VERSION`; any other token count is malformed.
fn split_request_line(buf: &[u8], line: Span) -> Result<(Span, Span, Span), ParseError> {
    let bytes = line.slice(buf);
    let first = bytes
        .iter()
        .position(|b| *b == b' ')
        .ok_or_else(|| ParseError::invalid_request_line("expected 'METHOD PATH VERSION'"))?;
    let last = bytes.len()
        - 1
        - bytes
            .iter()
            .rev()
            .position(|b| *b == b' ')
            .ok_or_else(|| ParseError::invalid_request_line("expected 'METHOD PATH VERSION'"))?;
    ensure!(first != last, ParseError::invalid_request_line("expected 'METHOD PATH VERSION'"));

    let method = Span::new(line.start, line.start + first);
    let target = Span::new(line.start + first + 1, line.start + last);
    let version = Span::new(line.start + last + 1, line.end);
    ensure!(!method.is_empty(), ParseError::invalid_request_line("empty method"));
    ensure!(
        !target.is_empty() && !target.slice(buf).contains(&b' '),
        ParseError::invalid_request_line("request target contains spaces")
    );
    Ok((method, target, version))
}

/// Splits a header line on the first colon; a colon-free line is a syntax
/// error. The name is trimmed; the value keeps its original bytes with
/// surrounding OWS removed.
fn split_header_line(buf: &[u8], line: Span) -> Result<HeaderIndex, ParseError> {
    let bytes = line.slice(buf);
    let colon = bytes
        .iter()
        .position(|b| *b == b':')
        .ok_or_else(|| ParseError::invalid_header("header line has no colon"))?;
    let name = Span::new(line.start, line.start + colon).trim(buf);
    let value = Span::new(line.start + colon + 1, line.end).trim(buf);
    ensure!(!name.is_empty(), ParseError::invalid_header("empty header name"));
    Ok(HeaderIndex { name, value })
}

fn parse_version(bytes: &[u8]) -> Result<Version, ParseError> {
    match bytes {
        b"HTTP/1.1" => Ok(Version::HTTP_11),
        b"HTTP/1.0" => Ok(Version::HTTP_10),
        other => Err(ParseError::unsupported_version(String::from_utf8_lossy(other))),
    }
}

/// Derives the body framing mode from the head, per RFC 9112 §6:
/// `Transfer-Encoding` wins when well-formed, both headers at once is a
/// framing error, and a `Transfer-Encoding` without a final `chunked` is
/// undecodable and rejected rather than guessed at. Every occurrence of a
/// repeated framing header is inspected; repeats that disagree are framing
/// ambiguities and rejected.
fn derive_body_size(head: &RequestHead) -> Result<BodySize, ParseError> {
    let te = final_transfer_coding(head.headers());
    let cl = content_length(head.headers())?;

    match (te, cl) {
        (None, None) => Ok(BodySize::Empty),

        (Some(_), Some(_)) => Err(ParseError::ConflictingFraming),

        (Some(last_coding), None) => {
            if last_coding.trim_ascii() == b"chunked" {
                Ok(BodySize::Chunked)
            } else {
                Err(ParseError::invalid_header("transfer-encoding without final chunked"))
            }
        }

        (None, Some(0)) => Ok(BodySize::Empty),
        (None, Some(length)) => Ok(BodySize::Length(length)),
    }
}

/// The last listed transfer coding across every `Transfer-Encoding`
/// header, so `Transfer-Encoding: chunked` followed by a second
/// `Transfer-Encoding: gzip` line resolves to gzip, not chunked.
fn final_transfer_coding(headers: &HeaderMap) -> Option<&[u8]> {
    let last_value = headers.get_all(http::header::TRANSFER_ENCODING).iter().last()?;
    last_value.as_bytes().rsplit(|b| *b == b',').next()
}

/// Parses `Content-Length`, rejecting repeated headers that disagree.
fn content_length(headers: &HeaderMap) -> Result<Option<u64>, ParseError> {
    let mut values = headers.get_all(http::header::CONTENT_LENGTH).iter();
    let Some(first) = values.next() else {
        return Ok(None);
    };
    let length = parse_content_length(first)?;
    for other in values {
        ensure!(
            parse_content_length(other)? == length,
            ParseError::invalid_content_length("repeated content-length values disagree")
        );
    }
    Ok(Some(length))
}

fn parse_content_length(value: &HeaderValue) -> Result<u64, ParseError> {
    let text = value.to_str().map_err(|_| ParseError::invalid_content_length("value is not visible ascii"))?;
    text.trim()
        .parse::<u64>()
        .map_err(|_| ParseError::invalid_content_length(format!("value {text:?} is not a u64")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn decode(input: &str) -> Result<Option<(RequestHead, BodySize)>, ParseError> {
        let mut buf = BytesMut::from(input.replace('\n', "\r\n").as_str());
        HeadDecoder::default().decode(&mut buf)
    }

    #[test]
    fn parses_simple_get() {
        let input = indoc! {"
            GET /index.html HTTP/1.1
            Host: 127.0.0.1:8080
            User-Agent: curl/7.79.1
            Accept: */*

        "};
        let (head, body_size) = decode(input).unwrap().unwrap();

        assert_eq!(head.method(), &Method::GET);
        assert_eq!(head.version(), Version::HTTP_11);
        assert_eq!(head.path(), "/index.html");
        assert_eq!(head.query(), None);
        assert!(body_size.is_empty());

        assert_eq!(head.headers().len(), 3);
        assert_eq!(head.headers().get(http::header::HOST).unwrap(), "127.0.0.1:8080");
        assert_eq!(head.headers().get(http::header::USER_AGENT).unwrap(), "curl/7.79.1");
        assert_eq!(head.headers().get(http::header::ACCEPT).unwrap(), "*/*");
    }

    #[test]
    fn keeps_query_and_duplicate_headers_in_order() {
        let input = indoc! {"
            GET /search?a=1&b=2&a=3 HTTP/1.1
            Host: example.org
            Set-Thing: first
            set-thing: second

        "};
        let (head, _) = decode(input).unwrap().unwrap();

        assert_eq!(head.path(), "/search");
        assert_eq!(head.query(), Some("a=1&b=2&a=3"));

        let values: Vec<_> = head.headers().get_all("set-thing").iter().collect();
        assert_eq!(values, vec!["first", "second"]);
    }

    #[test]
    fn leaves_body_bytes_in_buffer() {
        let input = "POST /upload HTTP/1.1\r\nContent-Length: 3\r\n\r\nabc";
        let mut buf = BytesMut::from(input);
        let (head, body_size) = HeadDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.method(), &Method::POST);
        assert_eq!(body_size, BodySize::Length(3));
        assert_eq!(&buf[..], b"abc");
    }

    #[test]
    fn chunk_boundary_invariance() {
        let input = "PUT /data?x=1 HTTP/1.1\r\nHost: a\r\nContent-Length: 5\r\n\r\n";
        let mut decoder = HeadDecoder::default();
        let mut buf = BytesMut::new();

        // byte-at-a-time delivery must yield the same head as one shot
        let mut result = None;
        for byte in input.as_bytes() {
            buf.extend_from_slice(std::slice::from_ref(byte));
            if let Some(parsed) = decoder.decode(&mut buf).unwrap() {
                result = Some(parsed);
            }
        }
        let (head, body_size) = result.expect("head should complete on final byte");

        let (whole_head, whole_size) =
            HeadDecoder::default().decode(&mut BytesMut::from(input)).unwrap().unwrap();
        assert_eq!(head.method(), whole_head.method());
        assert_eq!(head.uri(), whole_head.uri());
        assert_eq!(head.headers(), whole_head.headers());
        assert_eq!(body_size, whole_size);
    }

    #[test]
    fn partial_head_is_not_consumed() {
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nHost: a");
        let mut decoder = HeadDecoder::default();
        assert!(decoder.decode(&mut buf).unwrap().is_none());
        assert_eq!(&buf[..], b"GET / HTTP/1.1\r\nHost: a");
    }

    #[test]
    fn unknown_method_passes_through() {
        let (head, _) = decode("FROBNICATE / HTTP/1.1\n\n").unwrap().unwrap();
        assert_eq!(head.method().as_str(), "FROBNICATE");
    }

    #[test]
    fn request_line_with_one_token_is_rejected() {
        let err = decode("GET\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidRequestLine { .. }));
    }

    #[test]
    fn header_without_colon_is_rejected() {
        let err = decode("GET / HTTP/1.1\nHost example.org\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let err = decode("GET / HTTP/2.0\n\n").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedVersion { .. }));
    }

    #[test]
    fn conflicting_framing_is_rejected() {
        let input = indoc! {"
            POST / HTTP/1.1
            Content-Length: 5
            Transfer-Encoding: chunked

        "};
        let err = decode(input).unwrap_err();
        assert!(matches!(err, ParseError::ConflictingFraming));
    }

    #[test]
    fn chunked_must_be_last_encoding() {
        let (_, size) = decode("POST / HTTP/1.1\nTransfer-Encoding: gzip, chunked\n\n").unwrap().unwrap();
        assert!(size.is_chunked());

        let err = decode("POST / HTTP/1.1\nTransfer-Encoding: chunked, gzip\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));
    }

    #[test]
    fn chunked_must_be_last_across_repeated_te_headers() {
        let err = decode("POST / HTTP/1.1\nTransfer-Encoding: chunked\nTransfer-Encoding: gzip\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidHeader { .. }));

        let (_, size) =
            decode("POST / HTTP/1.1\nTransfer-Encoding: gzip\nTransfer-Encoding: chunked\n\n").unwrap().unwrap();
        assert!(size.is_chunked());
    }

    #[test]
    fn disagreeing_repeated_content_lengths_are_rejected() {
        let err = decode("POST / HTTP/1.1\nContent-Length: 5\nContent-Length: 6\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength { .. }));

        let (_, size) = decode("POST / HTTP/1.1\nContent-Length: 5\nContent-Length: 5\n\n").unwrap().unwrap();
        assert_eq!(size, BodySize::Length(5));
    }

    #[test]
    fn bad_content_length_is_rejected() {
        let err = decode("POST / HTTP/1.1\nContent-Length: five\n\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidContentLength { .. }));
    }

    #[test]
    fn too_many_headers() {
        let config = EngineConfig::default().with_max_headers(2);
        let mut decoder = HeadDecoder::new(&config);
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n");
        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::TooManyHeaders { max: 2 }));
    }

    #[test]
    fn oversized_head_fails_before_completion() {
        let config = EngineConfig::default().with_max_head_bytes(32);
        let mut decoder = HeadDecoder::new(&config);
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nPadding: aaaaaaaaaaaaaaaaaaaaaaaa");
        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::HeadTooLarge { .. }));
    }

    #[test]
    fn overlong_header_line_fails() {
        let config = EngineConfig::default().with_max_header_line_bytes(16);
        let mut decoder = HeadDecoder::new(&config);
        let mut buf = BytesMut::from("GET / HTTP/1.1\r\nX: aaaaaaaaaaaaaaaaaaaaaaaaaaaa\r\n\r\n");
        let err = decoder.decode(&mut buf).unwrap_err();
        assert!(matches!(err, ParseError::LineTooLong { .. }));
    }
}
