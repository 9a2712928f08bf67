//! Byte spans and incremental line scanning.
//!
//! The head decoder works on the connection's accumulation buffer without
//! copying: [`LineScanner`] locates line boundaries and hands back [`Span`]s
//! into the buffer, and only once the whole head is present are the spans
//! materialized into owned values (the buffer must not be compacted before
//! that point). Scanning never consumes bytes; repeated calls on an
//! unchanged buffer return the same answer.

use crate::protocol::ParseError;
use crate::utils::ensure;

/// A `(start, end)` byte range into some underlying buffer.
///
/// Spans are plain offsets, not borrows, so they stay cheap to store while
/// the buffer keeps growing. They are only valid against the buffer they
/// were produced from, up to the point it is compacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub(crate) fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    pub(crate) fn slice<'b>(&self, buf: &'b [u8]) -> &'b [u8] {
        &buf[self.start..self.end]
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Shrinks the span from both ends past ASCII whitespace.
    pub(crate) fn trim(mut self, buf: &[u8]) -> Self {
        while self.start < self.end && buf[self.start].is_ascii_whitespace() {
            self.start += 1;
        }
        while self.end > self.start && buf[self.end - 1].is_ascii_whitespace() {
            self.end -= 1;
        }
        self
    }
}

/// One scanned line: the content span (terminator stripped) and the offset
/// of the first byte after the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Line {
    pub content: Span,
    pub next: usize,
}

impl Line {
    pub(crate) fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// Scans a buffer for CRLF- or LF-terminated lines.
///
/// The scanner tracks where the current line begins and advances only when
/// a full line is found, so a caller can iterate lines across a partially
/// received head and simply retry after more bytes arrive.
#[derive(Debug)]
pub(crate) struct LineScanner {
    start: usize,
    max_line_bytes: usize,
}

impl LineScanner {
    pub(crate) fn new(max_line_bytes: usize) -> Self {
        Self { start: 0, max_line_bytes }
    }

    /// Returns the next full line, or `None` when the buffer ends before a
    /// terminator. A line longer than the configured maximum is a protocol
    /// error whether or not its terminator has arrived yet.
    pub(crate) fn next_line(&mut self, buf: &[u8]) -> Result<Option<Line>, ParseError> {
        match buf[self.start..].iter().position(|b| *b == b'\n') {
            Some(i) => {
                let terminator = self.start + i;
                let mut end = terminator;
                if end > self.start && buf[end - 1] == b'\r' {
                    end -= 1;
                }
                ensure!(
                    end - self.start <= self.max_line_bytes,
                    ParseError::line_too_long(end - self.start, self.max_line_bytes)
                );
                let line = Line { content: Span::new(self.start, end), next: terminator + 1 };
                self.start = terminator + 1;
                Ok(Some(line))
            }
            None => {
                ensure!(
                    buf.len() - self.start <= self.max_line_bytes,
                    ParseError::line_too_long(buf.len() - self.start, self.max_line_bytes)
                );
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_crlf_and_lf_lines() {
        let buf = b"GET / HTTP/1.1\r\nHost: a\n\r\nrest";
        let mut scanner = LineScanner::new(1024);

        let line = scanner.next_line(buf).unwrap().unwrap();
        assert_eq!(line.content.slice(buf), b"GET / HTTP/1.1");

        let line = scanner.next_line(buf).unwrap().unwrap();
        assert_eq!(line.content.slice(buf), b"Host: a");

        let line = scanner.next_line(buf).unwrap().unwrap();
        assert!(line.is_empty());
        assert_eq!(&buf[line.next..], b"rest");
    }

    #[test]
    fn needs_more_data_is_idempotent() {
        let buf = b"GET / HT";
        let mut scanner = LineScanner::new(1024);
        assert!(scanner.next_line(buf).unwrap().is_none());
        assert!(scanner.next_line(buf).unwrap().is_none());

        let buf = b"GET / HTTP/1.1\r\n";
        let line = scanner.next_line(buf).unwrap().unwrap();
        assert_eq!(line.content.slice(buf), b"GET / HTTP/1.1");
    }

    #[test]
    fn overlong_line_is_rejected() {
        let mut scanner = LineScanner::new(8);
        // no terminator yet, but already too long to ever fit
        assert!(scanner.next_line(b"123456789").is_err());

        let mut scanner = LineScanner::new(8);
        assert!(scanner.next_line(b"123456789\r\n").is_err());
    }

    #[test]
    fn trims_whitespace() {
        let buf = b"  value \t";
        let span = Span::new(0, buf.len()).trim(buf);
        assert_eq!(span.slice(buf), b"value");
    }
}
