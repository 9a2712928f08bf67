use std::io;
use thiserror::Error;

/// Top-level error for a connection.
///
/// Everything below the connection driver propagates upward unchanged; the
/// driver is the only recovery boundary (it closes the connection and drops
/// any spool). The embedding layer can inspect the variant to decide on a
/// best-effort status code before closing.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("request error: {source}")]
    Parse {
        #[from]
        source: ParseError,
    },

    #[error("response error: {source}")]
    Send {
        #[from]
        source: SendError,
    },

    #[error("usage error: {source}")]
    Usage {
        #[from]
        source: UsageError,
    },
}

/// Coarse classification of a [`ParseError`], used by embedders to pick a
/// wire status (400, 431, ...) without matching on individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Malformed request line, header line or version.
    Syntax,
    /// A configured bound was exceeded.
    ResourceLimit,
    /// The byte stream can no longer be trusted to be request-aligned.
    Framing,
    /// The underlying transport failed or timed out.
    Transport,
}

/// Errors produced while parsing a request head or body.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("invalid request line: {reason}")]
    InvalidRequestLine { reason: String },

    #[error("unsupported http version: {version}")]
    UnsupportedVersion { version: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("header line too long, current: {current} exceeds the limit {max}")]
    LineTooLong { current: usize, max: usize },

    #[error("header section too large, current: {current} exceeds the limit {max}")]
    HeadTooLarge { current: usize, max: usize },

    #[error("header number exceeds the limit {max}")]
    TooManyHeaders { max: usize },

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("conflicting body framing: transfer-encoding and content-length both present")]
    ConflictingFraming,

    #[error("invalid chunked encoding: {reason}")]
    InvalidChunk { reason: String },

    #[error("body truncated: connection closed before the body terminator")]
    TruncatedBody,

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            Self::InvalidRequestLine { .. } | Self::UnsupportedVersion { .. } | Self::InvalidHeader { .. } => {
                ParseErrorKind::Syntax
            }
            Self::LineTooLong { .. } | Self::HeadTooLarge { .. } | Self::TooManyHeaders { .. } => {
                ParseErrorKind::ResourceLimit
            }
            Self::InvalidContentLength { .. }
            | Self::ConflictingFraming
            | Self::InvalidChunk { .. }
            | Self::TruncatedBody => ParseErrorKind::Framing,
            Self::Io { .. } => ParseErrorKind::Transport,
        }
    }

    pub fn invalid_request_line<S: ToString>(reason: S) -> Self {
        Self::InvalidRequestLine { reason: reason.to_string() }
    }

    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedVersion { version: version.to_string() }
    }

    pub fn invalid_header<S: ToString>(reason: S) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn line_too_long(current: usize, max: usize) -> Self {
        Self::LineTooLong { current, max }
    }

    pub fn head_too_large(current: usize, max: usize) -> Self {
        Self::HeadTooLarge { current, max }
    }

    pub fn too_many_headers(max: usize) -> Self {
        Self::TooManyHeaders { max }
    }

    pub fn invalid_content_length<S: ToString>(reason: S) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn invalid_chunk<S: ToString>(reason: S) -> Self {
        Self::InvalidChunk { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors produced while framing and sending a response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("framing mismatch: wrote {written} bytes of a declared {declared}")]
    FramingMismatch { written: u64, declared: u64 },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn framing_mismatch(written: u64, declared: u64) -> Self {
        Self::FramingMismatch { written, declared }
    }

    pub fn invalid_body<S: ToString>(reason: S) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Programming errors in the calling layer.
///
/// These are reported immediately and never corrupt connection or router
/// state; the offending call simply has no effect.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsageError {
    #[error("body is already being streamed, load() is no longer available")]
    LoadAfterRead,

    #[error("response head has not been written yet")]
    HeadNotWritten,

    #[error("response head has already been written")]
    HeadAlreadyWritten,

    #[error("response is already finished")]
    ResponseFinished,
}
