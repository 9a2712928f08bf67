use bytes::{Buf, Bytes};

/// A decoded (or to-be-encoded) HTTP frame: either a message head or a
/// piece of body payload.
///
/// `T` is the head type, `(RequestHead, BodySize)` on the read side and
/// `(ResponseHead, BodySize)` on the write side. `Data` is the payload
/// chunk type.
pub enum Message<T, Data: Buf = Bytes> {
    Head(T),
    Payload(PayloadItem<Data>),
}

/// One item of a body payload stream: a chunk of data, or the end marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem<Data: Buf = Bytes> {
    Chunk(Data),
    Eof,
}

/// The body framing of a message, derived from its headers.
///
/// `Transfer-Encoding: chunked` takes precedence over `Content-Length`;
/// both present at once is a framing error rather than a silent choice.
/// `UntilClose` is the close-delimited mode: it is never derived for
/// requests, only chosen explicitly for responses.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BodySize {
    /// No body at all.
    Empty,
    /// A body of exactly this many bytes.
    Length(u64),
    /// Chunked transfer encoding.
    Chunked,
    /// Delimited by connection close.
    UntilClose,
}

impl BodySize {
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, BodySize::Empty)
    }

    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, BodySize::Chunked)
    }

    #[inline]
    pub fn is_until_close(&self) -> bool {
        matches!(self, BodySize::UntilClose)
    }
}

impl<T> Message<T> {
    #[inline]
    pub fn is_head(&self) -> bool {
        matches!(self, Message::Head(_))
    }

    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Message::Payload(_))
    }

    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Message::Head(_) => None,
            Message::Payload(item) => Some(item),
        }
    }
}

impl<D: Buf> PayloadItem<D> {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }
}

impl PayloadItem {
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}
