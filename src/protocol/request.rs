//! Parsed request head.

use http::request::Parts;
use http::{HeaderMap, Method, Request, Uri, Version};

/// The fully parsed head of a request: method, target, version and the
/// ordered header multimap. Immutable once parsing completes.
///
/// Header names are matched case-insensitively and duplicates are kept in
/// arrival order (`http::HeaderMap` append semantics), which multi-value
/// headers such as `Set-Cookie` rely on.
#[derive(Debug)]
pub struct RequestHead {
    inner: Request<()>,
}

impl RequestHead {
    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    /// The path component of the request target.
    pub fn path(&self) -> &str {
        self.inner.uri().path()
    }

    /// The query string, without the leading `?`.
    pub fn query(&self) -> Option<&str> {
        self.inner.uri().query()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    pub fn into_inner(self) -> Request<()> {
        self.inner
    }

    /// Attaches a body value, turning the head into a full `Request<T>`.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|_| body)
    }
}

impl AsRef<Request<()>> for RequestHead {
    fn as_ref(&self) -> &Request<()> {
        &self.inner
    }
}

impl From<Parts> for RequestHead {
    #[inline]
    fn from(parts: Parts) -> Self {
        Self { inner: Request::from_parts(parts, ()) }
    }
}

impl From<Request<()>> for RequestHead {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
