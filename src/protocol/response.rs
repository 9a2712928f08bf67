//! Response head type.

use http::Response;

/// The head of a response before a body is attached: status, version and
/// headers, carried as `http::Response<()>`. The body framing mode is
/// chosen separately (see [`crate::protocol::BodySize`]) and locked in by
/// the response writer before the first body byte goes out.
pub type ResponseHead = Response<()>;
