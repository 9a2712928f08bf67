//! Engine configuration.
//!
//! [`EngineConfig`] collects the limits and timeouts recognized by the
//! protocol engine: header bounds enforced by the head decoder, the spool
//! threshold used by body loading, and the connection driver's keep-alive
//! and timeout policy. The enforcement of timeouts happens in the driver;
//! the values live here so embedders configure everything in one place.

use std::time::Duration;

/// Configuration for the protocol engine and connection driver.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum length of a single header (or request) line, in bytes.
    pub max_header_line_bytes: usize,
    /// Maximum total size of the request head (request line + headers).
    pub max_head_bytes: usize,
    /// Maximum number of headers in a request.
    pub max_headers: usize,
    /// Bodies loaded wholesale spill to a temp file past this many bytes.
    pub spool_threshold_bytes: usize,
    /// Maximum time to wait for request bytes before giving up.
    pub read_timeout: Option<Duration>,
    /// Maximum time to spend writing one response.
    pub write_timeout: Option<Duration>,
    /// Whether persistent connections are allowed at all.
    pub keep_alive: bool,
    /// Upper bound on requests served per connection, if any.
    pub max_requests_per_connection: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_header_line_bytes: 8 * 1024,
            max_head_bytes: 16 * 1024,
            max_headers: 64,
            spool_threshold_bytes: 8 * 1024 * 1024,
            read_timeout: None,
            write_timeout: None,
            keep_alive: true,
            max_requests_per_connection: None,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn with_max_header_line_bytes(mut self, bytes: usize) -> Self {
        self.max_header_line_bytes = bytes;
        self
    }

    pub fn with_max_head_bytes(mut self, bytes: usize) -> Self {
        self.max_head_bytes = bytes;
        self
    }

    pub fn with_max_headers(mut self, count: usize) -> Self {
        self.max_headers = count;
        self
    }

    pub fn with_spool_threshold_bytes(mut self, bytes: usize) -> Self {
        self.spool_threshold_bytes = bytes;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = Some(timeout);
        self
    }

    pub fn with_keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    pub fn with_max_requests_per_connection(mut self, count: usize) -> Self {
        self.max_requests_per_connection = Some(count);
        self
    }
}
