//! Connection-level plumbing: the request loop and the response writer.

mod http_connection;
mod response_writer;

pub use http_connection::HttpConnection;
pub use response_writer::ResponseWriter;
