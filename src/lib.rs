//! An asynchronous HTTP/1.x protocol engine with a route matching tree
//!
//! This crate turns a pair of byte stream halves into routed, typed HTTP
//! exchanges. It is built on top of tokio and keeps a strict separation
//! between protocol logic and I/O: the parsers and serializers are plain
//! state machines over buffered bytes, and `FramedRead`/`FramedWrite` do
//! the feeding.
//!
//! # Features
//!
//! - HTTP/1.0 and HTTP/1.1 request parsing with zero-copy header
//!   materialization
//! - Fixed-length, chunked and close-delimited body framing
//! - Lazy request bodies: handlers read on demand, large bodies spill to
//!   an anonymous temp file
//! - Pattern-based routing with regex constraints, wildcards and proper
//!   404/405 distinction
//! - Keep-alive, pipelining and expect-continue
//! - Configurable parsing limits and timeouts
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use bytes::Bytes;
//! use http::{Method, Response};
//! use http_body_util::Full;
//! use tokio::net::TcpListener;
//! use tracing::error;
//!
//! use lean_http::config::EngineConfig;
//! use lean_http::connection::HttpConnection;
//! use lean_http::handler::Handler;
//! use lean_http::protocol::{BodyReader, HttpError, RequestHead};
//! use lean_http::router::{PathParams, Router};
//!
//! struct Hello;
//!
//! #[async_trait]
//! impl Handler for Hello {
//!     type RespBody = Full<Bytes>;
//!     type Error = HttpError;
//!
//!     async fn call(
//!         &self,
//!         _head: RequestHead,
//!         params: PathParams,
//!         _body: &mut BodyReader<'_>,
//!     ) -> Result<Response<Self::RespBody>, Self::Error> {
//!         let name = params.get("name").unwrap_or("world");
//!         Ok(Response::new(Full::new(Bytes::from(format!("Hello {name}!\r\n")))))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut router = Router::new();
//!     router.register(Method::GET, "/hello/{name}", Hello).unwrap();
//!     let router = Arc::new(router);
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     loop {
//!         let (stream, _remote_addr) = listener.accept().await.unwrap();
//!         let router = router.clone();
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             let connection = HttpConnection::new(EngineConfig::default(), reader, writer);
//!             if let Err(e) = connection.process(router).await {
//!                 error!("connection failed: {e}");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`buffer`]: byte spans and the incremental line scanner
//! - [`codec`]: sans-I/O decoders and encoders for heads and bodies
//! - [`protocol`]: message types, errors, and the lazy [`protocol::BodyReader`]
//! - [`router`]: the route matching tree
//! - [`connection`]: the per-connection request loop and response writer
//! - [`handler`]: the request handler contract
//! - [`config`]: parsing limits, timeouts and keep-alive policy
//!
//! # Limitations
//!
//! - HTTP/1.x only; no HTTP/2 or TLS
//! - The engine never listens or accepts; the embedding layer hands each
//!   connection's stream halves to [`connection::HttpConnection`]

pub mod buffer;
pub mod codec;
pub mod config;
pub mod connection;
pub mod handler;
pub mod protocol;
pub mod router;

mod utils;
