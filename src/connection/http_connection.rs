//! The per-connection request loop.

use std::fmt::Display;
use std::io;
use std::sync::Arc;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use http::header::{ALLOW, CONNECTION, EXPECT};
use http::{HeaderValue, Response, StatusCode, Version};
use http_body::Body;
use http_body_util::{BodyExt, Empty};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::config::EngineConfig;
use crate::handler::Handler;
use crate::protocol::{
    BodyReader, BodySize, HttpError, Message, ParseError, ParseErrorKind, PayloadItem, RequestHead, SendError,
};
use crate::router::{RouteOutcome, Router};

/// Drives one HTTP/1.x connection: decodes requests, routes them, hands
/// the head and a lazy [`BodyReader`] to the matched handler, drains
/// whatever body the handler left unread, and frames the response. Requests
/// are served strictly in arrival order; pipelined requests already in the
/// read buffer are decoded without touching the transport.
///
/// The driver owns the two stream halves for its whole life. It never
/// accepts connections; the embedding layer does, and calls
/// [`process`](Self::process) once per connection.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    config: EngineConfig,
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Send + Unpin,
    W: AsyncWrite + Send + Unpin,
{
    pub fn new(config: EngineConfig, reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(&config), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            config,
        }
    }

    pub async fn process<H>(mut self, router: Arc<Router<H>>) -> Result<(), HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        let mut served = 0usize;
        loop {
            match self.next_message().await {
                None => {
                    debug!("peer closed the connection");
                    return Ok(());
                }

                Some(Ok(Message::Head((head, _body_size)))) => {
                    served += 1;
                    match self.serve(router.as_ref(), head, served).await {
                        Ok(true) => {}
                        Ok(false) => {
                            info!(requests = served, "closing the connection");
                            return Ok(());
                        }
                        Err(e) => {
                            self.reject(&e).await;
                            return Err(e);
                        }
                    }
                }

                // the previous request's body is always drained before the
                // loop comes back here
                Some(Ok(Message::Payload(_))) => {
                    error!("payload frame while expecting a request head");
                    let e = ParseError::io(io::Error::other("connection desynchronized")).into();
                    self.reject(&e).await;
                    return Err(e);
                }

                Some(Err(e)) => {
                    error!("failed to decode the next request: {e}");
                    let e = e.into();
                    self.reject(&e).await;
                    return Err(e);
                }
            }
        }
    }

    async fn next_message(&mut self) -> Option<Result<Message<(RequestHead, BodySize)>, ParseError>> {
        match self.config.read_timeout {
            Some(limit) => match timeout(limit, self.framed_read.next()).await {
                Ok(next) => next,
                Err(_) => {
                    Some(Err(ParseError::io(io::Error::new(io::ErrorKind::TimedOut, "request read timed out"))))
                }
            },
            None => self.framed_read.next().await,
        }
    }

    /// Serves one request. Returns whether the connection may be reused.
    async fn serve<H>(&mut self, router: &Router<H>, head: RequestHead, served: usize) -> Result<bool, HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        let reuse = self.config.keep_alive
            && wants_keep_alive(&head)
            && self.config.max_requests_per_connection.map_or(true, |max| served < max);

        if expects_continue(&head) {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            debug!("sent 100 continue");
        }

        match router.route(head.method(), head.path()) {
            RouteOutcome::Matched { value, params } => {
                let mut reader = BodyReader::new(&mut self.framed_read, self.config.spool_threshold_bytes);
                let result = value.call(head, params, &mut reader).await;
                // protocol correctness: whatever the handler left unread
                // must leave the stream before the next request
                reader.drain().await?;
                match result {
                    Ok(response) => self.send_response(response, reuse).await?,
                    Err(e) => {
                        error!("handler failed: {}", e.into());
                        self.send_response(status_response(StatusCode::INTERNAL_SERVER_ERROR), reuse).await?;
                    }
                }
            }

            RouteOutcome::MethodNotAllowed { allowed } => {
                self.drain_request_body().await?;
                let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
                let allow = allowed.iter().map(|m| m.as_str()).collect::<Vec<_>>().join(", ");
                if let Ok(value) = HeaderValue::from_str(&allow) {
                    response.headers_mut().insert(ALLOW, value);
                }
                self.send_response(response, reuse).await?;
            }

            RouteOutcome::NotFound => {
                self.drain_request_body().await?;
                self.send_response(status_response(StatusCode::NOT_FOUND), reuse).await?;
            }
        }

        Ok(reuse)
    }

    async fn drain_request_body(&mut self) -> Result<(), HttpError> {
        let mut reader = BodyReader::new(&mut self.framed_read, self.config.spool_threshold_bytes);
        reader.drain().await
    }

    async fn send_response<B>(&mut self, response: Response<B>, reuse: bool) -> Result<(), HttpError>
    where
        B: Body<Data = Bytes> + Send + Unpin,
        B::Error: Display,
    {
        match self.config.write_timeout {
            Some(limit) => match timeout(limit, self.do_send_response(response, reuse)).await {
                Ok(result) => result,
                Err(_) => {
                    Err(SendError::io(io::Error::new(io::ErrorKind::TimedOut, "response write timed out")).into())
                }
            },
            None => self.do_send_response(response, reuse).await,
        }
    }

    async fn do_send_response<B>(&mut self, response: Response<B>, reuse: bool) -> Result<(), HttpError>
    where
        B: Body<Data = Bytes> + Send + Unpin,
        B::Error: Display,
    {
        let (mut parts, mut body) = response.into_parts();

        // an exact size hint selects fixed-length framing, anything else
        // is chunked
        let body_size = match body.size_hint().exact() {
            Some(0) => BodySize::Empty,
            Some(n) => BodySize::Length(n),
            None => BodySize::Chunked,
        };

        if !reuse {
            parts.headers.insert(CONNECTION, HeaderValue::from_static("close"));
        }

        let head = Response::from_parts(parts, ());
        self.framed_write.feed(Message::<_, Bytes>::Head((head, body_size))).await?;

        loop {
            match body.frame().await {
                Some(Ok(frame)) => match frame.into_data() {
                    Ok(data) => {
                        self.framed_write.feed(Message::Payload(PayloadItem::Chunk(data))).await?;
                    }
                    // trailers have no place in an HTTP/1 response here
                    Err(_frame) => {}
                },
                Some(Err(e)) => {
                    return Err(SendError::invalid_body(format!("response body failed: {e}")).into());
                }
                None => break,
            }
        }

        self.framed_write.send(Message::Payload(PayloadItem::<Bytes>::Eof)).await?;
        Ok(())
    }

    /// Best-effort error response before the connection is torn down. The
    /// write may fail; the connection is closing either way.
    async fn reject(&mut self, error: &HttpError) {
        let status = match error {
            HttpError::Parse { source } => match source.kind() {
                ParseErrorKind::Syntax | ParseErrorKind::Framing => StatusCode::BAD_REQUEST,
                ParseErrorKind::ResourceLimit => StatusCode::REQUEST_HEADER_FIELDS_TOO_LARGE,
                ParseErrorKind::Transport => return,
            },
            _ => return,
        };
        if self.send_response(status_response(status), false).await.is_err() {
            debug!("failed to send the error response before closing");
        }
    }
}

fn status_response(status: StatusCode) -> Response<Empty<Bytes>> {
    Response::builder().status(status).body(Empty::new()).unwrap()
}

fn expects_continue(head: &RequestHead) -> bool {
    head.headers()
        .get(EXPECT)
        .map(|value| value.as_bytes())
        .is_some_and(|value| value.len() >= 4 && value[..4].eq_ignore_ascii_case(b"100-"))
}

/// Protocol default by version, overridden by the `Connection` header.
fn wants_keep_alive(head: &RequestHead) -> bool {
    let default = head.version() == Version::HTTP_11;
    let Some(value) = head.headers().get(CONNECTION).and_then(|v| v.to_str().ok()) else {
        return default;
    };
    let mut tokens = value.split(',').map(|t| t.trim());
    if tokens.clone().any(|t| t.eq_ignore_ascii_case("close")) {
        false
    } else if tokens.any(|t| t.eq_ignore_ascii_case("keep-alive")) {
        true
    } else {
        default
    }
}
