//! The request handler contract.
//!
//! A handler receives the parsed head, the parameters captured by the
//! route match, and a [`BodyReader`] borrowing the connection. The body is
//! read on demand: a handler that never touches it costs nothing, and the
//! connection driver drains whatever is left before the next request.

use std::error::Error;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use http::Response;
use http_body::Body;

use crate::protocol::{BodyReader, RequestHead};
use crate::router::PathParams;

#[async_trait]
pub trait Handler: Send + Sync {
    type RespBody: Body<Data = Bytes> + Send + Unpin;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(
        &self,
        head: RequestHead,
        params: PathParams,
        body: &mut BodyReader<'_>,
    ) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// Adapter turning a boxed-future closure into a [`Handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<RespBody, Err, F> Handler for HandlerFn<F>
where
    RespBody: Body<Data = Bytes> + Send + Unpin,
    Err: Into<Box<dyn Error + Send + Sync>>,
    F: for<'a, 'b> Fn(
            RequestHead,
            PathParams,
            &'a mut BodyReader<'b>,
        ) -> BoxFuture<'a, Result<Response<RespBody>, Err>>
        + Send
        + Sync,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(
        &self,
        head: RequestHead,
        params: PathParams,
        body: &mut BodyReader<'_>,
    ) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(head, params, body).await
    }
}

pub fn make_handler<RespBody, Err, F>(f: F) -> HandlerFn<F>
where
    RespBody: Body<Data = Bytes> + Send + Unpin,
    Err: Into<Box<dyn Error + Send + Sync>>,
    F: for<'a, 'b> Fn(
            RequestHead,
            PathParams,
            &'a mut BodyReader<'b>,
        ) -> BoxFuture<'a, Result<Response<RespBody>, Err>>
        + Send
        + Sync,
{
    HandlerFn { f }
}
