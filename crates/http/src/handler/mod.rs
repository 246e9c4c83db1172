//! The seam between a connection and whatever produces responses.

use std::error::Error;
use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body::Body;

/// Produces one response per fully buffered request.
///
/// An `Err` is not sent to the client as is: the connection logs it and answers
/// with `500 Internal Server Error`.
#[async_trait]
pub trait Handler: Send + Sync {
    type RespBody: Body<Data = Bytes> + Send;
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error>;
}

/// A [`Handler`] backed by an async function, see [`make_handler`].
pub struct HandlerFn<F> {
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<RespBody, Err, F, Fut> Handler for HandlerFn<F>
where
    RespBody: Body<Data = Bytes> + Send,
    F: Fn(Request<Bytes>) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>> + Send,
{
    type RespBody = RespBody;
    type Error = Err;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        (self.f)(req).await
    }
}

pub fn make_handler<F, RespBody, Err, Fut>(f: F) -> HandlerFn<F>
where
    RespBody: Body<Data = Bytes>,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response<RespBody>, Err>>,
    F: Fn(Request<Bytes>) -> Fut,
{
    HandlerFn { f }
}
