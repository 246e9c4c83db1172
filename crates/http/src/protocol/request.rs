//! The request head as produced by the header decoder.

use http::header::{CONNECTION, EXPECT};
use http::{HeaderMap, Method, Request, Uri, Version};

/// A parsed request line plus headers.
///
/// Wraps `http::Request<()>` so the body can be attached once it has been buffered.
#[derive(Debug)]
pub struct RequestHeader {
    inner: Request<()>,
}

impl RequestHeader {
    /// Attaches a body, producing the full request.
    pub fn body<T>(self, body: T) -> Request<T> {
        self.inner.map(|()| body)
    }

    pub fn method(&self) -> &Method {
        self.inner.method()
    }

    pub fn uri(&self) -> &Uri {
        self.inner.uri()
    }

    pub fn version(&self) -> Version {
        self.inner.version()
    }

    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// The client waits for `100 Continue` before sending the body.
    pub fn expects_continue(&self) -> bool {
        self.headers().get(EXPECT).is_some_and(|value| value.as_bytes().eq_ignore_ascii_case(b"100-continue"))
    }

    /// Whether the connection may carry another request after this one.
    ///
    /// HTTP/1.1 defaults to keep-alive unless `Connection: close` is sent; HTTP/1.0
    /// needs an explicit `Connection: keep-alive`.
    pub fn keep_alive(&self) -> bool {
        let connection = self.headers().get(CONNECTION).and_then(|value| value.to_str().ok());
        let has_token = |token: &str| {
            connection.is_some_and(|value| value.split(',').any(|part| part.trim().eq_ignore_ascii_case(token)))
        };

        match self.version() {
            Version::HTTP_10 => has_token("keep-alive"),
            _ => !has_token("close"),
        }
    }
}

impl From<Request<()>> for RequestHeader {
    #[inline]
    fn from(inner: Request<()>) -> Self {
        Self { inner }
    }
}
