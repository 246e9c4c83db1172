use bytes::{Bytes, BytesMut};
use http::header::{CONTENT_TYPE, IntoHeaderName};
use http::{HeaderMap, HeaderValue, Response, StatusCode};
use http_body_util::Full;
use tracing::warn;

/// The response under construction for one request.
///
/// Once [`end`](Self::end) has been called the response is finished: further header
/// changes and writes are dropped with a warning, and routes no longer run.
#[derive(Debug)]
pub struct ResponseSink {
    status: StatusCode,
    headers: HeaderMap,
    body: BytesMut,
    finished: bool,
}

impl Default for ResponseSink {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseSink {
    pub fn new() -> Self {
        Self { status: StatusCode::OK, headers: HeaderMap::new(), body: BytesMut::new(), finished: false }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    #[inline]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn set_status(&mut self, status: StatusCode) -> &mut Self {
        if self.finished {
            warn!(%status, "ignore status change on a finished response");
        } else {
            self.status = status;
        }
        self
    }

    pub fn set_header<K: IntoHeaderName>(&mut self, name: K, value: HeaderValue) -> &mut Self {
        if self.finished {
            warn!("ignore header change on a finished response");
        } else {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn write(&mut self, chunk: impl AsRef<[u8]>) -> &mut Self {
        if self.finished {
            warn!("ignore write on a finished response");
        } else {
            self.body.extend_from_slice(chunk.as_ref());
        }
        self
    }

    /// Finishes the response. Ending twice is ignored.
    pub fn end(&mut self) {
        if self.finished {
            warn!("response already finished");
            return;
        }
        self.finished = true;
    }

    /// Writes `chunk` and finishes the response.
    pub fn send(&mut self, chunk: impl AsRef<[u8]>) {
        self.write(chunk);
        self.end();
    }

    /// The default answer for a request no link claimed: `404`, `text/plain`, body `404`.
    ///
    /// Does nothing on a finished response.
    pub fn not_found(&mut self) {
        if self.finished {
            return;
        }

        self.status = StatusCode::NOT_FOUND;
        self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        self.body.clear();
        self.body.extend_from_slice(b"404");
        self.finished = true;
    }

    pub fn into_response(self) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(self.body.freeze()));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
