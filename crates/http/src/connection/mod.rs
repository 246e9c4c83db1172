//! Per-connection request processing.
//!
//! [`HttpConnection`] reads requests off a stream, buffers each body (answering
//! `Expect: 100-continue` first), calls the handler and writes the response back.
//! It keeps going until the peer closes or a request opts out of keep-alive.

mod http_connection;

pub use http_connection::DEFAULT_MAX_BODY_SIZE;
pub use http_connection::HttpConnection;
