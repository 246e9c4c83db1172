//! A small buffered HTTP/1.1 transport.
//!
//! This crate turns a raw byte stream into `http::Request<Bytes>` values, hands each one
//! to a [`handler::Handler`] and writes the returned response back to the stream. The
//! request body is fully buffered before the handler runs. That lets the layer above
//! treat a request as a finished value. It also gives a single place to cap the body.
//!
//! # Example
//!
//! Serving a single handler on every accepted connection:
//!
//! ```no_run
//! use bytes::Bytes;
//! use http::{Request, Response};
//! use http_body_util::Full;
//! use rece_http::connection::HttpConnection;
//! use rece_http::handler::make_handler;
//! use std::convert::Infallible;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! async fn echo(request: Request<Bytes>) -> Result<Response<Full<Bytes>>, Infallible> {
//!     Ok(Response::new(Full::new(request.into_body())))
//! }
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let listener = TcpListener::bind("127.0.0.1:8080").await?;
//!     let handler = Arc::new(make_handler(echo));
//!
//!     loop {
//!         let (stream, _) = listener.accept().await?;
//!         let handler = Arc::clone(&handler);
//!         tokio::spawn(async move {
//!             let (reader, writer) = stream.into_split();
//!             if let Err(e) = HttpConnection::new(reader, writer).process(handler).await {
//!                 tracing::error!(cause = %e, "connection closed");
//!             }
//!         });
//!     }
//! }
//! ```
//!
//! # Modules
//!
//! - [`connection`]: the per-connection request loop
//! - [`codec`]: request decoding and response encoding
//! - [`protocol`]: header, payload and error types
//! - [`handler`]: the trait the connection calls into
//!
//! # Limits
//!
//! - HTTP/1.0 and HTTP/1.1 only, no TLS
//! - at most 64 request headers, 8KB of header bytes
//! - request bodies are capped, 1,000,000 bytes unless configured otherwise

pub mod codec;
pub mod connection;
pub mod handler;
pub mod protocol;

mod utils;
pub(crate) use utils::ensure;
