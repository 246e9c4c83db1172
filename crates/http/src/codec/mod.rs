//! Request decoding and response encoding on top of `tokio_util::codec`.
//!
//! - [`RequestDecoder`]: request head via the `header` module, then the body via the
//!   `body` module (Content-Length or chunked framing)
//! - [`ResponseEncoder`]: response head plus a Content-Length framed body
//!
//! ```no_run
//! use rece_http::codec::{RequestDecoder, ResponseEncoder};
//! use tokio_util::codec::{Decoder, Encoder};
//! use bytes::{Bytes, BytesMut};
//!
//! let mut decoder = RequestDecoder::new();
//! let mut request_buffer = BytesMut::new();
//! let request = decoder.decode(&mut request_buffer);
//!
//! let mut encoder = ResponseEncoder::new();
//! let mut response_buffer = BytesMut::new();
//! let head = http::Response::builder().body(()).unwrap();
//! encoder.encode((head, Bytes::from_static(b"ok")), &mut response_buffer).unwrap();
//! ```

mod body;
mod header;
mod request_decoder;
mod response_encoder;

pub use request_decoder::RequestDecoder;
pub use response_encoder::ResponseEncoder;
