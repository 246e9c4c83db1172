//! Response head encoding.
//!
//! Every response leaves this layer with a Content-Length, except 1xx and 204 responses,
//! which may not carry one. Bodies are buffered, so the length is always known when the
//! head is written.

use crate::protocol::{ResponseHead, SendError};

use bytes::{BufMut, BytesMut};

use http::{HeaderValue, StatusCode, Version, header};
use std::io;
use std::io::{ErrorKind, Write};
use tokio_util::codec::Encoder;
use tracing::error;

/// Initial buffer size allocated for header serialization
const INIT_HEADER_SIZE: usize = 4 * 1024;

/// Serializes a [`ResponseHead`] and the length of the body that will follow it.
#[derive(Debug)]
pub struct HeaderEncoder;

impl Encoder<(ResponseHead, u64)> for HeaderEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, u64), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (mut head, content_length) = item;

        let version = match head.version() {
            Version::HTTP_11 => "HTTP/1.1",
            Version::HTTP_10 => "HTTP/1.0",
            v => {
                error!(http_version = ?v, "unsupported http version");
                return Err(io::Error::from(ErrorKind::Unsupported).into());
            }
        };

        dst.reserve(INIT_HEADER_SIZE);
        let status = head.status();
        write!(BufWriter(dst), "{} {} {}\r\n", version, status.as_str(), status.canonical_reason().unwrap_or(""))?;

        head.headers_mut().remove(header::TRANSFER_ENCODING);
        if status.is_informational() || status == StatusCode::NO_CONTENT {
            head.headers_mut().remove(header::CONTENT_LENGTH);
        } else {
            head.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(content_length));
        }

        for (header_name, header_value) in head.headers() {
            dst.put_slice(header_name.as_ref());
            dst.put_slice(b": ");
            dst.put_slice(header_value.as_ref());
            dst.put_slice(b"\r\n");
        }
        dst.put_slice(b"\r\n");
        Ok(())
    }
}

/// `io::Write` over a `BytesMut`, so the status line can use `write!`.
struct BufWriter<'a>(&'a mut BytesMut);

impl Write for BufWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.put_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
