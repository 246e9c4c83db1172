//! Request head decoding.
//!
//! Parses the request line and headers with `httparse`, enforces the header limits and
//! works out how the body that follows is framed.
//!
//! # Limits
//!
//! - Maximum number of headers: 64
//! - Maximum header size: 8KB
//! - HTTP/1.0 and HTTP/1.1 only

use bytes::{Buf, BytesMut};
use http::{HeaderName, HeaderValue, Request};
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;

use crate::protocol::{ParseError, PayloadSize, RequestHeader};

/// Maximum number of headers allowed in a request
const MAX_HEADER_NUM: usize = 64;

/// Maximum size in bytes allowed for the entire header section
const MAX_HEADER_BYTES: usize = 8 * 1024;

/// Decodes one request head and reports the [`PayloadSize`] of the body behind it.
#[derive(Debug)]
pub struct HeaderDecoder;

impl Decoder for HeaderDecoder {
    type Item = (RequestHeader, PayloadSize);
    type Error = ParseError;

    /// Returns `Ok(None)` until a complete head is buffered. On success the head bytes are
    /// consumed from `src`; any body bytes stay in place for the payload decoder.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut req = httparse::Request::new(&mut headers);

        let status = req.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        })?;

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };

        trace!(header_size = body_offset, "parsed request head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match req.version {
            Some(0) => http::Version::HTTP_10,
            Some(1) => http::Version::HTTP_11,
            _ => return Err(ParseError::InvalidVersion { version: req.version }),
        };

        let mut builder = Request::builder()
            .method(req.method.ok_or(ParseError::InvalidMethod)?)
            .uri(req.path.ok_or(ParseError::InvalidUri)?)
            .version(version);

        if let Some(header_map) = builder.headers_mut() {
            header_map.reserve(req.headers.len());
            for header in req.headers.iter() {
                let name = HeaderName::from_bytes(header.name.as_bytes()).map_err(ParseError::invalid_header)?;
                let value = HeaderValue::from_bytes(header.value).map_err(ParseError::invalid_header)?;
                header_map.append(name, value);
            }
        }

        let header = RequestHeader::from(builder.body(()).map_err(|e| match e {
            e if e.is::<http::method::InvalidMethod>() => ParseError::InvalidMethod,
            e if e.is::<http::uri::InvalidUri>() => ParseError::InvalidUri,
            e => ParseError::invalid_header(e),
        })?);

        src.advance(body_offset);

        let payload_size = parse_payload(&header)?;
        Ok(Some((header, payload_size)))
    }
}

/// Works out the body framing from Content-Length and Transfer-Encoding, for every method.
///
/// See <https://www.rfc-editor.org/rfc/rfc9112.html#name-message-body-length>. Both headers
/// at once, or a transfer coding that doesn't end in `chunked`, is rejected rather than
/// guessed at.
fn parse_payload(header: &RequestHeader) -> Result<PayloadSize, ParseError> {
    let transfer_encoding = header.headers().get(http::header::TRANSFER_ENCODING);
    let content_length = header.headers().get(http::header::CONTENT_LENGTH);

    match (transfer_encoding, content_length) {
        (None, None) => Ok(PayloadSize::Empty),
        (Some(_), Some(_)) => Err(ParseError::invalid_content_length("sent together with transfer-encoding")),
        (Some(value), None) if is_chunked(value) => Ok(PayloadSize::Chunked),
        (Some(_), None) => Err(ParseError::invalid_header("transfer-encoding must end with chunked")),
        (None, Some(value)) => {
            let length = value
                .to_str()
                .ok()
                .and_then(|text| text.trim().parse::<u64>().ok())
                .ok_or_else(|| ParseError::invalid_content_length(format!("{value:?} is not a length")))?;
            Ok(PayloadSize::Length(length))
        }
    }
}

/// `chunked` must be the last coding listed for the body to be chunk framed.
fn is_chunked(header_value: &HeaderValue) -> bool {
    header_value
        .as_bytes()
        .rsplit(|b| *b == b',')
        .next()
        .is_some_and(|last| last.trim_ascii().eq_ignore_ascii_case(b"chunked"))
}
