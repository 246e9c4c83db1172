//! Content-Length framed bodies, see
//! [RFC 7230 Section 3.3.2](https://tools.ietf.org/html/rfc7230#section-3.3.2).

use std::cmp;

use crate::protocol::{ParseError, PayloadItem};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Yields chunks until the declared number of bytes has been read, then `Eof`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    /// bytes still to be read
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = cmp::min(self.remaining, src.len() as u64);
        #[allow(clippy::cast_possible_truncation, reason = "bounded by src.len()")]
        let bytes = src.split_to(len as usize).freeze();

        self.remaining -= len;
        Ok(Some(PayloadItem::Chunk(bytes)))
    }
}
