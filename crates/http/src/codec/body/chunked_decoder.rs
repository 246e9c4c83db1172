//! `Transfer-Encoding: chunked` bodies, see
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! Chunk size lines (including extensions) are parsed by `httparse::parse_chunk_size`.
//! Trailer fields are read and dropped. A size line and the whole trailer section are each
//! capped at [`MAX_LINE_BYTES`].

use crate::ensure;
use crate::protocol::{ParseError, PayloadItem};
use bytes::{Buf, BytesMut};
use httparse::Status;
use std::cmp;
use tokio_util::codec::Decoder;
use tracing::trace;

const MAX_LINE_BYTES: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: ChunkedState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkedState {
    /// Expecting a chunk size line
    Size,
    /// Inside chunk data, with this many bytes left
    Body(u64),
    /// Expecting the CRLF that closes chunk data
    BodyCrlf,
    /// After the last chunk, reading trailer lines up to the empty one; holds the trailer
    /// bytes consumed so far
    Trailer(usize),
    /// Body fully read
    End,
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: ChunkedState::Size }
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.state {
                ChunkedState::Size => match httparse::parse_chunk_size(src) {
                    Ok(Status::Complete((consumed, size))) => {
                        src.advance(consumed);
                        trace!(size, "read chunk size");
                        self.state = if size == 0 { ChunkedState::Trailer(0) } else { ChunkedState::Body(size) };
                    }
                    Ok(Status::Partial) => {
                        ensure!(src.len() <= MAX_LINE_BYTES, ParseError::too_large_header(src.len(), MAX_LINE_BYTES));
                        return Ok(None);
                    }
                    Err(_) => return Err(ParseError::invalid_body("invalid chunk size line")),
                },

                ChunkedState::Body(remaining) => {
                    if src.is_empty() {
                        return Ok(None);
                    }

                    let len = cmp::min(remaining, src.len() as u64);
                    #[allow(clippy::cast_possible_truncation, reason = "bounded by src.len()")]
                    let bytes = src.split_to(len as usize).freeze();

                    self.state =
                        if remaining == len { ChunkedState::BodyCrlf } else { ChunkedState::Body(remaining - len) };
                    return Ok(Some(PayloadItem::Chunk(bytes)));
                }

                ChunkedState::BodyCrlf => {
                    if src.len() < 2 {
                        return Ok(None);
                    }
                    if &src[..2] != b"\r\n" {
                        return Err(ParseError::invalid_body("chunk data not terminated by CRLF"));
                    }
                    src.advance(2);
                    self.state = ChunkedState::Size;
                }

                ChunkedState::Trailer(consumed) => {
                    let Some(line_end) = src.windows(2).position(|w| w == b"\r\n") else {
                        let size = consumed + src.len();
                        ensure!(size <= MAX_LINE_BYTES, ParseError::too_large_header(size, MAX_LINE_BYTES));
                        return Ok(None);
                    };

                    let size = consumed + line_end + 2;
                    ensure!(size <= MAX_LINE_BYTES, ParseError::too_large_header(size, MAX_LINE_BYTES));
                    src.advance(line_end + 2);
                    self.state = if line_end == 0 { ChunkedState::End } else { ChunkedState::Trailer(size) };
                }

                ChunkedState::End => return Ok(Some(PayloadItem::Eof)),
            }
        }
    }
}
