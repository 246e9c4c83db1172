use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Body decoder for one request, chosen from the [`PayloadSize`] of its head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadDecoder {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    /// Nothing to read; yields `Eof` straight away.
    Empty,
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(payload_size: PayloadSize) -> Self {
        match payload_size {
            PayloadSize::Length(length) => PayloadDecoder::Length(LengthDecoder::new(length)),
            PayloadSize::Chunked => PayloadDecoder::Chunked(ChunkedDecoder::new()),
            PayloadSize::Empty => PayloadDecoder::Empty,
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self {
            PayloadDecoder::Length(decoder) => decoder.decode(src),
            PayloadDecoder::Chunked(decoder) => decoder.decode(src),
            PayloadDecoder::Empty => Ok(Some(PayloadItem::Eof)),
        }
    }
}
