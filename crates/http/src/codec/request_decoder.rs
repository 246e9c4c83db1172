//! Streaming request decoding.
//!
//! ```no_run
//! use rece_http::codec::RequestDecoder;
//! use tokio_util::codec::Decoder;
//! use bytes::BytesMut;
//!
//! let mut decoder = RequestDecoder::new();
//! let mut buffer = BytesMut::from("GET / HTTP/1.1\r\n\r\n");
//! let head = decoder.decode(&mut buffer);
//! ```

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Message, ParseError, PayloadItem, PayloadSize, RequestHeader};
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Decodes a request head, then its body, then the next request head.
///
/// `payload_decoder` is `None` while a head is expected and `Some` while a body is
/// being read. Bodiless requests still yield a single `Eof` payload item, so a reader
/// can always collect "header, chunks, eof".
#[derive(Debug)]
pub struct RequestDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl RequestDecoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for RequestDecoder {
    fn default() -> Self {
        Self { header_decoder: HeaderDecoder, payload_decoder: None }
    }
}

impl Decoder for RequestDecoder {
    type Item = Message<(RequestHeader, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(payload_decoder) = &mut self.payload_decoder {
            let message = match payload_decoder.decode(src)? {
                Some(item @ PayloadItem::Chunk(_)) => Some(Message::Payload(item)),
                Some(PayloadItem::Eof) => {
                    self.payload_decoder = None;
                    Some(Message::Payload(PayloadItem::Eof))
                }
                None => None,
            };

            return Ok(message);
        }

        let message = self.header_decoder.decode(src)?.map(|(header, payload_size)| {
            self.payload_decoder = Some(payload_size.into());
            Message::Header((header, payload_size))
        });

        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use indoc::indoc;

    #[test]
    fn pipelined_requests() {
        let str = indoc! {r##"
        POST /echo HTTP/1.1
        Content-Length: 5

        helloGET /next HTTP/1.1

        "##};

        let mut buffer = BytesMut::from(str);
        let mut decoder = RequestDecoder::new();

        let Some(Message::Header((header, payload_size))) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expect request head");
        };
        assert_eq!(header.method(), &Method::POST);
        assert_eq!(payload_size, PayloadSize::Length(5));

        let Some(Message::Payload(chunk)) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expect body chunk");
        };
        assert_eq!(chunk.as_bytes().unwrap().as_ref(), b"hello");

        let Some(Message::Payload(eof)) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expect eof");
        };
        assert!(eof.is_eof());

        let Some(Message::Header((header, payload_size))) = decoder.decode(&mut buffer).unwrap() else {
            panic!("expect second request head");
        };
        assert_eq!(header.uri().path(), "/next");
        assert!(payload_size.is_empty());
    }

    #[test]
    fn bodiless_request_yields_eof() {
        let mut buffer = BytesMut::from("GET / HTTP/1.1\r\n\r\n");
        let mut decoder = RequestDecoder::new();

        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_header());
        let message = decoder.decode(&mut buffer).unwrap().unwrap();
        assert!(matches!(message, Message::Payload(PayloadItem::Eof)));
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }
}
