use crate::codec::header::HeaderEncoder;
use crate::protocol::{ResponseHead, SendError};
use bytes::{Bytes, BytesMut};
use tokio_util::codec::Encoder;

/// Writes a complete response: the head via [`HeaderEncoder`], then the buffered body.
#[derive(Debug)]
pub struct ResponseEncoder {
    header_encoder: HeaderEncoder,
}

impl ResponseEncoder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for ResponseEncoder {
    fn default() -> Self {
        Self { header_encoder: HeaderEncoder }
    }
}

impl Encoder<(ResponseHead, Bytes)> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, Bytes), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, body) = item;
        self.header_encoder.encode((head, body.len() as u64), dst)?;
        dst.extend_from_slice(&body);
        Ok(())
    }
}

/// Head only, announcing `content_length` body bytes that are never written. Used for
/// `HEAD` requests and `304 Not Modified`.
impl Encoder<(ResponseHead, u64)> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, u64), dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.header_encoder.encode(item, dst)
    }
}
