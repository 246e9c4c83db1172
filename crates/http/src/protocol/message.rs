use bytes::Bytes;

/// One item produced by the request decoder.
///
/// Every request yields one `Header`, then its body as zero or more `Payload` chunks,
/// then a final `Payload(PayloadItem::Eof)`, bodiless requests included.
#[derive(Debug)]
pub enum Message<T> {
    Header(T),
    Payload(PayloadItem),
}

impl<T> Message<T> {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Message::Header(_))
    }
}

/// A piece of request body, or the end of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    Eof,
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// Body framing announced by the request head.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length: n`
    Length(u64),
    /// `Transfer-Encoding: chunked`, length unknown until the last chunk
    Chunked,
    Empty,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    /// No body bytes will follow the head.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty | PayloadSize::Length(0))
    }

    /// The length announced up front; chunked bodies only reveal theirs while being read.
    #[inline]
    pub fn declared_length(&self) -> Option<u64> {
        match self {
            PayloadSize::Length(length) => Some(*length),
            PayloadSize::Chunked | PayloadSize::Empty => None,
        }
    }
}
