use std::fmt;
use std::fmt::Display;
use std::io;
use std::io::ErrorKind;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use futures::{SinkExt, StreamExt};
use http::{Method, Response, StatusCode};
use http_body::Body;
use http_body_util::BodyExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio_util::codec::{FramedRead, FramedWrite};
use tracing::{debug, error, info};

use crate::codec::{RequestDecoder, ResponseEncoder};
use crate::ensure;
use crate::handler::Handler;
use crate::protocol::{HttpError, Message, ParseError, PayloadItem, PayloadSize, RequestHeader, ResponseHead, SendError};

/// Default cap on a buffered request body, in bytes.
pub const DEFAULT_MAX_BODY_SIZE: usize = 1_000_000;

/// One client connection: reads requests, buffers their bodies, calls the handler and
/// writes responses until the peer goes away or asks to close.
///
/// A body larger than `max_body_size` aborts the connection without a response.
pub struct HttpConnection<R, W> {
    framed_read: FramedRead<R, RequestDecoder>,
    framed_write: FramedWrite<W, ResponseEncoder>,
    max_body_size: usize,
}

impl<R, W> fmt::Debug for HttpConnection<R, W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpConnection").field("max_body_size", &self.max_body_size).finish_non_exhaustive()
    }
}

impl<R, W> HttpConnection<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            framed_read: FramedRead::with_capacity(reader, RequestDecoder::new(), 8 * 1024),
            framed_write: FramedWrite::new(writer, ResponseEncoder::new()),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    #[must_use]
    pub fn with_max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = max_body_size;
        self
    }

    pub async fn process<H>(mut self, handler: Arc<H>) -> Result<(), HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Header((header, payload_size)))) => {
                    let keep_alive = header.keep_alive();
                    self.do_process(header, payload_size, handler.as_ref()).await?;

                    if !keep_alive {
                        info!("request asked to close, connection shutdown");
                        return Ok(());
                    }
                }

                Some(Ok(Message::Payload(_))) => {
                    error!("receive body data while waiting for a request head");
                    self.do_send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(ParseError::invalid_body("need header while receive body").into());
                }

                Some(Err(e)) => {
                    error!("can't receive next request, cause {}", e);
                    self.do_send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                    return Err(e.into());
                }

                None => {
                    info!("cant read more request, break this connection down");
                    return Ok(());
                }
            }
        }
    }

    async fn do_process<H>(
        &mut self,
        header: RequestHeader,
        payload_size: PayloadSize,
        handler: &H,
    ) -> Result<(), HttpError>
    where
        H: Handler,
        <H::RespBody as Body>::Error: Display,
    {
        if let Some(length) = payload_size.declared_length() {
            ensure!(length <= self.max_body_size as u64, ParseError::too_large_body(length, self.max_body_size).into());
        }

        if !payload_size.is_empty() && header.expects_continue() {
            let writer = self.framed_write.get_mut();
            writer.write_all(b"HTTP/1.1 100 Continue\r\n\r\n").await.map_err(SendError::io)?;
            writer.flush().await.map_err(SendError::io)?;
            debug!("receive expect request header, sent continue response");
        }

        let body = match self.read_body().await {
            Ok(body) => body,
            Err(e @ (ParseError::TooLargeBody { .. } | ParseError::Io { .. })) => return Err(e.into()),
            Err(e) => {
                error!("can't receive request body, cause {}", e);
                self.do_send_response(build_error_response(StatusCode::BAD_REQUEST)).await?;
                return Err(e.into());
            }
        };

        let head_only = header.method() == Method::HEAD;
        let response_result = handler.call(header.body(body)).await;
        self.send_response(response_result, head_only).await
    }

    /// Collects the payload items of the current request into one buffer.
    async fn read_body(&mut self) -> Result<Bytes, ParseError> {
        let mut body = BytesMut::new();

        loop {
            match self.framed_read.next().await {
                Some(Ok(Message::Payload(PayloadItem::Chunk(bytes)))) => {
                    let size = body.len() + bytes.len();
                    ensure!(size <= self.max_body_size, ParseError::too_large_body(size as u64, self.max_body_size));
                    body.extend_from_slice(&bytes);
                }
                Some(Ok(Message::Payload(PayloadItem::Eof))) => return Ok(body.freeze()),
                Some(Ok(Message::Header(_))) => {
                    return Err(ParseError::invalid_body("receive request head while reading body"));
                }
                Some(Err(e)) => return Err(e),
                None => return Err(ParseError::io(io::Error::from(ErrorKind::UnexpectedEof))),
            }
        }
    }

    /// Sends the handler's outcome. No body bytes are written for a `HEAD` request
    /// (`head_only`) or a status that can't carry content.
    async fn send_response<B, E>(
        &mut self,
        response_result: Result<Response<B>, E>,
        head_only: bool,
    ) -> Result<(), HttpError>
    where
        B: Body<Data = Bytes>,
        B::Error: Display,
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match response_result {
            Ok(response) => {
                let (parts, body) = response.into_parts();
                let bytes = body
                    .collect()
                    .await
                    .map_err(|e| SendError::invalid_body(format!("resolve response body error: {e}")))?
                    .to_bytes();
                let head = ResponseHead::from_parts(parts, ());

                if head_only || !carries_body(head.status()) {
                    self.framed_write.send((head, bytes.len() as u64)).await?;
                    return Ok(());
                }
                self.do_send_response((head, bytes)).await
            }
            Err(e) => {
                let e: Box<dyn std::error::Error + Send + Sync> = e.into();
                error!("handle response error, cause: {}", e);
                self.do_send_response(build_error_response(StatusCode::INTERNAL_SERVER_ERROR)).await
            }
        }
    }

    async fn do_send_response(&mut self, response: (ResponseHead, Bytes)) -> Result<(), HttpError> {
        self.framed_write.send(response).await?;
        Ok(())
    }
}

fn carries_body(status: StatusCode) -> bool {
    !(status.is_informational() || status == StatusCode::NO_CONTENT || status == StatusCode::NOT_MODIFIED)
}

fn build_error_response(status_code: StatusCode) -> (ResponseHead, Bytes) {
    let mut head = ResponseHead::new(());
    *head.status_mut() = status_code;
    (head, Bytes::new())
}
