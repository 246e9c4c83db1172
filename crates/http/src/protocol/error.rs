use std::io;
use thiserror::Error;

/// Why a connection stopped serving requests.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("can't read request: {source}")]
    Request {
        #[from]
        source: ParseError,
    },

    #[error("can't write response: {source}")]
    Response {
        #[from]
        source: SendError,
    },
}

impl HttpError {
    /// The peer sent more body bytes than the connection accepts.
    pub fn is_body_too_large(&self) -> bool {
        matches!(self, HttpError::Request { source: ParseError::TooLargeBody { .. } })
    }
}

/// A request that can't be decoded. Everything except `Io` is answered with `400`, except
/// an oversized body, which drops the connection.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("request head is {size} bytes, more than {limit}")]
    TooLargeHeader { size: usize, limit: usize },

    #[error("request has more than {limit} headers")]
    TooManyHeaders { limit: usize },

    #[error("request body is at least {size} bytes, more than {limit}")]
    TooLargeBody { size: u64, limit: usize },

    #[error("malformed header: {reason}")]
    InvalidHeader { reason: String },

    #[error("unsupported http version 1.{version:?}")]
    InvalidVersion { version: Option<u8> },

    #[error("malformed method")]
    InvalidMethod,

    #[error("malformed request target")]
    InvalidUri,

    #[error("bad content-length: {reason}")]
    InvalidContentLength { reason: String },

    #[error("malformed body: {reason}")]
    InvalidBody { reason: String },

    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(size: usize, limit: usize) -> Self {
        Self::TooLargeHeader { size, limit }
    }

    pub fn too_many_headers(limit: usize) -> Self {
        Self::TooManyHeaders { limit }
    }

    pub fn too_large_body(size: u64, limit: usize) -> Self {
        Self::TooLargeBody { size, limit }
    }

    pub fn invalid_header(reason: impl ToString) -> Self {
        Self::InvalidHeader { reason: reason.to_string() }
    }

    pub fn invalid_content_length(reason: impl ToString) -> Self {
        Self::InvalidContentLength { reason: reason.to_string() }
    }

    pub fn invalid_body(reason: impl ToString) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn io(e: impl Into<io::Error>) -> Self {
        Self::Io { source: e.into() }
    }
}

/// A response that can't be produced or written.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("can't collect response body: {reason}")]
    InvalidBody { reason: String },

    #[error(transparent)]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn invalid_body(reason: impl ToString) -> Self {
        Self::InvalidBody { reason: reason.to_string() }
    }

    pub fn io(e: impl Into<io::Error>) -> Self {
        Self::Io { source: e.into() }
    }
}
