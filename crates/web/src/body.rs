//! Request body decoding.
//!
//! The transport hands over the whole body as bytes. A body declared as
//! `application/json` is decoded into a [`serde_json::Value`] before the chain sees it,
//! anything else is kept as is.

use bytes::Bytes;
use http::HeaderMap;
use http::header::CONTENT_TYPE;
use mime::Mime;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use thiserror::Error;

/// The request body as seen by the chain.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Raw(Bytes),
    Json(serde_json::Value),
}

#[derive(Error, Debug)]
pub enum BodyError {
    #[error("malformed json body: {source}")]
    MalformedJson {
        #[from]
        source: serde_json::Error,
    },
}

impl Default for RequestBody {
    fn default() -> Self {
        RequestBody::Raw(Bytes::new())
    }
}

impl RequestBody {
    pub fn is_json(&self) -> bool {
        matches!(self, RequestBody::Json(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RequestBody::Raw(bytes) => bytes.is_empty(),
            RequestBody::Json(_) => false,
        }
    }

    /// The body as text: raw bytes decoded lossily, json re-serialized.
    pub fn text(&self) -> Cow<'_, str> {
        match self {
            RequestBody::Raw(bytes) => String::from_utf8_lossy(bytes),
            RequestBody::Json(value) => Cow::Owned(value.to_string()),
        }
    }

    /// Deserializes the body into `T`, whether it arrived decoded or raw.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, BodyError> {
        let value = match self {
            RequestBody::Raw(bytes) => serde_json::from_slice(bytes)?,
            RequestBody::Json(value) => T::deserialize(value)?,
        };
        Ok(value)
    }
}

/// Decodes `bytes` according to the request's `content-type`.
///
/// Only `application/json` (any parameters, e.g. `charset`) with a non-empty body is decoded.
pub fn decode_body(headers: &HeaderMap, bytes: Bytes) -> Result<RequestBody, BodyError> {
    if bytes.is_empty() || !is_json(headers) {
        return Ok(RequestBody::Raw(bytes));
    }

    let value = serde_json::from_slice(&bytes)?;
    Ok(RequestBody::Json(value))
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Mime>().ok())
        .is_some_and(|mime| mime.essence_str() == mime::APPLICATION_JSON.essence_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde::Deserialize;
    use serde_json::json;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn json_is_decoded() {
        let body = decode_body(&headers("application/json; charset=utf-8"), Bytes::from_static(br#"{"a":1}"#)).unwrap();

        assert_eq!(body, RequestBody::Json(json!({"a": 1})));
    }

    #[test]
    fn other_content_types_stay_raw() {
        let body = decode_body(&headers("text/plain"), Bytes::from_static(br#"{"a":1}"#)).unwrap();
        assert_eq!(body.text(), r#"{"a":1}"#);

        let body = decode_body(&HeaderMap::new(), Bytes::from_static(b"plain")).unwrap();
        assert_eq!(body, RequestBody::Raw(Bytes::from_static(b"plain")));
    }

    #[test]
    fn empty_json_body_stays_raw() {
        let body = decode_body(&headers("application/json"), Bytes::new()).unwrap();

        assert!(body.is_empty());
        assert!(!body.is_json());
    }

    #[test]
    fn malformed_json_is_an_error() {
        let result = decode_body(&headers("application/json"), Bytes::from_static(b"{oops"));

        assert!(matches!(result, Err(BodyError::MalformedJson { .. })));
    }

    #[test]
    fn typed_json() {
        #[derive(Deserialize)]
        struct User {
            name: String,
        }

        let decoded = RequestBody::Json(json!({"name": "zoe"}));
        let raw = RequestBody::Raw(Bytes::from_static(br#"{"name":"ann"}"#));

        assert_eq!(decoded.json::<User>().unwrap().name, "zoe");
        assert_eq!(raw.json::<User>().unwrap().name, "ann");
    }
}
