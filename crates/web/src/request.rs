//! Per-request state threaded through the chain.
//!
//! - `RequestContext`: method, path, query, headers, decoded body and path parameters
//! - `PathParams`: path parameters collected by the routes a request passes through

use crate::body::RequestBody;
use crate::path::ParamValue;
use http::{Extensions, HeaderMap, Method};
use std::collections::HashMap;
use std::collections::hash_map;
use tracing::debug;

/// The request as seen by preprocessors and route handlers.
///
/// A context belongs to exactly one traversal of the chain and is never shared
/// between requests. Links may mutate it to hand information to the links after them,
/// either through `params` or through the typed `extensions` map.
#[derive(Debug)]
pub struct RequestContext {
    pub method: Method,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HeaderMap,
    pub body: RequestBody,
    pub params: PathParams,
    pub extensions: Extensions,
}

impl RequestContext {
    /// A context with no query, headers, body or params.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            body: RequestBody::default(),
            params: PathParams::default(),
            extensions: Extensions::new(),
        }
    }

    /// Builds a context from a request target such as `/search?q=rust&page=2`.
    ///
    /// The query string is decoded as `application/x-www-form-urlencoded`; for a repeated
    /// key the last value wins. An undecodable query string leaves the mapping empty.
    pub fn from_target(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (target, None),
        };

        let mut context = Self::new(method, path);
        if let Some(query) = query {
            context.query = parse_query(query);
        }
        context
    }

    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    pub fn param(&self, name: &str) -> Option<&ParamValue> {
        self.params.get(name)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }
}

pub(crate) fn parse_query(query: &str) -> HashMap<String, String> {
    match serde_urlencoded::from_str::<Vec<(String, String)>>(query) {
        Ok(pairs) => pairs.into_iter().collect(),
        Err(e) => {
            debug!(query, cause = %e, "ignore undecodable query string");
            HashMap::new()
        }
    }
}

/// Path parameters, name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PathParams {
    inner: HashMap<String, ParamValue>,
}

impl PathParams {
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.inner.get(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: ParamValue) -> Option<ParamValue> {
        self.inner.insert(name.into(), value)
    }

    /// Overwrites the given keys, leaving every other parameter untouched.
    pub fn merge(&mut self, params: impl IntoIterator<Item = (String, ParamValue)>) {
        self.inner.extend(params);
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn iter(&self) -> hash_map::Iter<'_, String, ParamValue> {
        self.inner.iter()
    }
}

impl<'a> IntoIterator for &'a PathParams {
    type Item = (&'a String, &'a ParamValue);
    type IntoIter = hash_map::Iter<'a, String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
