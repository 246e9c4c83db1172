//! Path matching for routes.
//!
//! A route path is either a literal, matched byte for byte against the request path, or a
//! pattern with `:name` segments, each capturing the text at that position:
//!
//! ```
//! use rece_web::path::{ParamValue, PathSpec};
//!
//! let spec = PathSpec::parse("/users/:id/posts/:slug").unwrap();
//! let params = spec.matches("/users/42/posts/hello").unwrap();
//!
//! assert_eq!(params[0], ("id".to_string(), ParamValue::Number(42.0)));
//! assert_eq!(params[1], ("slug".to_string(), ParamValue::Text("hello".to_string())));
//! ```

use regex::Regex;
use std::fmt;
use thiserror::Error;

/// Prefix that turns a path segment into a named parameter.
pub const PARAM_MARKER: char = ':';

/// A compiled route path.
#[derive(Debug, Clone)]
pub enum PathSpec {
    /// Matches exactly this path, no trailing slash or prefix equivalence.
    Literal(String),
    /// Segment-wise pattern with named captures.
    Pattern(PathPattern),
}

/// A regex plus the parameter names bound to its capture groups, in declaration order.
///
/// Pre-compiled regexes (see `From<Regex>`) carry no names and are only tested with `is_match`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    names: Vec<String>,
}

#[derive(Error, Debug)]
pub enum PathError {
    #[error("duplicate path parameter '{name}' in '{spec}'")]
    DuplicateParam { name: String, spec: String },

    #[error("empty path parameter name in '{spec}'")]
    EmptyParam { spec: String },

    #[error("invalid path pattern '{spec}': {source}")]
    InvalidPattern { spec: String, source: regex::Error },
}

impl PathSpec {
    /// Compiles `spec`. Without any `:` segment the spec stays a literal.
    pub fn parse(spec: &str) -> Result<Self, PathError> {
        if !spec.split('/').any(|segment| segment.starts_with(PARAM_MARKER)) {
            return Ok(PathSpec::Literal(spec.to_owned()));
        }

        let mut names: Vec<String> = Vec::new();
        let mut pieces = Vec::new();

        for segment in spec.split('/') {
            let Some(name) = segment.strip_prefix(PARAM_MARKER) else {
                pieces.push(regex::escape(segment));
                continue;
            };

            if name.is_empty() {
                return Err(PathError::EmptyParam { spec: spec.to_owned() });
            }
            if names.iter().any(|existing| existing == name) {
                return Err(PathError::DuplicateParam { name: name.to_owned(), spec: spec.to_owned() });
            }

            names.push(name.to_owned());
            pieces.push("(.+)".to_owned());
        }

        let pattern = format!("^{}$", pieces.join("/"));
        let regex =
            Regex::new(&pattern).map_err(|source| PathError::InvalidPattern { spec: spec.to_owned(), source })?;

        Ok(PathSpec::Pattern(PathPattern { regex, names }))
    }

    /// Tests `path` and returns the captured parameters in declaration order.
    ///
    /// `None` means no match. A literal match, or a match against a pre-compiled regex,
    /// yields an empty list.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, ParamValue)>> {
        match self {
            PathSpec::Literal(literal) => (literal == path).then(Vec::new),
            PathSpec::Pattern(pattern) => pattern.captures(path),
        }
    }

    /// Names of the declared parameters, empty for literals and pre-compiled regexes.
    pub fn param_names(&self) -> &[String] {
        match self {
            PathSpec::Literal(_) => &[],
            PathSpec::Pattern(pattern) => &pattern.names,
        }
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, PathSpec::Literal(_))
    }
}

impl PathPattern {
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    fn captures(&self, path: &str) -> Option<Vec<(String, ParamValue)>> {
        if self.names.is_empty() {
            return self.regex.is_match(path).then(Vec::new);
        }

        let captures = self.regex.captures(path)?;
        let params = self
            .names
            .iter()
            .enumerate()
            .map(|(index, name)| {
                let text = captures.get(index + 1).map_or("", |m| m.as_str());
                (name.clone(), ParamValue::coerce(text))
            })
            .collect();

        Some(params)
    }
}

impl From<Regex> for PathSpec {
    fn from(regex: Regex) -> Self {
        PathSpec::Pattern(PathPattern { regex, names: Vec::new() })
    }
}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSpec::Literal(literal) => f.write_str(literal),
            PathSpec::Pattern(pattern) => f.write_str(pattern.regex.as_str()),
        }
    }
}

/// Anything a route can be registered with.
pub trait IntoPathSpec {
    fn into_path_spec(self) -> Result<PathSpec, PathError>;
}

impl IntoPathSpec for PathSpec {
    fn into_path_spec(self) -> Result<PathSpec, PathError> {
        Ok(self)
    }
}

impl IntoPathSpec for &str {
    fn into_path_spec(self) -> Result<PathSpec, PathError> {
        PathSpec::parse(self)
    }
}

impl IntoPathSpec for String {
    fn into_path_spec(self) -> Result<PathSpec, PathError> {
        PathSpec::parse(&self)
    }
}

impl IntoPathSpec for &String {
    fn into_path_spec(self) -> Result<PathSpec, PathError> {
        PathSpec::parse(self)
    }
}

impl IntoPathSpec for Regex {
    fn into_path_spec(self) -> Result<PathSpec, PathError> {
        Ok(self.into())
    }
}

/// A captured path parameter: numeric when the captured text is a finite number.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Number(f64),
    Text(String),
}

impl ParamValue {
    pub fn coerce(text: &str) -> Self {
        match text.parse::<f64>() {
            Ok(number) if number.is_finite() => ParamValue::Number(number),
            _ => ParamValue::Text(text.to_owned()),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            ParamValue::Number(number) => Some(*number),
            ParamValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Number(_) => None,
            ParamValue::Text(text) => Some(text),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Number(number) => write!(f, "{number}"),
            ParamValue::Text(text) => f.write_str(text),
        }
    }
}
