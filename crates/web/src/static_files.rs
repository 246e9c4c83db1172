//! Serving files from disk as a chain preprocessor.
//!
//! A [`StaticFiles`] either serves a whole directory, mapping the request path below it,
//! or a single file under one route. Requests it cannot serve fall through to the next link.

use crate::chain::{Flow, Preprocessor};
use crate::request::RequestContext;
use crate::response::ResponseSink;
use async_trait::async_trait;
use http::HeaderValue;
use http::header::CONTENT_TYPE;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

#[derive(Debug, Clone)]
pub struct StaticFiles {
    kind: Kind,
}

#[derive(Debug, Clone)]
enum Kind {
    Dir(PathBuf),
    File { route: String, path: PathBuf },
}

impl StaticFiles {
    /// Serves `<dir>/<request path>`; `/` is served from `<dir>/index.html`.
    pub fn dir(dir: impl Into<PathBuf>) -> Self {
        Self { kind: Kind::Dir(dir.into()) }
    }

    /// Serves the file at `path` for requests to exactly `route`.
    pub fn file(route: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self { kind: Kind::File { route: route.into(), path: path.into() } }
    }

    /// Picks the mode from the pieces: when the last one has an extension, the first piece is
    /// the route and the rest is the file; otherwise all pieces join into a directory.
    ///
    /// Returns `None` for no pieces.
    pub fn new<I, S>(pieces: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pieces = pieces.into_iter().map(|piece| piece.as_ref().to_owned()).collect::<Vec<_>>();
        let last = pieces.last()?;

        if pieces.len() > 1 && Path::new(last).extension().is_some() {
            let path = pieces[1..].iter().collect::<PathBuf>();
            Some(Self::file(pieces[0].clone(), path))
        } else {
            Some(Self::dir(pieces.iter().collect::<PathBuf>()))
        }
    }

    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        match &self.kind {
            Kind::File { route, path } => (route == request_path).then(|| path.clone()),
            Kind::Dir(dir) if request_path == "/" => Some(dir.join("index.html")),
            Kind::Dir(dir) => map_path(dir, request_path),
        }
    }
}

/// Joins `request_path` below `base`, refusing anything that would leave it.
fn map_path(base: &Path, request_path: &str) -> Option<PathBuf> {
    let mut path = base.to_path_buf();
    for component in Path::new(request_path.trim_start_matches('/')).components() {
        match component {
            Component::Normal(segment) => path.push(segment),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
        }
    }
    Some(path)
}

#[async_trait]
impl Preprocessor for StaticFiles {
    async fn process(&self, ctx: &mut RequestContext, resp: &mut ResponseSink) -> Flow {
        if resp.is_finished() {
            return Flow::Continue;
        }
        let Some(path) = self.resolve(&ctx.path) else {
            return Flow::Continue;
        };

        match tokio::fs::metadata(&path).await {
            Ok(metadata) if metadata.is_file() => {}
            _ => {
                trace!(path = %path.display(), "no static file");
                return Flow::Continue;
            }
        }

        let content = match tokio::fs::read(&path).await {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), cause = %e, "can't read static file");
                return Flow::Continue;
            }
        };

        resp.set_header(CONTENT_TYPE, HeaderValue::from_static(content_type(&path)));
        resp.send(content);
        Flow::Stop
    }
}

/// Media type by file extension, `text/plain` when unknown.
pub fn content_type(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|extension| extension.to_str()).unwrap_or_default();

    match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        "json" => "application/json",
        "xml" => "application/xml",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "webp" => "image/webp",
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "eot" => "application/vnd.ms-fontobject",
        "otf" => "font/otf",
        "ttf" => "font/ttf",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "pdf" => "application/pdf",
        _ => "text/plain",
    }
}
