//! Routes: one path plus one handler per HTTP method.
//!
//! ```
//! use rece_web::route::{Handlers, Route, handler_fn};
//!
//! let mut route = Route::new("/users/:id", Handlers::get(handler_fn(|ctx, _resp| format!("user {}", ctx.path))))
//!     .unwrap();
//! route.post(|_ctx, _resp| "created").delete(|_ctx, resp| resp.send("gone"));
//! ```

use crate::path::{IntoPathSpec, PathError, PathSpec};
use crate::request::RequestContext;
use crate::response::ResponseSink;
use bytes::Bytes;
use http::Method;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// The methods a route has a named entry point for.
pub const METHODS: [Method; 9] = [
    Method::GET,
    Method::POST,
    Method::PUT,
    Method::DELETE,
    Method::HEAD,
    Method::OPTIONS,
    Method::CONNECT,
    Method::PATCH,
    Method::TRACE,
];

type HandlerFn = dyn Fn(&mut RequestContext, &mut ResponseSink) -> Reply + Send + Sync;

/// A route handler, cheap to clone and shareable between routes and chains.
#[derive(Clone)]
pub struct Handler {
    f: Arc<HandlerFn>,
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler").finish_non_exhaustive()
    }
}

impl Handler {
    #[inline]
    pub fn call(&self, ctx: &mut RequestContext, resp: &mut ResponseSink) -> Reply {
        (self.f)(ctx, resp)
    }
}

/// Wraps a closure whose return value implements [`IntoReply`].
pub fn handler_fn<F, R>(f: F) -> Handler
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    Handler { f: Arc::new(move |ctx: &mut RequestContext, resp: &mut ResponseSink| f(ctx, resp).into_reply()) }
}

/// What a handler returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The handler took care of the response itself, or wants no body written.
    Handled,
    /// Content to write verbatim before the response is ended.
    Body(Bytes),
}

impl Reply {
    pub fn into_body(self) -> Option<Bytes> {
        match self {
            Reply::Handled => None,
            Reply::Body(bytes) => Some(bytes),
        }
    }
}

pub trait IntoReply {
    fn into_reply(self) -> Reply;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Reply {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Reply {
        Reply::Handled
    }
}

/// Either value means the handler managed the response.
impl IntoReply for bool {
    fn into_reply(self) -> Reply {
        Reply::Handled
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Reply {
        Reply::Body(Bytes::from_static(self.as_bytes()))
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Reply {
        Reply::Body(Bytes::from(self))
    }
}

impl IntoReply for Bytes {
    fn into_reply(self) -> Reply {
        Reply::Body(self)
    }
}

impl IntoReply for Vec<u8> {
    fn into_reply(self) -> Reply {
        Reply::Body(Bytes::from(self))
    }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Reply {
        Reply::Body(Bytes::from(self.to_string()))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Reply {
        self.map_or(Reply::Handled, IntoReply::into_reply)
    }
}

/// The initial handlers of a route.
#[derive(Debug, Default)]
pub struct Handlers {
    entries: Vec<(String, Handler)>,
}

impl Handlers {
    /// No handler at all.
    pub fn none() -> Self {
        Self::default()
    }

    /// A single handler, registered for `GET` only.
    pub fn get(handler: Handler) -> Self {
        Self { entries: vec![(Method::GET.to_string(), handler)] }
    }

    /// Method name to handler. Names must be one of [`METHODS`], spelled all upper or all
    /// lower case; other entries are ignored.
    pub fn map<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Handler)>,
        S: Into<String>,
    {
        Self { entries: entries.into_iter().map(|(name, handler)| (name.into(), handler)).collect() }
    }
}

/// Outcome of [`Route::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunResult {
    NotMatched,
    Handled(Option<Bytes>),
}

impl RunResult {
    pub fn is_handled(&self) -> bool {
        matches!(self, RunResult::Handled(_))
    }
}

/// A path plus at most one handler per method.
#[derive(Clone)]
pub struct Route {
    spec: PathSpec,
    handlers: HashMap<Method, Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut methods = self.handlers.keys().map(Method::as_str).collect::<Vec<_>>();
        methods.sort_unstable();
        f.debug_struct("Route").field("spec", &self.spec).field("methods", &methods).finish()
    }
}

macro_rules! method_entry {
    ($method:ident, $upper_case_method:ident) => {
        #[doc = concat!("Registers `handler` for ", stringify!($upper_case_method), " requests, replacing any previous one.")]
        pub fn $method<F, R>(&mut self, handler: F) -> &mut Self
        where
            F: Fn(&mut RequestContext, &mut ResponseSink) -> R + Send + Sync + 'static,
            R: IntoReply,
        {
            self.insert(Method::$upper_case_method, handler_fn(handler))
        }
    };
}

impl Route {
    pub fn new(spec: impl IntoPathSpec, handlers: Handlers) -> Result<Self, PathError> {
        let mut route = Self { spec: spec.into_path_spec()?, handlers: HashMap::new() };

        for (name, handler) in handlers.entries {
            if is_method_entry(&name) {
                route.handle(&name, handler);
            } else {
                debug!(%name, "ignore handler for unknown method");
            }
        }

        Ok(route)
    }

    pub fn spec(&self) -> &PathSpec {
        &self.spec
    }

    /// Methods with a registered handler, in no particular order.
    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.handlers.keys()
    }

    pub fn handler(&self, method: &Method) -> Option<&Handler> {
        self.handlers.get(method)
    }

    /// Registers `handler` under the upper-cased `method`. The last registration wins.
    ///
    /// A name that is not a valid HTTP method token is ignored.
    pub fn handle(&mut self, method: impl AsRef<str>, handler: Handler) -> &mut Self {
        let name = method.as_ref().to_ascii_uppercase();
        match Method::from_bytes(name.as_bytes()) {
            Ok(method) => self.insert(method, handler),
            Err(e) => {
                warn!(method = %name, cause = %e, "ignore handler for invalid method");
                self
            }
        }
    }

    method_entry!(get, GET);
    method_entry!(post, POST);
    method_entry!(put, PUT);
    method_entry!(delete, DELETE);
    method_entry!(head, HEAD);
    method_entry!(options, OPTIONS);
    method_entry!(connect, CONNECT);
    method_entry!(patch, PATCH);
    method_entry!(trace, TRACE);

    fn insert(&mut self, method: Method, handler: Handler) -> &mut Self {
        if self.handlers.insert(method.clone(), handler).is_some() {
            debug!(%method, spec = %self.spec, "replace route handler");
        }
        self
    }

    /// Runs this route against one request.
    ///
    /// Not matched when the method has no handler, the response is already finished or
    /// the path does not match. Otherwise the captured parameters are merged into
    /// `ctx.params` and the handler is invoked; the route never writes to `resp` itself.
    pub fn run(&self, ctx: &mut RequestContext, resp: &mut ResponseSink) -> RunResult {
        let Some(handler) = self.handlers.get(&ctx.method) else {
            return RunResult::NotMatched;
        };
        if resp.is_finished() {
            return RunResult::NotMatched;
        }
        let Some(params) = self.spec.matches(&ctx.path) else {
            return RunResult::NotMatched;
        };

        ctx.params.merge(params);
        RunResult::Handled(handler.call(ctx, resp).into_body())
    }
}

fn is_method_entry(name: &str) -> bool {
    METHODS.iter().any(|method| {
        let upper = method.as_str();
        name == upper || name == upper.to_ascii_lowercase()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::ParamValue;
    use regex::Regex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn ctx(method: Method, path: &str) -> RequestContext {
        RequestContext::new(method, path)
    }

    fn run(route: &Route, method: Method, path: &str) -> RunResult {
        route.run(&mut ctx(method, path), &mut ResponseSink::new())
    }

    #[test]
    fn single_handler_is_get_only() {
        let route = Route::new("/", Handlers::get(handler_fn(|_, _| "hi"))).unwrap();

        assert_eq!(run(&route, Method::GET, "/"), RunResult::Handled(Some(Bytes::from_static(b"hi"))));
        assert_eq!(run(&route, Method::POST, "/"), RunResult::NotMatched);
        assert_eq!(route.methods().collect::<Vec<_>>(), vec![&Method::GET]);
    }

    #[test]
    fn map_registers_exactly_the_given_methods() {
        let handlers = Handlers::map([
            ("get", handler_fn(|_, _| "g")),
            ("post", handler_fn(|_, _| "p")),
            ("frobnicate", handler_fn(|_, _| "f")),
            ("Put", handler_fn(|_, _| "x")),
        ]);
        let route = Route::new("/", handlers).unwrap();

        let mut methods = route.methods().cloned().collect::<Vec<_>>();
        methods.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(methods, vec![Method::GET, Method::POST]);
        assert_eq!(run(&route, Method::GET, "/"), RunResult::Handled(Some(Bytes::from_static(b"g"))));
        assert_eq!(run(&route, Method::POST, "/"), RunResult::Handled(Some(Bytes::from_static(b"p"))));
    }

    #[test]
    fn both_casings_share_one_key_and_last_wins() {
        let mut route = Route::new("/", Handlers::none()).unwrap();
        route.handle("get", handler_fn(|_, _| "first")).handle("GET", handler_fn(|_, _| "second"));

        assert_eq!(route.methods().count(), 1);
        assert_eq!(run(&route, Method::GET, "/"), RunResult::Handled(Some(Bytes::from_static(b"second"))));

        route.get(|_, _| "third");
        assert_eq!(run(&route, Method::GET, "/"), RunResult::Handled(Some(Bytes::from_static(b"third"))));
    }

    #[test]
    fn extension_methods_go_through_handle() {
        let mut route = Route::new("/cache", Handlers::none()).unwrap();
        route.handle("purge", handler_fn(|_, _| "purged")).handle("bad method", handler_fn(|_, _| ()));

        let purge = Method::from_bytes(b"PURGE").unwrap();
        assert_eq!(run(&route, purge, "/cache"), RunResult::Handled(Some(Bytes::from_static(b"purged"))));
        assert_eq!(route.methods().count(), 1);
    }

    #[test]
    fn literal_path_must_match_exactly() {
        let route = Route::new("/a", Handlers::get(handler_fn(|_, _| true))).unwrap();

        assert_eq!(run(&route, Method::GET, "/a"), RunResult::Handled(None));
        assert_eq!(run(&route, Method::GET, "/a/"), RunResult::NotMatched);
        assert_eq!(run(&route, Method::GET, "/b"), RunResult::NotMatched);
    }

    #[test]
    fn params_are_merged_into_context() {
        let route = Route::new("/test/:myParam/test", Handlers::get(handler_fn(|_, _| ()))).unwrap();
        let mut context = ctx(Method::GET, "/test/5/test");
        context.params.insert("other", ParamValue::Text("kept".to_string()));

        let result = route.run(&mut context, &mut ResponseSink::new());

        assert_eq!(result, RunResult::Handled(None));
        assert_eq!(context.param("myParam"), Some(&ParamValue::Number(5.0)));
        assert_eq!(context.param("other"), Some(&ParamValue::Text("kept".to_string())));
    }

    #[test]
    fn handler_sees_params() {
        let route =
            Route::new("/hello/:name", Handlers::get(handler_fn(|ctx, _| Some(format!("hello {}", ctx.params.get("name")?)))))
                .unwrap();

        assert_eq!(run(&route, Method::GET, "/hello/ann"), RunResult::Handled(Some(Bytes::from("hello ann"))));
    }

    #[test]
    fn finished_response_is_not_matched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let route = Route::new(
            "/",
            Handlers::get(handler_fn(move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })),
        )
        .unwrap();
        let mut resp = ResponseSink::new();
        resp.end();

        assert_eq!(route.run(&mut ctx(Method::GET, "/"), &mut resp), RunResult::NotMatched);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn precompiled_regex_route() {
        let route = Route::new(Regex::new(r"^/assets/").unwrap(), Handlers::get(handler_fn(|_, _| "asset"))).unwrap();

        assert!(run(&route, Method::GET, "/assets/app.js").is_handled());
        assert_eq!(run(&route, Method::GET, "/other"), RunResult::NotMatched);
    }

    #[test]
    fn handler_writing_itself_returns_no_body() {
        let route = Route::new(
            "/",
            Handlers::get(handler_fn(|_, resp: &mut ResponseSink| {
                resp.send("direct");
                true
            })),
        )
        .unwrap();
        let mut resp = ResponseSink::new();

        let result = route.run(&mut ctx(Method::GET, "/"), &mut resp);

        assert_eq!(result, RunResult::Handled(None));
        assert_eq!(resp.body(), b"direct");
        assert!(resp.is_finished());
    }

    #[test]
    fn replies() {
        assert_eq!(().into_reply(), Reply::Handled);
        assert_eq!(false.into_reply(), Reply::Handled);
        assert_eq!(None::<String>.into_reply(), Reply::Handled);
        assert_eq!(Some("x").into_reply(), Reply::Body(Bytes::from_static(b"x")));
        assert_eq!(vec![1u8, 2].into_reply(), Reply::Body(Bytes::from_static(&[1, 2])));
        assert_eq!(serde_json::json!({"ok": true}).into_reply(), Reply::Body(Bytes::from(r#"{"ok":true}"#)));
    }
}
