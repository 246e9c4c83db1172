//! The dispatch chain: an ordered list of preprocessors and routes.
//!
//! For each request the chain walks its links from the first one and stops at the first
//! link that claims the request:
//!
//! - a [`Preprocessor`] claims it by returning [`Flow::Stop`]
//! - a [`Route`] claims it when it matches; a body returned by its handler is written and
//!   the response is ended, otherwise the handler is left in charge of the response
//!
//! When no link claims the request, [`Chain::dispatch`] returns `false` and the caller
//! answers with its default response.
//!
//! ```
//! use rece_web::chain::{Chain, Flow, pre_fn};
//! use rece_web::route::{Handlers, handler_fn};
//!
//! let mut chain = Chain::new();
//! chain.route("/hello/:name", Handlers::get(handler_fn(|ctx, _| format!("hello {:?}", ctx.param("name"))))).unwrap();
//! chain.pre(pre_fn(|ctx, _| {
//!     ctx.headers.remove("x-internal");
//!     Flow::Continue
//! }));
//! ```

use crate::path::{IntoPathSpec, PathError};
use crate::request::RequestContext;
use crate::response::ResponseSink;
use crate::route::{Handlers, Route, RunResult};
use crate::static_files::StaticFiles;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// What a preprocessor decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Move on to the next link.
    Continue,
    /// The request is fully handled, stop the traversal.
    Stop,
}

impl From<bool> for Flow {
    fn from(handled: bool) -> Self {
        if handled { Flow::Stop } else { Flow::Continue }
    }
}

impl From<()> for Flow {
    fn from((): ()) -> Self {
        Flow::Continue
    }
}

/// A link that sees every request reaching it and decides whether the chain goes on.
///
/// It may mutate the context for later links, or answer the request itself. A
/// preprocessor that never resolves stalls its own request and nothing else.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    async fn process(&self, ctx: &mut RequestContext, resp: &mut ResponseSink) -> Flow;
}

/// A [`Preprocessor`] backed by a synchronous closure, see [`pre_fn`].
pub struct PreFn<F> {
    f: F,
}

impl<F> fmt::Debug for PreFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreFn").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, R> Preprocessor for PreFn<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> R + Send + Sync,
    R: Into<Flow>,
{
    async fn process(&self, ctx: &mut RequestContext, resp: &mut ResponseSink) -> Flow {
        (self.f)(ctx, resp).into()
    }
}

/// Adapts a closure returning [`Flow`], `bool` (`true` stops) or `()` (continues).
pub fn pre_fn<F, R>(f: F) -> PreFn<F>
where
    F: Fn(&mut RequestContext, &mut ResponseSink) -> R + Send + Sync,
    R: Into<Flow>,
{
    PreFn { f }
}

/// One element of a [`Chain`]. A route link holds the position of its [`Route`] in
/// [`Chain::routes`].
#[derive(Clone)]
pub enum Link {
    Preprocessor(Arc<dyn Preprocessor>),
    Route(usize),
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Preprocessor(_) => f.write_str("Preprocessor"),
            Link::Route(index) => f.debug_tuple("Route").field(index).finish(),
        }
    }
}

impl Link {
    pub fn is_route(&self) -> bool {
        matches!(self, Link::Route(_))
    }
}

/// Ordered links. Registration happens before serving; a chain handed to the server is
/// no longer mutated.
#[derive(Debug, Clone, Default)]
pub struct Chain {
    links: Vec<Link>,
    routes: Vec<Route>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a route and appends it, returning it for further registration.
    pub fn route(&mut self, spec: impl IntoPathSpec, handlers: Handlers) -> Result<&mut Route, PathError> {
        let route = Route::new(spec, handlers)?;
        Ok(self.mount(route))
    }

    /// Appends an already built route, e.g. one shared with another chain.
    pub fn mount(&mut self, route: Route) -> &mut Route {
        debug!(spec = %route.spec(), index = self.links.len(), "add route");
        let index = self.routes.len();
        self.routes.push(route);
        self.links.push(Link::Route(index));
        &mut self.routes[index]
    }

    /// Inserts `preprocessor` right before the first route currently in the chain, or at the
    /// end when there is none.
    pub fn pre(&mut self, preprocessor: impl Preprocessor + 'static) -> &mut Self {
        self.pre_shared(Arc::new(preprocessor))
    }

    /// Same as [`pre`](Self::pre) for a preprocessor shared with other chains.
    pub fn pre_shared(&mut self, preprocessor: Arc<dyn Preprocessor>) -> &mut Self {
        let index = self.links.iter().position(Link::is_route).unwrap_or(self.links.len());
        debug!(index, "add preprocessor");
        self.links.insert(index, Link::Preprocessor(preprocessor));
        self
    }

    /// Registers a static-file responder as a preprocessor.
    pub fn serve(&mut self, files: StaticFiles) -> &mut Self {
        self.pre(files)
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Registered routes, in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Walks the links in order and reports whether one of them claimed the request.
    ///
    /// A claimed request has its response written by the claiming link. On `false` the
    /// caller must produce the default response.
    pub async fn dispatch(&self, ctx: &mut RequestContext, resp: &mut ResponseSink) -> bool {
        for (index, link) in self.links.iter().enumerate() {
            match link {
                Link::Route(position) => match self.routes[*position].run(ctx, resp) {
                    RunResult::NotMatched => trace!(index, "route not matched"),
                    RunResult::Handled(Some(body)) => {
                        trace!(index, "route replied with a body");
                        resp.write(body);
                        resp.end();
                        return true;
                    }
                    // the handler owns finalization
                    RunResult::Handled(None) => {
                        trace!(index, "route handled request");
                        return true;
                    }
                },

                Link::Preprocessor(preprocessor) => match preprocessor.process(ctx, resp).await {
                    Flow::Continue => trace!(index, "preprocessor continued"),
                    Flow::Stop => {
                        trace!(index, "preprocessor stopped the chain");
                        return true;
                    }
                },
            }
        }

        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::handler_fn;
    use http::Method;
    use std::sync::Mutex;

    fn marker(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>) -> impl Preprocessor + 'static {
        let log = Arc::clone(log);
        pre_fn(move |_, _| log.lock().unwrap().push(name))
    }

    fn kinds(chain: &Chain) -> Vec<&'static str> {
        chain.links().iter().map(|link| if link.is_route() { "route" } else { "pre" }).collect()
    }

    async fn dispatch(chain: &Chain, method: Method, path: &str) -> (bool, ResponseSink) {
        let mut ctx = RequestContext::new(method, path);
        let mut resp = ResponseSink::new();
        let handled = chain.dispatch(&mut ctx, &mut resp).await;
        (handled, resp)
    }

    #[test]
    fn preprocessors_go_before_the_first_route() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Chain::new();

        chain.pre(marker("a", &log));
        assert_eq!(kinds(&chain), vec!["pre"]);

        chain.route("/one", Handlers::none()).unwrap();
        chain.route("/two", Handlers::none()).unwrap();
        chain.pre(marker("b", &log));
        assert_eq!(kinds(&chain), vec!["pre", "pre", "route", "route"]);

        chain.pre(marker("c", &log));
        assert_eq!(kinds(&chain), vec!["pre", "pre", "pre", "route", "route"]);
    }

    #[tokio::test]
    async fn preprocessors_keep_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = Chain::new();
        chain.route("/", Handlers::get(handler_fn(|_, _| "ok"))).unwrap();
        chain.pre(marker("first", &log)).pre(marker("second", &log));

        let (handled, resp) = dispatch(&chain, Method::GET, "/").await;

        assert!(handled);
        assert_eq!(resp.body(), b"ok");
        assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn only_the_matching_route_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (Arc::clone(&log), Arc::clone(&log));
        let mut chain = Chain::new();
        chain
            .route(
                "/r1",
                Handlers::get(handler_fn(move |_, _| {
                    first.lock().unwrap().push("r1");
                })),
            )
            .unwrap();
        chain
            .route(
                "/r2",
                Handlers::get(handler_fn(move |_, _| {
                    second.lock().unwrap().push("r2");
                    "from r2"
                })),
            )
            .unwrap();

        let (handled, resp) = dispatch(&chain, Method::GET, "/r2").await;

        assert!(handled);
        assert!(resp.is_finished());
        assert_eq!(resp.body(), b"from r2");
        assert_eq!(*log.lock().unwrap(), vec!["r2"]);
    }

    #[tokio::test]
    async fn nothing_matches() {
        let mut chain = Chain::new();
        chain.route("/", Handlers::get(handler_fn(|_, _| "root"))).unwrap();

        let (handled, mut resp) = dispatch(&chain, Method::GET, "/missing").await;
        assert!(!handled);
        assert!(!resp.is_finished());

        resp.not_found();
        assert_eq!(resp.status(), http::StatusCode::NOT_FOUND);
        assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "text/plain");
        assert_eq!(resp.body(), b"404");
    }

    #[tokio::test]
    async fn empty_chain_is_unhandled() {
        let (handled, _) = dispatch(&Chain::new(), Method::GET, "/").await;

        assert!(!handled);
    }

    #[tokio::test]
    async fn stopping_preprocessor_skips_the_rest() {
        let mut chain = Chain::new();
        chain.route("/", Handlers::get(handler_fn(|_, _| "route"))).unwrap();
        chain.pre(pre_fn(|_, resp: &mut ResponseSink| {
            resp.send("blocked");
            true
        }));

        let (handled, resp) = dispatch(&chain, Method::GET, "/").await;

        assert!(handled);
        assert_eq!(resp.body(), b"blocked");
    }

    #[tokio::test]
    async fn preprocessor_can_feed_later_links() {
        #[derive(Clone)]
        struct User(&'static str);

        let mut chain = Chain::new();
        chain
            .route(
                "/me",
                Handlers::get(handler_fn(|ctx, _| ctx.extensions.get::<User>().map(|user| user.0.to_string()))),
            )
            .unwrap();
        chain.pre(pre_fn(|ctx: &mut RequestContext, _| {
            ctx.extensions.insert(User("ann"));
        }));

        let (handled, resp) = dispatch(&chain, Method::GET, "/me").await;

        assert!(handled);
        assert_eq!(resp.body(), b"ann");
    }

    #[tokio::test]
    async fn async_preprocessor_is_awaited() {
        struct Delayed;

        #[async_trait]
        impl Preprocessor for Delayed {
            async fn process(&self, ctx: &mut RequestContext, _resp: &mut ResponseSink) -> Flow {
                tokio::task::yield_now().await;
                ctx.query.insert("seen".to_string(), "yes".to_string());
                Flow::Continue
            }
        }

        let mut chain = Chain::new();
        chain.pre(Delayed);
        chain.route("/", Handlers::get(handler_fn(|ctx, _| ctx.query("seen").unwrap_or("no").to_string()))).unwrap();

        let (handled, resp) = dispatch(&chain, Method::GET, "/").await;

        assert!(handled);
        assert_eq!(resp.body(), b"yes");
    }

    #[tokio::test]
    async fn one_route_mounted_on_two_chains() {
        let route = Route::new("/shared/:id", Handlers::get(handler_fn(|ctx, _| format!("{}", ctx.params.len()))))
            .unwrap();
        let mut first = Chain::new();
        let mut second = Chain::new();
        first.mount(route.clone());
        second.route("/other", Handlers::none()).unwrap();
        second.mount(route);

        let (handled_first, resp_first) = dispatch(&first, Method::GET, "/shared/1").await;
        let (handled_second, resp_second) = dispatch(&second, Method::GET, "/shared/2").await;

        assert!(handled_first && handled_second);
        assert_eq!(resp_first.body(), b"1");
        assert_eq!(resp_second.body(), b"1");
    }

    #[tokio::test]
    async fn mount_returns_the_stored_route() {
        let mut chain = Chain::new();
        chain.mount(Route::new("/a", Handlers::none()).unwrap()).get(|_, _| "a");
        chain.pre(pre_fn(|_, _| Flow::Continue));
        chain.route("/b", Handlers::none()).unwrap().post(|_, _| "b");

        assert_eq!(kinds(&chain), vec!["pre", "route", "route"]);
        assert_eq!(chain.routes().len(), 2);
        assert!(chain.routes()[0].handler(&Method::GET).is_some());
        assert!(chain.routes()[1].handler(&Method::POST).is_some());

        let (handled, resp) = dispatch(&chain, Method::POST, "/b").await;
        assert!(handled);
        assert_eq!(resp.body(), b"b");
    }

    #[tokio::test]
    async fn route_after_finished_response_is_skipped() {
        let mut chain = Chain::new();
        chain.route("/", Handlers::get(handler_fn(|_, _| "late"))).unwrap();
        chain.pre(pre_fn(|_, resp: &mut ResponseSink| resp.send("early")));

        let (handled, resp) = dispatch(&chain, Method::GET, "/").await;

        assert!(!handled);
        assert!(resp.is_finished());
        assert_eq!(resp.body(), b"early");
    }

    #[tokio::test]
    async fn boolean_reply_leaves_response_open() {
        let mut chain = Chain::new();
        chain
            .route(
                "/",
                Handlers::get(handler_fn(|_, resp: &mut ResponseSink| {
                    resp.write("partial");
                    true
                })),
            )
            .unwrap();

        let (handled, resp) = dispatch(&chain, Method::GET, "/").await;

        assert!(handled);
        assert!(!resp.is_finished());
        assert_eq!(resp.body(), b"partial");
    }

    #[test]
    fn flow_conversions() {
        assert_eq!(Flow::from(true), Flow::Stop);
        assert_eq!(Flow::from(false), Flow::Continue);
        assert_eq!(Flow::from(()), Flow::Continue);
    }
}
