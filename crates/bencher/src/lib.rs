//! Fixtures shared by the benchmarks: path matching cases and chains of a given size.

use rece_web::Chain;
use rece_web::route::{Handlers, handler_fn};

#[derive(Debug, Copy, Clone)]
pub struct MatchCase {
    name: &'static str,
    group: CaseGroup,
    spec: &'static str,
    path: &'static str,
}

impl MatchCase {
    pub const fn new(name: &'static str, group: CaseGroup, spec: &'static str, path: &'static str) -> Self {
        Self { name, group, spec, path }
    }

    pub const fn literal(name: &'static str, spec: &'static str, path: &'static str) -> Self {
        Self::new(name, CaseGroup::Literal, spec, path)
    }

    pub const fn pattern(name: &'static str, spec: &'static str, path: &'static str) -> Self {
        Self::new(name, CaseGroup::Pattern, spec, path)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> CaseGroup {
        self.group
    }

    pub fn spec(&self) -> &'static str {
        self.spec
    }

    pub fn path(&self) -> &'static str {
        self.path
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaseGroup {
    Literal,
    Pattern,
}

pub const MATCH_CASES: [MatchCase; 4] = [
    MatchCase::literal("literal_hit", "/api/v1/status", "/api/v1/status"),
    MatchCase::literal("literal_miss", "/api/v1/status", "/api/v1/health"),
    MatchCase::pattern("one_param", "/users/:id", "/users/42"),
    MatchCase::pattern("three_params", "/orgs/:org/repos/:repo/issues/:number", "/orgs/rece/repos/web/issues/1024"),
];

/// A chain of `preprocessors` pass-through preprocessors followed by `routes` GET routes
/// `/route/0/:id` .. `/route/{routes - 1}/:id`.
pub fn chain(preprocessors: usize, routes: usize) -> Chain {
    let mut chain = Chain::new();

    for index in 0..routes {
        let spec = format!("/route/{index}/:id");
        chain
            .route(spec, Handlers::get(handler_fn(move |ctx, _| format!("route {index} {:?}", ctx.param("id")))))
            .unwrap_or_else(|e| panic!("fixture route {index} must compile: {e}"));
    }
    for _ in 0..preprocessors {
        chain.pre(rece_web::chain::pre_fn(|_, _| ()));
    }

    chain
}

/// The request path hitting the last route of [`chain`].
pub fn last_route_path(routes: usize) -> String {
    format!("/route/{}/7", routes.saturating_sub(1))
}
