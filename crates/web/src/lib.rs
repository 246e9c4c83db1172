//! An ordered dispatch chain of preprocessors and routes, served over HTTP/1.1.
//!
//! Every request walks the [`Chain`] from its first link. Preprocessors see each request
//! that reaches them and either let it continue or stop the chain; routes claim the
//! requests whose method and path they match. A request nobody claims gets a plain
//! `404`.
//!
//! ```no_run
//! use rece_web::chain::{Flow, pre_fn};
//! use rece_web::route::{Handlers, handler_fn};
//! use rece_web::{Chain, Server, StaticFiles};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut chain = Chain::new();
//!     chain.route("/hello/:name", Handlers::get(handler_fn(|ctx, _| format!("hello {:?}", ctx.param("name")))))
//!         .unwrap()
//!         .post(|ctx, _| ctx.body.text().into_owned());
//!     chain.pre(pre_fn(|ctx, _| {
//!         tracing::info!(path = %ctx.path, "incoming");
//!         Flow::Continue
//!     }));
//!     chain.serve(StaticFiles::dir("public"));
//!
//!     let server = Server::builder().chain(chain).port(8080).build().unwrap();
//!     server.start().await.unwrap();
//! }
//! ```

pub mod body;
pub mod chain;
mod config;
pub mod path;
pub mod request;
pub mod response;
pub mod route;
mod server;
pub mod static_files;

pub use body::RequestBody;
pub use chain::Chain;
pub use chain::Flow;
pub use chain::Preprocessor;
pub use config::ServerConfig;
pub use path::ParamValue;
pub use path::PathSpec;
pub use request::PathParams;
pub use request::RequestContext;
pub use response::ResponseSink;
pub use route::Route;
pub use route::handler_fn;
pub use server::Server;
pub use server::ServerBuildError;
pub use server::ServerBuilder;
pub use server::ServerError;
pub use static_files::StaticFiles;
