use http::HeaderValue;
use http::header::CONTENT_TYPE;
use rece_web::chain::{Flow, pre_fn};
use rece_web::route::{Handlers, handler_fn};
use rece_web::{Chain, ParamValue, ResponseSink, Server, StaticFiles};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

#[derive(Deserialize)]
struct NewUser {
    name: String,
}

fn user(id: f64) -> serde_json::Value {
    json!({ "id": id, "name": format!("user-{id}") })
}

#[tokio::main]
async fn main() {
    let mut chain = Chain::new();

    // GET only
    chain.route("/", Handlers::get(handler_fn(|_, _| "rece is running"))).unwrap();

    chain
        .route(
            "/users/:id",
            Handlers::map([
                ("get", handler_fn(|ctx, _| ctx.param("id").and_then(ParamValue::as_number).map(user))),
                ("delete", handler_fn(|ctx, _| format!("deleted {:?}", ctx.param("id")))),
            ]),
        )
        .unwrap();

    chain.route("/users", Handlers::none()).unwrap().post(|ctx, resp: &mut ResponseSink| {
        match ctx.body.json::<NewUser>() {
            Ok(new_user) => {
                resp.set_header(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                resp.send(json!({ "created": new_user.name }).to_string());
            }
            Err(e) => {
                resp.set_status(http::StatusCode::BAD_REQUEST).send(e.to_string());
            }
        }
        true
    });

    chain.pre(pre_fn(|ctx, _| {
        info!(method = %ctx.method, path = %ctx.path, "request");
        Flow::Continue
    }));
    chain.serve(StaticFiles::dir("public"));

    let server = Server::builder().chain(chain).address("127.0.0.1:18535").build().unwrap();
    if let Err(e) = server.start().await {
        eprintln!("{e}");
    }
}
