use rece_web::route::{Handlers, handler_fn};
use rece_web::{Chain, Server};

#[tokio::main]
async fn main() {
    let mut chain = Chain::new();
    chain.route("/", Handlers::get(handler_fn(|_, _| "hello world"))).unwrap();

    let server = Server::builder().chain(chain).address("127.0.0.1:3000").build().unwrap();
    if let Err(e) = server.start().await {
        eprintln!("{e}");
    }
}
