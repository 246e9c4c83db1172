use crate::body::decode_body;
use crate::chain::Chain;
use crate::config::ServerConfig;
use crate::request::{RequestContext, parse_query};
use crate::response::ResponseSink;
use async_trait::async_trait;
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::Full;
use rece_http::connection::HttpConnection;
use rece_http::handler::Handler;
use std::error::Error;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Debug, Default)]
pub struct ServerBuilder {
    chain: Option<Chain>,
    config: ServerConfig,
    address: Option<Result<SocketAddr, ServerBuildError>>,
    port: Option<u16>,
    max_body_size: Option<usize>,
}

impl ServerBuilder {
    fn new() -> Self {
        Self::default()
    }

    pub fn chain(mut self, chain: Chain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Base settings; `address`, `port` and `max_body_size` override single fields.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Listen address, resolved now. The first resolved address is used.
    pub fn address<A: ToSocketAddrs>(mut self, address: A) -> Self {
        let resolved = address
            .to_socket_addrs()
            .map_err(|source| ServerBuildError::InvalidAddress { source })
            .and_then(|mut addresses| addresses.next().ok_or(ServerBuildError::NoAddress));
        self.address = Some(resolved);
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn max_body_size(mut self, max_body_size: usize) -> Self {
        self.max_body_size = Some(max_body_size);
        self
    }

    pub fn build(self) -> Result<Server, ServerBuildError> {
        let chain = self.chain.ok_or(ServerBuildError::MissingChain)?;

        let mut config = self.config;
        if let Some(address) = self.address {
            config.address = address?;
        }
        if let Some(port) = self.port {
            config.address.set_port(port);
        }
        if let Some(max_body_size) = self.max_body_size {
            config.max_body_size = max_body_size;
        }

        Ok(Server { chain, config })
    }
}

#[derive(Error, Debug)]
pub enum ServerBuildError {
    #[error("chain must be set")]
    MissingChain,
    #[error("invalid address: {source}")]
    InvalidAddress { source: io::Error },
    #[error("address resolved to nothing")]
    NoAddress,
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("can't bind {address}: {source}")]
    Bind { address: SocketAddr, source: io::Error },
}

/// Serves one [`Chain`] over HTTP/1.1.
///
/// Each connection runs in its own task; every request gets a fresh context and response
/// and walks the shared chain, which is read only from here on.
#[derive(Debug)]
pub struct Server {
    chain: Chain,
    config: ServerConfig,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub async fn start(self) -> Result<(), ServerError> {
        let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
        if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
            warn!(cause = %e, "keep the already installed subscriber");
        }

        let address = self.config.address;
        let tcp_listener =
            TcpListener::bind(address).await.map_err(|source| ServerError::Bind { address, source })?;
        info!("start listening at {}", address);

        self.serve(tcp_listener).await
    }

    /// Accepts connections on an already bound listener until the task is dropped.
    pub async fn serve(self, tcp_listener: TcpListener) -> Result<(), ServerError> {
        let max_body_size = self.config.max_body_size;
        let handler = Arc::new(self);

        loop {
            let (tcp_stream, remote_addr) = match tcp_listener.accept().await {
                Ok(stream_and_addr) => stream_and_addr,
                Err(e) => {
                    warn!(cause = %e, "failed to accept");
                    continue;
                }
            };

            let handler = Arc::clone(&handler);

            tokio::spawn(async move {
                let (reader, writer) = tcp_stream.into_split();
                let connection = HttpConnection::new(reader, writer).with_max_body_size(max_body_size);
                match connection.process(handler).await {
                    Ok(()) => {
                        info!(%remote_addr, "finished process, connection shutdown");
                    }
                    Err(e) => {
                        error!(%remote_addr, "service has error, cause {}, connection shutdown", e);
                    }
                }
            });
        }
    }

    /// Runs the chain for one request and produces the response to send.
    pub async fn respond(&self, mut ctx: RequestContext) -> ResponseSink {
        let mut resp = ResponseSink::new();

        if !self.chain.dispatch(&mut ctx, &mut resp).await {
            debug!(method = %ctx.method, path = %ctx.path, "no link claimed the request");
            resp.not_found();
        } else if !resp.is_finished() {
            warn!(method = %ctx.method, path = %ctx.path, "request claimed but the response was never ended");
        }

        resp
    }
}

#[async_trait]
impl Handler for Server {
    type RespBody = Full<Bytes>;
    type Error = Box<dyn Error + Send + Sync>;

    async fn call(&self, req: Request<Bytes>) -> Result<Response<Self::RespBody>, Self::Error> {
        let (parts, body) = req.into_parts();
        let body = decode_body(&parts.headers, body)?;

        let mut ctx = RequestContext::new(parts.method, parts.uri.path()).with_headers(parts.headers).with_body(body);
        if let Some(query) = parts.uri.query() {
            ctx.query = parse_query(query);
        }

        Ok(self.respond(ctx).await.into_response())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::pre_fn;
    use crate::route::{Handlers, handler_fn};
    use http::StatusCode;
    use http::header::CONTENT_TYPE;
    use indoc::indoc;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn chain() -> Chain {
        let mut chain = Chain::new();
        chain.route("/hello/:name", Handlers::get(handler_fn(|ctx, _| Some(format!("hello {}", ctx.param("name")?))))).unwrap();
        chain
            .route("/echo", Handlers::none())
            .unwrap()
            .post(|ctx, _| ctx.body.json::<serde_json::Value>().ok().map(|value| json!({ "got": value })));
        chain.route("/search", Handlers::get(handler_fn(|ctx, _| ctx.query("q").unwrap_or("none").to_string()))).unwrap();
        chain
    }

    fn server(chain: Chain) -> Server {
        Server::builder().chain(chain).build().unwrap()
    }

    async fn exchange(server: Server, input: &str) -> String {
        let mut output = Vec::new();
        HttpConnection::new(input.as_bytes(), &mut output).process(Arc::new(server)).await.unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn builder_needs_a_chain() {
        assert!(matches!(Server::builder().build(), Err(ServerBuildError::MissingChain)));
    }

    #[test]
    fn builder_overrides_config_fields() {
        let server = Server::builder()
            .chain(Chain::new())
            .config(ServerConfig::from_json(r#"{ "max_body_size": 10 }"#).unwrap())
            .address("127.0.0.1:9000")
            .port(9001)
            .build()
            .unwrap();

        assert_eq!(server.config().address.to_string(), "127.0.0.1:9001");
        assert_eq!(server.config().max_body_size, 10);
    }

    #[tokio::test]
    async fn path_params_and_query() {
        let output = exchange(server(chain()), "GET /hello/ann HTTP/1.1\r\n\r\nGET /search?q=rust HTTP/1.1\r\n\r\n").await;

        assert!(output.contains("\r\n\r\nhello ann"));
        assert!(output.ends_with("\r\n\r\nrust"));
    }

    #[tokio::test]
    async fn json_body_is_decoded_before_the_chain() {
        let input = indoc! {r#"
            POST /echo HTTP/1.1
            Content-Type: application/json
            Content-Length: 7

            {"a":1}"#};

        let output = exchange(server(chain()), input).await;

        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with(r#"{"got":{"a":1}}"#));
    }

    #[tokio::test]
    async fn malformed_json_is_500() {
        let input = "POST /echo HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: 5\r\n\r\n{oops";

        let output = exchange(server(chain()), input).await;

        assert!(output.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn unmatched_request_is_404() {
        let response = server(chain()).call(Request::get("/nowhere").body(Bytes::new()).unwrap()).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], "text/plain");

        let output = exchange(server(chain()), "GET /nowhere HTTP/1.1\r\n\r\n").await;
        assert!(output.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(output.ends_with("\r\n\r\n404"));
    }

    #[tokio::test]
    async fn method_mismatch_is_404() {
        let output = exchange(server(chain()), "POST /hello/ann HTTP/1.1\r\n\r\n").await;

        assert!(output.starts_with("HTTP/1.1 404 Not Found\r\n"));
    }

    #[tokio::test]
    async fn response_ended_by_a_continuing_preprocessor_is_kept() {
        let mut chain = chain();
        chain.pre(pre_fn(|_, resp: &mut ResponseSink| {
            resp.set_status(StatusCode::SERVICE_UNAVAILABLE).send("maintenance");
        }));

        let output = exchange(server(chain), "GET /hello/ann HTTP/1.1\r\n\r\n").await;

        assert!(output.starts_with("HTTP/1.1 503 Service Unavailable\r\n"));
        assert!(output.ends_with("maintenance"));
    }

    #[tokio::test]
    async fn serves_over_tcp() {
        let tcp_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = tcp_listener.local_addr().unwrap();
        tokio::spawn(server(chain()).serve(tcp_listener));

        let mut stream = TcpStream::connect(address).await.unwrap();
        stream.write_all(b"GET /hello/tcp HTTP/1.1\r\nConnection: close\r\n\r\n").await.unwrap();
        let mut output = String::new();
        stream.read_to_string(&mut output).await.unwrap();

        assert!(output.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(output.ends_with("hello tcp"));
    }
}
