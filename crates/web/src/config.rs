use rece_http::connection::DEFAULT_MAX_BODY_SIZE;
use serde::Deserialize;
use std::net::{Ipv4Addr, SocketAddr};

pub const DEFAULT_PORT: u16 = 18535;

/// Listener settings. Every field is optional in the serialized form.
///
/// ```
/// use rece_web::ServerConfig;
///
/// let config = ServerConfig::from_json(r#"{ "address": "127.0.0.1:8080" }"#).unwrap();
/// assert_eq!(config.address.port(), 8080);
/// assert_eq!(config.max_body_size, 1_000_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: SocketAddr,
    /// Requests with a larger body abort their connection.
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)), max_body_size: DEFAULT_MAX_BODY_SIZE }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
