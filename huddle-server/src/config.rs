use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};

pub const DEFAULT_BIND_ADDR: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8000));
pub const DEFAULT_WS_PATH: &str = "/ws";

/// Where the relay listens.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    pub ws_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND_ADDR,
            ws_path: DEFAULT_WS_PATH.to_owned(),
        }
    }
}
