use std::net::{Ipv4Addr, SocketAddr};

use crate::reactor::DEFAULT_EVENTS_CAPACITY;

/// Port used when none (or an invalid one) is supplied.
pub const DEFAULT_PORT: u16 = 8080;

/// Size of the scratch buffer each read drains into.
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Configuration for the chat server.
///
/// Controls the bind address, read buffer size, how many readiness events
/// are fetched per wait, and socket options applied to accepted
/// connections. Use `ServerConfig::builder()` for ergonomic construction.
///
/// ## Resource Limits
///
/// - buffer_size: size of the scratch buffer reads are drained into
/// - max_connections: hard limit on concurrent connections (None for unlimited)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub address: SocketAddr,
    /// Size of the read scratch buffer
    pub buffer_size: usize,
    /// Readiness events fetched per wait
    pub events_capacity: usize,
    /// Maximum number of connections
    pub max_connections: Option<usize>,
    /// Enable TCP_NODELAY
    pub no_delay: bool,
}

impl ServerConfig {
    /// Create a new builder for ServerConfig
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::new()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            buffer_size: DEFAULT_BUFFER_SIZE,
            events_capacity: DEFAULT_EVENTS_CAPACITY,
            max_connections: None,
            no_delay: true,
        }
    }
}

/// Builder for ServerConfig.
///
/// Unset fields fall back to `ServerConfig::default()`.
#[derive(Default)]
pub struct ServerConfigBuilder {
    address: Option<SocketAddr>,
    buffer_size: Option<usize>,
    events_capacity: Option<usize>,
    max_connections: Option<usize>,
    no_delay: Option<bool>,
}

impl ServerConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the address to bind to
    pub fn address(mut self, address: SocketAddr) -> Self {
        self.address = Some(address);
        self
    }

    /// Listen on all interfaces at `port`
    pub fn port(mut self, port: u16) -> Self {
        self.address = Some(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)));
        self
    }

    /// Set the scratch buffer size; zero is bumped to one byte
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = Some(size.max(1));
        self
    }

    pub fn events_capacity(mut self, capacity: usize) -> Self {
        self.events_capacity = Some(capacity.max(1));
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn no_delay(mut self, enabled: bool) -> Self {
        self.no_delay = Some(enabled);
        self
    }

    pub fn build(self) -> ServerConfig {
        let default = ServerConfig::default();
        ServerConfig {
            address: self.address.unwrap_or(default.address),
            buffer_size: self.buffer_size.unwrap_or(default.buffer_size),
            events_capacity: self.events_capacity.unwrap_or(default.events_capacity),
            max_connections: self.max_connections.or(default.max_connections),
            no_delay: self.no_delay.unwrap_or(default.no_delay),
        }
    }
}
