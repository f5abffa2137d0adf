//! Server configuration.

use std::net::SocketAddr;
use std::time::Duration;

/// Configuration for the HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// Largest request body accepted, in bytes.
    pub max_body_size: usize,
    /// Longest a write request waits for the writer slot.
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Creates a new server configuration.
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_body_size: 32 * 1024 * 1024,
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Sets the maximum request body size.
    pub fn with_max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Sets how long a write request waits for the writer slot.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(SocketAddr::from(([0, 0, 0, 0], 8080)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 8080);
        assert_eq!(config.max_body_size, 32 * 1024 * 1024);
    }

    #[test]
    fn config_builder() {
        let config = ServerConfig::new("127.0.0.1:9000".parse().unwrap())
            .with_max_body_size(1024)
            .with_request_timeout(Duration::from_secs(5));

        assert_eq!(config.bind_addr.port(), 9000);
        assert_eq!(config.max_body_size, 1024);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }
}
