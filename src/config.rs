//! Server configuration.

/// Listener and capacity settings for a [`Server`](crate::Server).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or address to bind.
    ///
    /// Default: `localhost`
    pub host: String,

    /// TCP port to bind. Port 0 requests an ephemeral port.
    ///
    /// Default: 9999
    pub port: u16,

    /// Maximum number of simultaneous established connections. Excess
    /// connections are refused at the TCP layer, before any handshake
    /// bytes are read.
    ///
    /// Default: 20
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 9999,
            max_clients: 20,
        }
    }
}

impl ServerConfig {
    /// Create a configuration with explicit values.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16, max_clients: usize) -> Self {
        Self {
            host: host.into(),
            port,
            max_clients,
        }
    }

    /// The `host:port` string handed to the resolver at bind time.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
