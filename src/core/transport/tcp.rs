//! TCP transport implementation
//!
//! For boards whose UART is exposed through a serial-to-network bridge.

use super::{LineStream, LineTransport, DEFAULT_MAX_LINE_LENGTH, TransportError, TransportStats, TransportType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::net::TcpStream;

/// TCP connection configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TcpConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Connection timeout in seconds
    pub timeout_secs: u64,
    /// Longest reply line kept; longer lines are dropped
    pub max_line_length: usize,
}

impl TcpConfig {
    /// Create a new TCP configuration
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout_secs: 10,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    /// Set the reply line limit
    #[must_use]
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.max_line_length = bytes;
        self
    }

    /// Parse `host:port`
    pub fn parse(target: &str) -> Result<Self, TransportError> {
        let (host, port) = target
            .rsplit_once(':')
            .ok_or_else(|| TransportError::ConfigError(format!("expected host:port, got {target}")))?;
        let port = port
            .parse::<u16>()
            .map_err(|e| TransportError::ConfigError(format!("invalid port {port}: {e}")))?;
        if host.is_empty() {
            return Err(TransportError::ConfigError(format!("missing host in {target}")));
        }
        Ok(Self::new(host, port))
    }
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self::new("localhost", 23)
    }
}

/// TCP transport
pub struct TcpLink {
    config: TcpConfig,
    stream: LineStream<TcpStream>,
}

impl TcpLink {
    /// Connect to the bridge
    pub async fn connect(config: TcpConfig) -> Result<Self, TransportError> {
        let addr = format!("{}:{}", config.host, config.port);

        let stream = tokio::time::timeout(
            Duration::from_secs(config.timeout_secs),
            TcpStream::connect(&addr),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout_secs))?
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        // Commands are tiny; do not let Nagle hold them back
        stream.set_nodelay(true).map_err(TransportError::IoError)?;

        tracing::info!("Connected to {}", addr);

        Ok(Self::from_stream(config, stream))
    }

    /// Wrap an already connected stream
    pub fn from_stream(config: TcpConfig, stream: TcpStream) -> Self {
        Self {
            stream: LineStream::with_max_line_length(stream, config.max_line_length),
            config,
        }
    }
}

#[async_trait]
impl LineTransport for TcpLink {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream.write(data).await
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        self.stream.read_line(timeout).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        tracing::info!("Closing TCP link {}:{}", self.config.host, self.config.port);
        self.stream.shutdown().await
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Tcp
    }

    fn connection_info(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    fn stats(&self) -> TransportStats {
        self.stream.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    #[test]
    fn test_parse_target() {
        let config = TcpConfig::parse("192.168.4.1:2323").unwrap();
        assert_eq!(config.host, "192.168.4.1");
        assert_eq!(config.port, 2323);

        assert!(TcpConfig::parse("no-port").is_err());
        assert!(TcpConfig::parse(":80").is_err());
        assert!(TcpConfig::parse("host:http").is_err());
    }

    #[test]
    fn test_line_limit_from_toml() {
        let config: TcpConfig = toml::from_str("host = \"bridge\"\nmax_line_length = 512").unwrap();
        assert_eq!(config.host, "bridge");
        assert_eq!(config.port, 23);
        assert_eq!(config.max_line_length, 512);
        assert_eq!(TcpConfig::default().max_line_length, DEFAULT_MAX_LINE_LENGTH);
    }

    #[tokio::test]
    async fn test_round_trip_over_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let board = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 6];
            socket.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf, b"[PING]");
            socket.write_all(b"[PONG]\r\n").await.unwrap();
        });

        let mut link = TcpLink::connect(TcpConfig::new("127.0.0.1", port).timeout(2))
            .await
            .unwrap();
        link.write(b"[PING]").await.unwrap();
        let line = link.read_line(Duration::from_secs(2)).await.unwrap();
        assert_eq!(line.as_deref(), Some("[PONG]"));
        assert_eq!(link.transport_type(), TransportType::Tcp);

        board.await.unwrap();
        link.close().await.unwrap();
    }
}
