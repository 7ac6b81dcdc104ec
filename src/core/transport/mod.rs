//! Transport layer for the companion board link
//!
//! Supports:
//! - Serial ports (UART pins, USB-Serial adapters)
//! - Raw TCP connections (serial-to-network bridges)
//!
//! Every transport is line oriented: commands go out as raw bytes and
//! replies come back one newline-delimited line at a time.

mod framed;
mod serial;
mod tcp;

pub use framed::{BoardLineCodec, Frame, LineStream, DEFAULT_MAX_LINE_LENGTH};
pub use serial::{list_ports, SerialConfig, SerialFlowControl, SerialLink, SerialParity};
pub use tcp::{TcpConfig, TcpLink};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transport {
    /// Serial port connection
    Serial(SerialConfig),
    /// Raw TCP connection
    Tcp(TcpConfig),
}

impl Default for Transport {
    fn default() -> Self {
        Self::Serial(SerialConfig::default())
    }
}

/// Transport type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
    /// Serial port
    Serial,
    /// Raw TCP
    Tcp,
    /// In-memory or otherwise scripted stream
    Memory,
}

impl fmt::Display for TransportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Serial => write!(f, "Serial"),
            Self::Tcp => write!(f, "TCP"),
            Self::Memory => write!(f, "Memory"),
        }
    }
}

/// Transport error types
///
/// These describe faults of the link itself. A board that answers with the
/// wrong marker, or does not answer at all, is not a transport error.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection timeout
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// Port not found
    #[error("Port not found: {0}")]
    PortNotFound(String),

    /// Permission denied
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The remote end closed the stream
    #[error("Disconnected")]
    Disconnected,
}

/// Transport statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Bytes sent
    pub bytes_sent: u64,
    /// Write calls (one per command)
    pub commands_sent: u64,
    /// Lines received
    pub lines_received: u64,
    /// Line reads that timed out
    pub read_timeouts: u64,
    /// Lines dropped for exceeding the length limit
    pub lines_discarded: u64,
    /// Connection uptime in seconds
    pub uptime_secs: u64,
}

/// Line-oriented duplex link to the board
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LineTransport: Send {
    /// Send bytes as-is, without acknowledgement
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Read one line, or `None` if nothing arrived within `timeout`
    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError>;

    /// Release the underlying handle
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Get transport type
    fn transport_type(&self) -> TransportType;

    /// Get connection info string
    fn connection_info(&self) -> String;

    /// Get statistics
    fn stats(&self) -> TransportStats;
}

#[async_trait]
impl<T: LineTransport + ?Sized> LineTransport for Box<T> {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        (**self).write(data).await
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        (**self).read_line(timeout).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        (**self).close().await
    }

    fn transport_type(&self) -> TransportType {
        (**self).transport_type()
    }

    fn connection_info(&self) -> String {
        (**self).connection_info()
    }

    fn stats(&self) -> TransportStats {
        (**self).stats()
    }
}

/// Open a transport from configuration
pub async fn open_transport(config: Transport) -> Result<Box<dyn LineTransport>, TransportError> {
    match config {
        Transport::Serial(cfg) => {
            let transport = SerialLink::open(cfg)?;
            Ok(Box::new(transport))
        }
        Transport::Tcp(cfg) => {
            let transport = TcpLink::connect(cfg).await?;
            Ok(Box::new(transport))
        }
    }
}
