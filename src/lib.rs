//! # devlink core library
//!
//! Client for a WiFi companion board that speaks a line-oriented text
//! protocol over a serial link. The board relays HTTP requests, manages
//! its WiFi connection, parses JSON and opens WebSockets on the host's
//! behalf.
//!
//! ## Example
//!
//! ```rust,no_run
//! use devlink_core::{Session, SessionConfig, SerialConfig, Transport};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::new(Transport::Serial(SerialConfig::new("/dev/ttyACM0", 115_200)));
//!     let mut session = Session::open(config).await?;
//!
//!     if session.client().ping().await? {
//!         let body = session.client().get_request("https://catfact.ninja/fact").await?;
//!         println!("{body}");
//!     }
//!
//!     session.close().await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod core;

// Re-exports for convenience
pub use crate::cli::{CliResult, ExitCodes, OutputFormat};
pub use crate::config::{AppConfig, ConfigError};
pub use crate::core::client::{BoardStatus, DevboardClient, HttpMethod, ReadPolicy, SocketDialect};
pub use crate::core::logger::{LogEntry, LogFormat, Logger, SessionLogger};
pub use crate::core::protocol::{classify, Command, CommandTag, StatusTag};
pub use crate::core::session::{Session, SessionConfig, SessionState};
pub use crate::core::simulator::{DeviceTemplates, ReplyRule, VirtualBoard};
pub use crate::core::transport::{
    LineTransport, SerialConfig, SerialFlowControl, SerialParity, TcpConfig, Transport, TransportError,
    TransportStats, TransportType,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
