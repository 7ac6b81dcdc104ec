//! Session management
//!
//! A Session is the one open link to the board: opened with an explicit
//! initialize call, closed with an explicit deinitialize call. Exactly one
//! client operates the transport while the session is open.

use super::client::{DevboardClient, ReadPolicy, SocketDialect};
use super::logger::{LogFormat, Logger, SessionLogger};
use super::transport::{open_transport, LineTransport, Transport, TransportError, TransportStats};
use std::path::PathBuf;
use std::time::Instant;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Transport open, commands may be issued
    Open,
    /// Transport released
    Closed,
}

/// Session configuration
#[derive(Debug, Clone, Default)]
pub struct SessionConfig {
    /// Transport configuration
    pub transport: Transport,
    /// Read timing
    pub policy: ReadPolicy,
    /// WebSocket command family
    pub dialect: SocketDialect,
    /// Transcript file and format
    pub transcript: Option<(PathBuf, LogFormat)>,
}

impl SessionConfig {
    /// Create a configuration with default timing
    pub fn new(transport: Transport) -> Self {
        Self {
            transport,
            ..Self::default()
        }
    }
}

/// Open link to the board
pub struct Session {
    client: DevboardClient<Box<dyn LineTransport>>,
    transcript: Option<Logger>,
    state: SessionState,
    opened_at: Instant,
}

impl Session {
    /// Open the configured transport
    pub async fn open(config: SessionConfig) -> Result<Self, TransportError> {
        let SessionConfig {
            transport,
            policy,
            dialect,
            transcript,
        } = config;

        let transport = open_transport(transport).await?;
        Self::with_transport(transport, policy, dialect, transcript)
    }

    /// Start a session over an already open transport
    pub fn with_transport(
        transport: Box<dyn LineTransport>,
        policy: ReadPolicy,
        dialect: SocketDialect,
        transcript: Option<(PathBuf, LogFormat)>,
    ) -> Result<Self, TransportError> {
        let info = transport.connection_info();
        let mut client = DevboardClient::new(transport)
            .with_policy(policy)
            .with_socket_dialect(dialect);

        let transcript = match transcript {
            Some((path, format)) => {
                let logger = SessionLogger::shared(&path, format)?;
                logger.lock().log_info(&format!("session opened on {info}"));
                client = client.with_transcript(logger.clone());
                Some(logger)
            }
            None => None,
        };

        tracing::info!("Session opened on {}", info);

        Ok(Self {
            client,
            transcript,
            state: SessionState::Open,
            opened_at: Instant::now(),
        })
    }

    /// Client for issuing commands
    pub fn client(&mut self) -> &mut DevboardClient<Box<dyn LineTransport>> {
        &mut self.client
    }

    /// Get current state
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Get connection info string
    pub fn connection_info(&self) -> String {
        self.client.transport().connection_info()
    }

    /// Get connection statistics
    pub fn stats(&self) -> TransportStats {
        self.client.transport().stats()
    }

    /// Release the transport
    pub async fn close(mut self) -> Result<TransportStats, TransportError> {
        let stats = self.stats();
        self.client.transport_mut().close().await?;
        self.state = SessionState::Closed;

        if let Some(ref logger) = self.transcript {
            let mut logger = logger.lock();
            logger.log_info("session closed");
            tracing::debug!("Transcript holds {} lines", logger.lines_logged());
            logger.stop();
        }

        tracing::info!(
            commands = stats.commands_sent,
            lines = stats.lines_received,
            timeouts = stats.read_timeouts,
            discarded = stats.lines_discarded,
            "Session closed after {:?}",
            self.opened_at.elapsed()
        );
        Ok(stats)
    }
}
