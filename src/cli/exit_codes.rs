//! CLI Exit Codes
//!
//! Standard exit codes for scripting against the board.

use crate::config::ConfigError;
use crate::core::transport::TransportError;
use std::process::ExitCode;

/// Exit code constants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCodes;

impl ExitCodes {
    /// Success
    pub const SUCCESS: u8 = 0;

    /// General error
    pub const ERROR: u8 = 1;

    /// Connection failed or lost
    pub const CONNECTION_FAILED: u8 = 3;

    /// Connection timeout
    pub const TIMEOUT: u8 = 4;

    /// Permission denied
    pub const PERMISSION_DENIED: u8 = 7;

    /// Configuration error
    pub const CONFIG_ERROR: u8 = 8;

    /// The board answered with a failure, an unexpected reply, or nothing
    pub const PROTOCOL_ERROR: u8 = 9;

    /// Port not found
    pub const PORT_NOT_FOUND: u8 = 14;
}

/// CLI operation result
#[derive(Debug)]
pub enum CliResult {
    /// Success
    Success,

    /// Error with code and message
    Error(u8, String),
}

impl CliResult {
    /// Plain success
    pub fn success() -> Self {
        Self::Success
    }

    /// Failure with an explicit code
    pub fn error(code: u8, msg: impl Into<String>) -> Self {
        Self::Error(code, msg.into())
    }

    /// The board did not do what was asked
    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::Error(ExitCodes::PROTOCOL_ERROR, msg.into())
    }

    /// Get exit code
    pub fn code(&self) -> u8 {
        match self {
            Self::Success => ExitCodes::SUCCESS,
            Self::Error(code, _) => *code,
        }
    }

    /// Get message
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Error(_, msg) => Some(msg),
            Self::Success => None,
        }
    }

    /// Convert to ExitCode
    pub fn to_exit_code(&self) -> ExitCode {
        ExitCode::from(self.code())
    }

    /// Is success?
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

impl From<TransportError> for CliResult {
    fn from(err: TransportError) -> Self {
        let code = match err {
            TransportError::ConnectionFailed(_) | TransportError::Disconnected => ExitCodes::CONNECTION_FAILED,
            TransportError::Timeout(_) => ExitCodes::TIMEOUT,
            TransportError::PortNotFound(_) => ExitCodes::PORT_NOT_FOUND,
            TransportError::PermissionDenied(_) => ExitCodes::PERMISSION_DENIED,
            TransportError::ConfigError(_) => ExitCodes::CONFIG_ERROR,
            TransportError::IoError(ref io) => match io.kind() {
                std::io::ErrorKind::NotFound => ExitCodes::PORT_NOT_FOUND,
                std::io::ErrorKind::PermissionDenied => ExitCodes::PERMISSION_DENIED,
                std::io::ErrorKind::TimedOut => ExitCodes::TIMEOUT,
                _ => ExitCodes::CONNECTION_FAILED,
            },
        };

        Self::Error(code, err.to_string())
    }
}

impl From<ConfigError> for CliResult {
    fn from(err: ConfigError) -> Self {
        Self::Error(ExitCodes::CONFIG_ERROR, err.to_string())
    }
}

/// Exit code description
pub fn exit_code_description(code: u8) -> &'static str {
    match code {
        0 => "Success",
        1 => "General error",
        // clap's usage error
        2 => "Invalid arguments",
        3 => "Connection failed",
        4 => "Connection timeout",
        7 => "Permission denied",
        8 => "Configuration error",
        9 => "Protocol error",
        14 => "Port not found",
        _ => "Unknown error",
    }
}

/// Print exit code table
pub fn print_exit_codes() {
    println!("Exit Codes:");
    for code in [0, 1, 2, 3, 4, 7, 8, 9, 14] {
        println!("  {:>3}  {}", code, exit_code_description(code));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_result() {
        let success = CliResult::success();
        assert!(success.is_success());
        assert_eq!(success.code(), 0);

        let error = CliResult::protocol_error("ping failed");
        assert!(!error.is_success());
        assert_eq!(error.code(), ExitCodes::PROTOCOL_ERROR);
        assert_eq!(error.message(), Some("ping failed"));
    }

    #[test]
    fn test_from_transport_error() {
        let result = CliResult::from(TransportError::PortNotFound("/dev/ttyACM9".into()));
        assert_eq!(result.code(), ExitCodes::PORT_NOT_FOUND);

        let result = CliResult::from(TransportError::Disconnected);
        assert_eq!(result.code(), ExitCodes::CONNECTION_FAILED);

        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "busy");
        let result = CliResult::from(TransportError::IoError(io));
        assert_eq!(result.code(), ExitCodes::PERMISSION_DENIED);
    }

    #[test]
    fn test_descriptions_cover_table() {
        for code in [0, 1, 2, 3, 4, 7, 8, 9, 14] {
            assert_ne!(exit_code_description(code), "Unknown error");
        }
    }
}
