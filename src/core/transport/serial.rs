//! Serial port transport implementation

use super::{LineStream, LineTransport, DEFAULT_MAX_LINE_LENGTH, TransportError, TransportStats, TransportType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_serial::{DataBits, FlowControl, Parity, SerialPortBuilderExt, SerialStream, StopBits};

/// Serial port flow control type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialFlowControl {
    /// No flow control
    #[default]
    None,
    /// Hardware flow control (RTS/CTS)
    Hardware,
    /// Software flow control (XON/XOFF)
    Software,
}

impl std::str::FromStr for SerialFlowControl {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "hardware" | "hw" | "rtscts" => Ok(Self::Hardware),
            "software" | "sw" | "xonxoff" => Ok(Self::Software),
            other => Err(format!("unknown flow control: {other}")),
        }
    }
}

/// Serial port parity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SerialParity {
    /// No parity
    #[default]
    None,
    /// Odd parity
    Odd,
    /// Even parity
    Even,
}

impl std::str::FromStr for SerialParity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "n" => Ok(Self::None),
            "odd" | "o" => Ok(Self::Odd),
            "even" | "e" => Ok(Self::Even),
            other => Err(format!("unknown parity: {other}")),
        }
    }
}

/// Serial port configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name (e.g., COM3, /dev/ttyUSB0)
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Data bits (5, 6, 7, 8)
    pub data_bits: u8,
    /// Stop bits (1, 2)
    pub stop_bits: u8,
    /// Parity
    pub parity: SerialParity,
    /// Flow control
    pub flow_control: SerialFlowControl,
    /// Longest reply line kept; longer lines are dropped
    pub max_line_length: usize,
}

impl SerialConfig {
    /// Line speed the board firmware listens at
    pub const DEFAULT_BAUD_RATE: u32 = 115_200;

    /// Create a new serial configuration with 8N1 framing
    pub fn new(port: &str, baud_rate: u32) -> Self {
        Self {
            port: port.to_string(),
            baud_rate,
            data_bits: 8,
            stop_bits: 1,
            parity: SerialParity::None,
            flow_control: SerialFlowControl::None,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Set data bits
    #[must_use]
    pub fn data_bits(mut self, bits: u8) -> Self {
        self.data_bits = bits;
        self
    }

    /// Set stop bits
    #[must_use]
    pub fn stop_bits(mut self, bits: u8) -> Self {
        self.stop_bits = bits;
        self
    }

    /// Set parity
    #[must_use]
    pub fn parity(mut self, parity: SerialParity) -> Self {
        self.parity = parity;
        self
    }

    /// Set flow control
    #[must_use]
    pub fn flow_control(mut self, flow: SerialFlowControl) -> Self {
        self.flow_control = flow;
        self
    }

    /// Set the reply line limit
    #[must_use]
    pub fn max_line_length(mut self, bytes: usize) -> Self {
        self.max_line_length = bytes;
        self
    }

    fn summary(&self) -> String {
        format!(
            "{} @ {} baud ({}{}{} {})",
            self.port,
            self.baud_rate,
            self.data_bits,
            match self.parity {
                SerialParity::None => "N",
                SerialParity::Odd => "O",
                SerialParity::Even => "E",
            },
            self.stop_bits,
            match self.flow_control {
                SerialFlowControl::None => "No FC",
                SerialFlowControl::Hardware => "HW FC",
                SerialFlowControl::Software => "SW FC",
            }
        )
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        #[cfg(windows)]
        let port = "COM3";
        #[cfg(not(windows))]
        let port = "/dev/ttyACM0";

        Self::new(port, Self::DEFAULT_BAUD_RATE)
    }
}

/// Serial port transport
pub struct SerialLink {
    config: SerialConfig,
    stream: LineStream<SerialStream>,
}

impl SerialLink {
    /// Open the port and start framing lines
    pub fn open(config: SerialConfig) -> Result<Self, TransportError> {
        let data_bits = match config.data_bits {
            5 => DataBits::Five,
            6 => DataBits::Six,
            7 => DataBits::Seven,
            _ => DataBits::Eight,
        };

        let stop_bits = match config.stop_bits {
            2 => StopBits::Two,
            _ => StopBits::One,
        };

        let parity = match config.parity {
            SerialParity::Odd => Parity::Odd,
            SerialParity::Even => Parity::Even,
            SerialParity::None => Parity::None,
        };

        let flow_control = match config.flow_control {
            SerialFlowControl::Hardware => FlowControl::Hardware,
            SerialFlowControl::Software => FlowControl::Software,
            SerialFlowControl::None => FlowControl::None,
        };

        let port = tokio_serial::new(&config.port, config.baud_rate)
            .data_bits(data_bits)
            .stop_bits(stop_bits)
            .parity(parity)
            .flow_control(flow_control)
            .open_native_async()
            .map_err(|e| match e.kind() {
                tokio_serial::ErrorKind::NoDevice => TransportError::PortNotFound(config.port.clone()),
                tokio_serial::ErrorKind::Io(std::io::ErrorKind::NotFound) => {
                    TransportError::PortNotFound(config.port.clone())
                }
                tokio_serial::ErrorKind::Io(std::io::ErrorKind::PermissionDenied) => {
                    TransportError::PermissionDenied(config.port.clone())
                }
                tokio_serial::ErrorKind::InvalidInput => TransportError::ConfigError(e.to_string()),
                _ => TransportError::ConnectionFailed(e.to_string()),
            })?;

        tracing::info!("Opened serial link {}", config.summary());

        Ok(Self {
            stream: LineStream::with_max_line_length(port, config.max_line_length),
            config,
        })
    }
}

#[async_trait]
impl LineTransport for SerialLink {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        self.stream.write(data).await
    }

    async fn read_line(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        self.stream.read_line(timeout).await
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        tracing::info!("Closing serial link {}", self.config.port);
        self.stream.shutdown().await
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Serial
    }

    fn connection_info(&self) -> String {
        self.config.summary()
    }

    fn stats(&self) -> TransportStats {
        self.stream.stats()
    }
}

/// List available serial ports
pub fn list_ports() -> Result<Vec<serialport::SerialPortInfo>, TransportError> {
    serialport::available_ports().map_err(|e| TransportError::IoError(e.into()))
}
