//! Rendering of verb results for stdout

use crate::core::client::BoardStatus;
use serde::Serialize;

/// CLI output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    #[default]
    Text,
    /// JSON object per result
    Json,
    /// Hex dump of the text form
    Hex,
}

/// Result of one verb
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    /// Success flag
    Flag(bool),
    /// Raw reply or response body, empty on failure
    Text(String),
    /// Composite status
    Status(BoardStatus),
    /// Serial port names
    Ports(Vec<String>),
    /// Command was written, nothing to wait for
    Sent,
}

impl Reply {
    /// Whether the verb did what was asked
    pub fn succeeded(&self) -> bool {
        match self {
            Self::Flag(ok) => *ok,
            Self::Text(text) => !text.is_empty(),
            Self::Status(status) => status.responsive,
            Self::Ports(_) | Self::Sent => true,
        }
    }

    fn to_text(&self) -> String {
        match self {
            Self::Flag(true) | Self::Sent => "ok".to_string(),
            Self::Flag(false) => "failed".to_string(),
            Self::Text(text) => text.clone(),
            Self::Status(status) => format!(
                "responsive: {}\nwifi ip: {}\nboard ip: {}\nwifi connected: {}",
                status.responsive,
                or_unknown(&status.wifi_ip),
                or_unknown(&status.board_ip),
                status.wifi_connected
            ),
            Self::Ports(ports) => ports.join("\n"),
        }
    }
}

fn or_unknown(value: &str) -> &str {
    if value.is_empty() {
        "unknown"
    } else {
        value
    }
}

/// Format a verb result
pub fn format_reply(verb: &str, reply: &Reply, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => reply.to_text(),
        OutputFormat::Hex => hex_format(reply.to_text().as_bytes()),
        OutputFormat::Json => serde_json::json!({
            "command": verb,
            "ok": reply.succeeded(),
            "result": reply,
        })
        .to_string(),
    }
}

fn hex_format(data: &[u8]) -> String {
    data.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ")
}
