//! Virtual board
//!
//! An in-memory [`LineTransport`] standing in for the companion board.
//! Replies come from two places: a queue of scripted lines (with explicit
//! timeouts), and reply rules fired by the commands written to it.

use super::transport::{LineTransport, TransportError, TransportStats, TransportType};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

/// Reply fired when a written command starts with `prefix`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyRule {
    /// Rule name
    pub name: String,
    /// Command prefix, usually a tag such as `[PING]`
    pub prefix: String,
    /// Lines queued in response
    pub lines: Vec<String>,
}

impl ReplyRule {
    /// Create a rule
    pub fn new(prefix: &str, lines: &[&str]) -> Self {
        Self {
            name: prefix.trim_matches(|c| c == '[' || c == ']').to_lowercase(),
            prefix: prefix.to_string(),
            lines: lines.iter().map(|l| (*l).to_string()).collect(),
        }
    }
}

/// In-memory board
#[derive(Debug, Default)]
pub struct VirtualBoard {
    name: String,
    queue: VecDeque<Option<String>>,
    rules: Vec<ReplyRule>,
    written: Vec<String>,
    read_attempts: u64,
    stats: TransportStats,
    closed: bool,
}

impl VirtualBoard {
    /// Create a board with nothing to say
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// Board that replays `lines` in order, then stays silent
    pub fn scripted(lines: &[&str]) -> Self {
        let mut board = Self::new("scripted");
        for line in lines {
            board.push_line(line);
        }
        board
    }

    /// Queue a line
    pub fn push_line(&mut self, line: &str) -> &mut Self {
        self.queue.push_back(Some(line.to_string()));
        self
    }

    /// Queue `count` read timeouts
    pub fn push_timeouts(&mut self, count: usize) -> &mut Self {
        for _ in 0..count {
            self.queue.push_back(None);
        }
        self
    }

    /// Add a reply rule
    pub fn add_rule(&mut self, rule: ReplyRule) -> &mut Self {
        self.rules.push(rule);
        self
    }

    /// Commands written so far
    pub fn written(&self) -> &[String] {
        &self.written
    }

    /// Calls made to `read_line`
    pub fn read_attempts(&self) -> u64 {
        self.read_attempts
    }

    /// Entries still queued, timeouts included
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Whether `close` was called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

#[async_trait]
impl LineTransport for VirtualBoard {
    async fn write(&mut self, data: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Disconnected);
        }
        let text = String::from_utf8_lossy(data).into_owned();

        if let Some(rule) = self.rules.iter().find(|r| text.starts_with(&r.prefix)) {
            tracing::trace!(rule = %rule.name, "virtual board replying");
            self.queue.extend(rule.lines.iter().cloned().map(Some));
        }

        self.stats.bytes_sent += data.len() as u64;
        self.stats.commands_sent += 1;
        self.written.push(text);
        Ok(())
    }

    async fn read_line(&mut self, _timeout: Duration) -> Result<Option<String>, TransportError> {
        if self.closed {
            return Err(TransportError::Disconnected);
        }
        self.read_attempts += 1;

        match self.queue.pop_front().flatten() {
            Some(line) => {
                self.stats.lines_received += 1;
                Ok(Some(line))
            }
            None => {
                self.stats.read_timeouts += 1;
                Ok(None)
            }
        }
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        Ok(())
    }

    fn transport_type(&self) -> TransportType {
        TransportType::Memory
    }

    fn connection_info(&self) -> String {
        format!("virtual board ({})", self.name)
    }

    fn stats(&self) -> TransportStats {
        self.stats.clone()
    }
}

/// Preset boards
pub struct DeviceTemplates;

impl DeviceTemplates {
    /// A healthy board already joined to a network
    pub fn wifi_devboard() -> VirtualBoard {
        let mut board = VirtualBoard::new("wifi-devboard");
        board
            .add_rule(ReplyRule::new("[PING]", &["[PONG]"]))
            .add_rule(ReplyRule::new("[LIST]", &["[PING], [LIST], [WIFI/CONNECT], [GET], [POST/HTTP]"]))
            .add_rule(ReplyRule::new("[WIFI/CONNECT]", &["[CONNECTED] Connected to WiFi"]))
            .add_rule(ReplyRule::new("[WIFI/DISCONNECT]", &["[DISCONNECTED] WiFi stop"]))
            .add_rule(ReplyRule::new("[WIFI/SCAN]", &["home-net, cafe-guest, lab-5g"]))
            .add_rule(ReplyRule::new("[WIFI/SAVE]", &["[SUCCESS] Saved", "[INFO] Connecting", "[SUCCESS] Connected"]))
            .add_rule(ReplyRule::new("[WIFI/IP]", &["192.168.1.42"]))
            .add_rule(ReplyRule::new("[IP/ADDRESS]", &["192.168.4.1"]))
            .add_rule(ReplyRule::new("[GET/HTTP]", &["[GET/SUCCESS]", r#"{"fact":"Cats sleep 70% of their lives.","length":31}"#, "[GET/END]"]))
            .add_rule(ReplyRule::new("[GET/BYTES]", &["[GET/SUCCESS]", "GIF89a", "[GET/END]"]))
            .add_rule(ReplyRule::new("[GET]", &["[GET/SUCCESS]", r#"{"url":"https://httpbin.org/get"}"#, "[GET/END]"]))
            .add_rule(ReplyRule::new("[POST/HTTP]", &["[POST/SUCCESS]", r#"{"created":true}"#, "[POST/END]"]))
            .add_rule(ReplyRule::new("[PUT/HTTP]", &["[PUT/SUCCESS]", r#"{"updated":true}"#, "[PUT/END]"]))
            .add_rule(ReplyRule::new("[DELETE/HTTP]", &["[DELETE/SUCCESS]", r#"{"deleted":true}"#, "[DELETE/END]"]))
            .add_rule(ReplyRule::new("[PARSE/ARRAY]", &["second"]))
            .add_rule(ReplyRule::new("[PARSE]", &["Cats sleep 70% of their lives."]))
            .add_rule(ReplyRule::new("[WS/START]", &["[WS/STARTED]"]))
            .add_rule(ReplyRule::new("[WS/STOP]", &["[WS/STOPPED]"]))
            .add_rule(ReplyRule::new("[SOCKET/START]", &["[SOCKET/STARTED]"]));
        board
    }

    /// A board that never answers
    pub fn silent() -> VirtualBoard {
        VirtualBoard::new("silent")
    }
}
