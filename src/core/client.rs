//! Protocol client for the WiFi companion board
//!
//! One method per remote capability. Every verb follows the same exchange:
//!
//! ```text
//! IDLE -> SENT -> TIMEOUT                      drain, fail
//!              -> LINE_RECEIVED -> UNMATCHED   drain, fail
//!                               -> MATCHED     (STREAMING until end marker)
//! ```
//!
//! A silent board, an unexpected reply and an invalid argument are all
//! reported as values (`false` or an empty string). `Err` is reserved for
//! faults of the link itself.

use super::logger::{Direction, Logger};
use super::protocol::{
    classify, ends_drain, Command, CommandTag, StatusTag, WIFI_STOP_TEXT,
};
use super::transport::{LineTransport, TransportError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Read timing used by every verb
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPolicy {
    /// Per-attempt timeout for `[PING]`
    pub control_timeout: Duration,
    /// Per-attempt timeout for every other verb and for body lines
    pub data_timeout: Duration,
    /// Line reads per `read_data` call before reporting nothing
    pub read_attempts: u32,
    /// Per-attempt timeout while draining
    pub drain_timeout: Duration,
    /// Lines a single drain may consume
    pub drain_iterations: u32,
    /// Reads allowed while waiting for a body line or end marker
    pub stream_line_cap: u32,
}

impl Default for ReadPolicy {
    fn default() -> Self {
        Self {
            control_timeout: Duration::from_millis(100),
            data_timeout: Duration::from_millis(500),
            read_attempts: 5,
            drain_timeout: Duration::from_millis(100),
            drain_iterations: 5,
            stream_line_cap: 50,
        }
    }
}

/// WebSocket command family
///
/// Firmware builds disagree on the tag and on how success is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SocketDialect {
    /// `[WS/START]` / `[WS/STOP]`, acknowledged with `[SUCCESS]` or `[WS/STARTED]`/`[WS/STOPPED]`
    #[default]
    Ws,
    /// `[SOCKET/START]` / `[SOCKET/STOP]`; start succeeds unless `[ERROR]`, stop is unacknowledged
    Socket,
}

impl std::str::FromStr for SocketDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ws" => Ok(Self::Ws),
            "socket" => Ok(Self::Socket),
            other => Err(format!("unknown websocket dialect: {other}")),
        }
    }
}

/// HTTP method relayed by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpMethod {
    fn markers(&self) -> (StatusTag, StatusTag) {
        match self {
            Self::Get => (StatusTag::GetSuccess, StatusTag::GetEnd),
            Self::Post => (StatusTag::PostSuccess, StatusTag::PostEnd),
            Self::Put => (StatusTag::PutSuccess, StatusTag::PutEnd),
            Self::Delete => (StatusTag::DeleteSuccess, StatusTag::DeleteEnd),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "PUT" => Ok(Self::Put),
            "DELETE" => Ok(Self::Delete),
            other => Err(format!("unsupported method: {other}")),
        }
    }
}

/// Snapshot gathered by [`DevboardClient::status`]
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BoardStatus {
    /// Board answered `[PING]`
    pub responsive: bool,
    /// Address on the joined network, empty if unknown
    pub wifi_ip: String,
    /// Board's own address, empty if unknown
    pub board_ip: String,
    /// WiFi connect request was acknowledged
    pub wifi_connected: bool,
}

/// Client driving one board over one transport
pub struct DevboardClient<T> {
    transport: T,
    policy: ReadPolicy,
    dialect: SocketDialect,
    transcript: Option<Logger>,
}

impl<T: LineTransport> DevboardClient<T> {
    /// Create a client with default timing
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            policy: ReadPolicy::default(),
            dialect: SocketDialect::default(),
            transcript: None,
        }
    }

    /// Replace the read policy
    #[must_use]
    pub fn with_policy(mut self, policy: ReadPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Select the WebSocket command family
    #[must_use]
    pub fn with_socket_dialect(mut self, dialect: SocketDialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Record traffic to a transcript
    #[must_use]
    pub fn with_transcript(mut self, logger: Logger) -> Self {
        self.transcript = Some(logger);
        self
    }

    /// Current read policy
    pub fn policy(&self) -> &ReadPolicy {
        &self.policy
    }

    /// Current WebSocket dialect
    pub fn socket_dialect(&self) -> SocketDialect {
        self.dialect
    }

    /// Borrow the transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Borrow the transport mutably
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back
    pub fn into_transport(self) -> T {
        self.transport
    }

    fn record(&self, direction: Direction, text: &str) {
        if let Some(ref logger) = self.transcript {
            logger.lock().log(direction, text);
        }
    }

    // ---- Line primitives ----

    /// Read one line, retrying on timeout up to `read_attempts` times in total
    pub async fn read_data(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        for attempt in 1..=self.policy.read_attempts.max(1) {
            if let Some(line) = self.transport.read_line(timeout).await? {
                return Ok(Some(line));
            }
            tracing::trace!(attempt, "no line within {:?}", timeout);
        }
        Ok(None)
    }

    /// Discard trailing lines until a marker, silence, or the iteration limit
    ///
    /// With `search_for_success` set, `[SUCCESS]` also ends the drain;
    /// otherwise it is discarded like noise.
    pub async fn clear_buffer(&mut self, search_for_success: bool) -> Result<(), TransportError> {
        for _ in 0..self.policy.drain_iterations {
            let Some(line) = self.read_data(self.policy.drain_timeout).await? else {
                break;
            };
            tracing::trace!("drained {:?}", line);
            self.record(Direction::Drained, &line);
            if ends_drain(&line, search_for_success) {
                break;
            }
        }
        Ok(())
    }

    async fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let text = command.render();
        tracing::debug!(tag = %command.tag(), "TX {}", text);
        self.record(Direction::Sent, &text);
        self.transport.write(text.as_bytes()).await
    }

    async fn receive(&mut self, timeout: Duration) -> Result<Option<String>, TransportError> {
        let reply = self.read_data(timeout).await?;
        if let Some(ref line) = reply {
            tracing::debug!(status = ?classify(line), "RX {}", line);
            self.record(Direction::Received, line);
        }
        Ok(reply)
    }

    async fn exchange(&mut self, command: &Command, timeout: Duration) -> Result<Option<String>, TransportError> {
        self.send(command).await?;
        let reply = self.receive(timeout).await?;
        if reply.is_none() {
            tracing::warn!("{} got no reply", command.tag());
        }
        Ok(reply)
    }

    /// Single round trip acknowledged by a marker. Drains after any reply.
    async fn acknowledged(
        &mut self,
        command: Command,
        timeout: Duration,
        search_for_success: bool,
        accept: impl Fn(&str) -> bool,
    ) -> Result<bool, TransportError> {
        let Some(line) = self.exchange(&command, timeout).await? else {
            self.clear_buffer(false).await?;
            return Ok(false);
        };
        self.clear_buffer(search_for_success).await?;

        let accepted = accept(&line);
        if !accepted {
            tracing::warn!("{} rejected: {}", command.tag(), line);
        }
        Ok(accepted)
    }

    /// Single round trip whose reply line is the result
    async fn query(&mut self, command: Command) -> Result<String, TransportError> {
        match self.exchange(&command, self.policy.data_timeout).await? {
            None => {
                self.clear_buffer(false).await?;
                Ok(String::new())
            }
            Some(line) if StatusTag::Error.found_in(&line) => {
                tracing::warn!("{} failed: {}", command.tag(), line);
                self.clear_buffer(false).await?;
                Ok(String::new())
            }
            Some(line) => Ok(line),
        }
    }

    /// Request whose body follows a success marker and ends with an end marker
    ///
    /// Returns the first non-empty body line. Later body lines are left to
    /// the drain.
    async fn streamed(&mut self, command: Command, method: HttpMethod) -> Result<String, TransportError> {
        let (success, end) = method.markers();
        let timeout = self.policy.data_timeout;

        let Some(line) = self.exchange(&command, timeout).await? else {
            self.clear_buffer(false).await?;
            return Ok(String::new());
        };

        if !success.found_in(&line) {
            tracing::warn!("{} request failed: {}", method, line);
            self.clear_buffer(false).await?;
            return Ok(String::new());
        }

        for _ in 0..self.policy.stream_line_cap {
            let Some(line) = self.receive(timeout).await? else {
                continue;
            };
            if end.found_in(&line) {
                tracing::debug!("{} body ended without content", method);
                break;
            }
            if line.is_empty() {
                continue;
            }
            self.clear_buffer(false).await?;
            return Ok(line);
        }

        self.clear_buffer(false).await?;
        Ok(String::new())
    }

    // ---- Board ----

    /// Check that the board is alive
    pub async fn ping(&mut self) -> Result<bool, TransportError> {
        let timeout = self.policy.control_timeout;
        self.acknowledged(Command::new(CommandTag::Ping), timeout, true, |line| {
            StatusTag::Pong.found_in(line)
        })
        .await
    }

    /// List the commands the firmware supports
    pub async fn list_commands(&mut self) -> Result<String, TransportError> {
        self.query(Command::new(CommandTag::List)).await
    }

    /// Let the board LED show activity
    pub async fn led_on(&mut self) -> Result<(), TransportError> {
        self.send(&Command::new(CommandTag::LedOn)).await
    }

    /// Keep the board LED dark while processing
    pub async fn led_off(&mut self) -> Result<(), TransportError> {
        self.send(&Command::new(CommandTag::LedOff)).await
    }

    /// Board's own IP address
    pub async fn ip_address(&mut self) -> Result<String, TransportError> {
        self.query(Command::new(CommandTag::IpAddress)).await
    }

    // ---- WiFi ----

    /// Join the saved network
    pub async fn connect_wifi(&mut self) -> Result<bool, TransportError> {
        let timeout = self.policy.data_timeout;
        self.acknowledged(Command::new(CommandTag::WifiConnect), timeout, true, |line| {
            StatusTag::Success.found_in(line)
                || StatusTag::Connected.found_in(line)
                || StatusTag::Info.found_in(line)
        })
        .await
    }

    /// Leave the current network
    pub async fn disconnect_wifi(&mut self) -> Result<bool, TransportError> {
        let timeout = self.policy.data_timeout;
        self.acknowledged(Command::new(CommandTag::WifiDisconnect), timeout, true, |line| {
            StatusTag::Disconnected.found_in(line) || line.contains(WIFI_STOP_TEXT)
        })
        .await
    }

    /// Networks visible to the board
    pub async fn scan_wifi(&mut self) -> Result<String, TransportError> {
        self.query(Command::new(CommandTag::WifiScan)).await
    }

    /// Address on the joined network
    pub async fn ip_wifi(&mut self) -> Result<String, TransportError> {
        self.query(Command::new(CommandTag::WifiIp)).await
    }

    /// Store credentials on the board
    ///
    /// Empty `ssid` or `password` fails without touching the link.
    pub async fn save_wifi(&mut self, ssid: &str, password: &str) -> Result<bool, TransportError> {
        if ssid.is_empty() || password.is_empty() {
            tracing::warn!("Refusing to save WiFi settings with an empty ssid or password");
            return Ok(false);
        }

        let command = Command::save_wifi(ssid, password);
        let Some(line) = self.exchange(&command, self.policy.data_timeout).await? else {
            self.clear_buffer(false).await?;
            return Ok(false);
        };

        if StatusTag::Success.found_in(&line) {
            // The board follows a save with two more status lines
            self.clear_buffer(false).await?;
            self.clear_buffer(false).await?;
            Ok(true)
        } else {
            tracing::warn!("Failed to save WiFi settings: {}", line);
            self.clear_buffer(false).await?;
            Ok(false)
        }
    }

    // ---- HTTP ----

    /// `GET` without headers
    pub async fn get_request(&mut self, url: &str) -> Result<String, TransportError> {
        self.streamed(Command::get(url), HttpMethod::Get).await
    }

    /// `GET` with caller-formatted headers
    pub async fn get_request_with_headers(&mut self, url: &str, headers: &str) -> Result<String, TransportError> {
        let command = Command::get_with_headers(CommandTag::GetHttp, url, headers);
        self.streamed(command, HttpMethod::Get).await
    }

    /// `GET` whose body the board relays as raw bytes
    ///
    /// Bytes that are not UTF-8 come back as U+FFFD.
    pub async fn get_request_bytes(&mut self, url: &str, headers: &str) -> Result<String, TransportError> {
        let command = Command::get_with_headers(CommandTag::GetBytes, url, headers);
        self.streamed(command, HttpMethod::Get).await
    }

    /// `POST` with headers and payload
    pub async fn post_request_with_headers(
        &mut self,
        url: &str,
        headers: &str,
        payload: &str,
    ) -> Result<String, TransportError> {
        let command = Command::http_with_body(CommandTag::PostHttp, url, headers, payload);
        self.streamed(command, HttpMethod::Post).await
    }

    /// `PUT` with headers and payload
    pub async fn put_request_with_headers(
        &mut self,
        url: &str,
        headers: &str,
        payload: &str,
    ) -> Result<String, TransportError> {
        let command = Command::http_with_body(CommandTag::PutHttp, url, headers, payload);
        self.streamed(command, HttpMethod::Put).await
    }

    /// `DELETE` with headers and payload
    pub async fn delete_request_with_headers(
        &mut self,
        url: &str,
        headers: &str,
        payload: &str,
    ) -> Result<String, TransportError> {
        let command = Command::http_with_body(CommandTag::DeleteHttp, url, headers, payload);
        self.streamed(command, HttpMethod::Delete).await
    }

    /// Dispatch by method
    ///
    /// A `GET` with no headers (empty or `{}`) uses the bare `[GET]` form.
    pub async fn request(
        &mut self,
        method: HttpMethod,
        url: &str,
        headers: &str,
        payload: &str,
    ) -> Result<String, TransportError> {
        match method {
            HttpMethod::Get => {
                let headers = headers.trim();
                if headers.is_empty() || headers == "{}" {
                    self.get_request(url).await
                } else {
                    self.get_request_with_headers(url, headers).await
                }
            }
            HttpMethod::Post => self.post_request_with_headers(url, headers, payload).await,
            HttpMethod::Put => self.put_request_with_headers(url, headers, payload).await,
            HttpMethod::Delete => self.delete_request_with_headers(url, headers, payload).await,
        }
    }

    // ---- JSON ----

    /// Extract `key` from a JSON document, parsed on the board
    pub async fn parse_json(&mut self, key: &str, data: &str) -> Result<String, TransportError> {
        self.query(Command::parse(key, data)).await
    }

    /// Extract element `index` of array `key`, parsed on the board
    pub async fn parse_json_array(&mut self, key: &str, index: usize, data: &str) -> Result<String, TransportError> {
        self.query(Command::parse_array(key, index, data)).await
    }

    // ---- WebSocket ----

    /// Open a WebSocket on the board
    pub async fn websocket_start(&mut self, url: &str, port: u16, headers: &str) -> Result<bool, TransportError> {
        let timeout = self.policy.data_timeout;
        match self.dialect {
            SocketDialect::Ws => {
                let command = Command::socket_start(CommandTag::WsStart, url, port, headers);
                self.acknowledged(command, timeout, true, |line| {
                    StatusTag::Success.found_in(line) || StatusTag::WsStarted.found_in(line)
                })
                .await
            }
            SocketDialect::Socket => {
                let command = Command::socket_start(CommandTag::SocketStart, url, port, headers);
                self.acknowledged(command, timeout, false, |line| !StatusTag::Error.found_in(line))
                    .await
            }
        }
    }

    /// Close the board's WebSocket
    pub async fn websocket_stop(&mut self) -> Result<bool, TransportError> {
        match self.dialect {
            SocketDialect::Ws => {
                let timeout = self.policy.data_timeout;
                self.acknowledged(Command::new(CommandTag::WsStop), timeout, true, |line| {
                    StatusTag::Success.found_in(line) || StatusTag::WsStopped.found_in(line)
                })
                .await
            }
            SocketDialect::Socket => {
                self.send(&Command::new(CommandTag::SocketStop)).await?;
                Ok(true)
            }
        }
    }

    // ---- Composite ----

    /// Ping, both addresses and WiFi state, in that order
    pub async fn status(&mut self) -> Result<BoardStatus, TransportError> {
        let responsive = self.ping().await?;
        let wifi_ip = self.ip_wifi().await?;
        let board_ip = self.ip_address().await?;
        let wifi_connected = self.connect_wifi().await?;

        Ok(BoardStatus {
            responsive,
            wifi_ip,
            board_ip,
            wifi_connected,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transport::MockLineTransport;
    use mockall::Sequence;

    fn fast_policy() -> ReadPolicy {
        ReadPolicy {
            control_timeout: Duration::from_millis(1),
            data_timeout: Duration::from_millis(1),
            drain_timeout: Duration::from_millis(1),
            ..ReadPolicy::default()
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = ReadPolicy::default();
        assert_eq!(policy.control_timeout, Duration::from_millis(100));
        assert_eq!(policy.data_timeout, Duration::from_millis(500));
        assert_eq!(policy.read_attempts, 5);
        assert_eq!(policy.drain_iterations, 5);
        assert_eq!(policy.stream_line_cap, 50);
    }

    #[test]
    fn test_parse_method_and_dialect() {
        assert_eq!("post".parse::<HttpMethod>().unwrap(), HttpMethod::Post);
        assert!("PATCH".parse::<HttpMethod>().is_err());
        assert_eq!("socket".parse::<SocketDialect>().unwrap(), SocketDialect::Socket);
        assert_eq!(HttpMethod::Delete.to_string(), "DELETE");
    }

    #[tokio::test]
    async fn test_read_data_gives_up_after_five_attempts() {
        let mut mock = MockLineTransport::new();
        mock.expect_read_line().times(5).returning(|_| Ok(None));

        let mut client = DevboardClient::new(mock).with_policy(fast_policy());
        let line = client.read_data(Duration::from_millis(1)).await.unwrap();
        assert!(line.is_none());
    }

    #[tokio::test]
    async fn test_read_data_accepts_fifth_attempt() {
        let mut mock = MockLineTransport::new();
        let mut seq = Sequence::new();
        mock.expect_read_line()
            .times(4)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));
        mock.expect_read_line()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some("[PONG]".to_string())));

        let mut client = DevboardClient::new(mock).with_policy(fast_policy());
        let line = client.read_data(Duration::from_millis(1)).await.unwrap();
        assert_eq!(line.as_deref(), Some("[PONG]"));
    }

    #[tokio::test]
    async fn test_read_data_uses_given_timeout() {
        let mut mock = MockLineTransport::new();
        mock.expect_read_line()
            .withf(|timeout| *timeout == Duration::from_millis(100))
            .times(1)
            .returning(|_| Ok(Some("line".to_string())));

        let mut client = DevboardClient::new(mock);
        client.read_data(Duration::from_millis(100)).await.unwrap();
    }

    #[tokio::test]
    async fn test_save_wifi_rejects_empty_arguments_without_io() {
        let mut mock = MockLineTransport::new();
        mock.expect_write().never();
        mock.expect_read_line().never();

        let mut client = DevboardClient::new(mock);
        assert!(!client.save_wifi("", "secret").await.unwrap());
        assert!(!client.save_wifi("home", "").await.unwrap());
    }

    #[tokio::test]
    async fn test_ping_writes_bare_tag() {
        let mut mock = MockLineTransport::new();
        mock.expect_write()
            .withf(|data: &[u8]| data == b"[PING]")
            .times(1)
            .returning(|_| Ok(()));
        let mut seq = Sequence::new();
        mock.expect_read_line()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(Some("[PONG]".to_string())));
        // drain after the reply: one read_data worth of silence
        mock.expect_read_line()
            .times(5)
            .in_sequence(&mut seq)
            .returning(|_| Ok(None));

        let mut client = DevboardClient::new(mock).with_policy(fast_policy());
        assert!(client.ping().await.unwrap());
    }

    #[tokio::test]
    async fn test_link_fault_propagates() {
        let mut mock = MockLineTransport::new();
        mock.expect_write().returning(|_| Ok(()));
        mock.expect_read_line()
            .returning(|_| Err(TransportError::Disconnected));

        let mut client = DevboardClient::new(mock).with_policy(fast_policy());
        assert!(matches!(client.ping().await, Err(TransportError::Disconnected)));
    }

    #[tokio::test]
    async fn test_socket_stop_does_not_wait_for_reply() {
        let mut mock = MockLineTransport::new();
        mock.expect_write()
            .withf(|data: &[u8]| data == b"[SOCKET/STOP]")
            .times(1)
            .returning(|_| Ok(()));
        mock.expect_read_line().never();

        let mut client = DevboardClient::new(mock).with_socket_dialect(SocketDialect::Socket);
        assert!(client.websocket_stop().await.unwrap());
    }

    #[tokio::test]
    async fn test_led_commands_are_fire_and_forget() {
        let mut mock = MockLineTransport::new();
        let mut seq = Sequence::new();
        mock.expect_write()
            .withf(|data: &[u8]| data == b"[LED/ON]")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_write()
            .withf(|data: &[u8]| data == b"[LED/OFF]")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        mock.expect_read_line().never();

        let mut client = DevboardClient::new(mock);
        client.led_on().await.unwrap();
        client.led_off().await.unwrap();
    }
}
