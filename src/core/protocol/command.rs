//! Outbound command construction
//!
//! Payloads are assembled by plain concatenation. Headers, payload bodies and
//! `data` arguments are caller-formatted JSON-like text and go out verbatim;
//! nothing is escaped or validated here.

use std::fmt;

/// Command tags understood by the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandTag {
    /// `[PING]`
    Ping,
    /// `[LIST]`
    List,
    /// `[LED/ON]`
    LedOn,
    /// `[LED/OFF]`
    LedOff,
    /// `[WIFI/CONNECT]`
    WifiConnect,
    /// `[WIFI/DISCONNECT]`
    WifiDisconnect,
    /// `[WIFI/SCAN]`
    WifiScan,
    /// `[WIFI/SAVE]`
    WifiSave,
    /// `[WIFI/IP]`
    WifiIp,
    /// `[IP/ADDRESS]`
    IpAddress,
    /// `[GET]`
    Get,
    /// `[GET/HTTP]`
    GetHttp,
    /// `[GET/BYTES]`
    GetBytes,
    /// `[POST/HTTP]`
    PostHttp,
    /// `[PUT/HTTP]`
    PutHttp,
    /// `[DELETE/HTTP]`
    DeleteHttp,
    /// `[PARSE]`
    Parse,
    /// `[PARSE/ARRAY]`
    ParseArray,
    /// `[WS/START]`
    WsStart,
    /// `[WS/STOP]`
    WsStop,
    /// `[SOCKET/START]`
    SocketStart,
    /// `[SOCKET/STOP]`
    SocketStop,
}

impl CommandTag {
    /// Literal tag text
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ping => "[PING]",
            Self::List => "[LIST]",
            Self::LedOn => "[LED/ON]",
            Self::LedOff => "[LED/OFF]",
            Self::WifiConnect => "[WIFI/CONNECT]",
            Self::WifiDisconnect => "[WIFI/DISCONNECT]",
            Self::WifiScan => "[WIFI/SCAN]",
            Self::WifiSave => "[WIFI/SAVE]",
            Self::WifiIp => "[WIFI/IP]",
            Self::IpAddress => "[IP/ADDRESS]",
            Self::Get => "[GET]",
            Self::GetHttp => "[GET/HTTP]",
            Self::GetBytes => "[GET/BYTES]",
            Self::PostHttp => "[POST/HTTP]",
            Self::PutHttp => "[PUT/HTTP]",
            Self::DeleteHttp => "[DELETE/HTTP]",
            Self::Parse => "[PARSE]",
            Self::ParseArray => "[PARSE/ARRAY]",
            Self::WsStart => "[WS/START]",
            Self::WsStop => "[WS/STOP]",
            Self::SocketStart => "[SOCKET/START]",
            Self::SocketStop => "[SOCKET/STOP]",
        }
    }
}

impl fmt::Display for CommandTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single outbound command: tag plus optional raw payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    tag: CommandTag,
    payload: Option<String>,
}

impl Command {
    /// Bare tag with no payload
    pub fn new(tag: CommandTag) -> Self {
        Self { tag, payload: None }
    }

    /// Tag followed directly by `payload`
    pub fn with_payload(tag: CommandTag, payload: impl Into<String>) -> Self {
        Self {
            tag,
            payload: Some(payload.into()),
        }
    }

    /// `[WIFI/SAVE]{"ssid":"..","password":".."}`
    pub fn save_wifi(ssid: &str, password: &str) -> Self {
        Self::with_payload(
            CommandTag::WifiSave,
            format!(r#"{{"ssid":"{ssid}","password":"{password}"}}"#),
        )
    }

    /// `[GET]<url>`
    pub fn get(url: &str) -> Self {
        Self::with_payload(CommandTag::Get, url)
    }

    /// `[GET/HTTP]` or `[GET/BYTES]` with `{url:"..",headers:..}`
    ///
    /// The board's GET parser takes bare keys here, unlike the other verbs.
    pub fn get_with_headers(tag: CommandTag, url: &str, headers: &str) -> Self {
        Self::with_payload(tag, format!(r#"{{url:"{url}",headers:{headers}}}"#))
    }

    /// `[POST|PUT|DELETE/HTTP]{"url":"..","headers":..,"payload":..}`
    pub fn http_with_body(tag: CommandTag, url: &str, headers: &str, payload: &str) -> Self {
        Self::with_payload(
            tag,
            format!(r#"{{"url":"{url}","headers":{headers},"payload":{payload}}}"#),
        )
    }

    /// `[PARSE]{"key":"..","data":..}`
    pub fn parse(key: &str, data: &str) -> Self {
        Self::with_payload(CommandTag::Parse, format!(r#"{{"key":"{key}","data":{data}}}"#))
    }

    /// `[PARSE/ARRAY]{"key":"..","index":..,"data":..}`
    pub fn parse_array(key: &str, index: usize, data: &str) -> Self {
        Self::with_payload(
            CommandTag::ParseArray,
            format!(r#"{{"key":"{key}","index":{index},"data":{data}}}"#),
        )
    }

    /// `[WS/START]` or `[SOCKET/START]` with `{"url":"..","port":..,"headers":..}`
    pub fn socket_start(tag: CommandTag, url: &str, port: u16, headers: &str) -> Self {
        Self::with_payload(
            tag,
            format!(r#"{{"url":"{url}","port":{port},"headers":{headers}}}"#),
        )
    }

    /// Command tag
    pub fn tag(&self) -> CommandTag {
        self.tag
    }

    /// Full wire text
    pub fn render(&self) -> String {
        match &self.payload {
            Some(payload) => format!("{}{}", self.tag.as_str(), payload),
            None => self.tag.as_str().to_string(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag.as_str())?;
        if let Some(payload) = &self.payload {
            f.write_str(payload)?;
        }
        Ok(())
    }
}
