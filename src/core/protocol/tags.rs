//! Status markers and line classification
//!
//! The board decorates its replies with bracketed markers such as `[PONG]`
//! or `[GET/END]`. A line is "of kind X" iff its text contains X's marker
//! anywhere; the firmware is free to prefix or suffix extra text.

use std::fmt;

/// Reply marker vocabulary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusTag {
    /// `[SUCCESS]`
    Success,
    /// `[ERROR]`
    Error,
    /// `[INFO]`
    Info,
    /// `[PONG]`
    Pong,
    /// `[CONNECTED]`
    Connected,
    /// `[DISCONNECTED]`
    Disconnected,
    /// `[GET/STARTED]`
    GetStarted,
    /// `[GET/SUCCESS]`
    GetSuccess,
    /// `[GET/END]`
    GetEnd,
    /// `[POST/SUCCESS]`
    PostSuccess,
    /// `[POST/END]`
    PostEnd,
    /// `[PUT/SUCCESS]`
    PutSuccess,
    /// `[PUT/END]`
    PutEnd,
    /// `[DELETE/SUCCESS]`
    DeleteSuccess,
    /// `[DELETE/END]`
    DeleteEnd,
    /// `[WS/STARTED]`
    WsStarted,
    /// `[WS/STOPPED]`
    WsStopped,
}

/// Classification order. `[ERROR]` wins over anything else on the same line.
const CLASSIFY_ORDER: [StatusTag; 17] = [
    StatusTag::Error,
    StatusTag::Pong,
    StatusTag::Disconnected,
    StatusTag::Connected,
    StatusTag::Info,
    StatusTag::GetStarted,
    StatusTag::GetSuccess,
    StatusTag::GetEnd,
    StatusTag::PostSuccess,
    StatusTag::PostEnd,
    StatusTag::PutSuccess,
    StatusTag::PutEnd,
    StatusTag::DeleteSuccess,
    StatusTag::DeleteEnd,
    StatusTag::WsStarted,
    StatusTag::WsStopped,
    StatusTag::Success,
];

/// Markers that end a buffer drain, `[SUCCESS]` excepted
///
/// POST, PUT, DELETE and WebSocket end markers are left out to keep drains
/// compatible with the companion scripts the firmware ships, so a drain after
/// those verbs runs on until silence or its iteration cap.
pub const DRAIN_STOP_TAGS: [StatusTag; 7] = [
    StatusTag::Error,
    StatusTag::Info,
    StatusTag::Pong,
    StatusTag::Disconnected,
    StatusTag::Connected,
    StatusTag::GetStarted,
    StatusTag::GetEnd,
];

/// Plain-text reply some firmware builds print after stopping WiFi
pub const WIFI_STOP_TEXT: &str = "WiFi stop";

impl StatusTag {
    /// Literal marker text
    pub fn marker(&self) -> &'static str {
        match self {
            Self::Success => "[SUCCESS]",
            Self::Error => "[ERROR]",
            Self::Info => "[INFO]",
            Self::Pong => "[PONG]",
            Self::Connected => "[CONNECTED]",
            Self::Disconnected => "[DISCONNECTED]",
            Self::GetStarted => "[GET/STARTED]",
            Self::GetSuccess => "[GET/SUCCESS]",
            Self::GetEnd => "[GET/END]",
            Self::PostSuccess => "[POST/SUCCESS]",
            Self::PostEnd => "[POST/END]",
            Self::PutSuccess => "[PUT/SUCCESS]",
            Self::PutEnd => "[PUT/END]",
            Self::DeleteSuccess => "[DELETE/SUCCESS]",
            Self::DeleteEnd => "[DELETE/END]",
            Self::WsStarted => "[WS/STARTED]",
            Self::WsStopped => "[WS/STOPPED]",
        }
    }

    /// Whether `line` carries this marker
    pub fn found_in(&self, line: &str) -> bool {
        line.contains(self.marker())
    }

    /// All tags, in classification order
    pub fn all() -> &'static [StatusTag] {
        &CLASSIFY_ORDER
    }
}

impl fmt::Display for StatusTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Map a line to the first marker it contains
pub fn classify(line: &str) -> Option<StatusTag> {
    CLASSIFY_ORDER.iter().copied().find(|tag| tag.found_in(line))
}

/// Whether `line` carries any of `tags`
pub fn contains_any(line: &str, tags: &[StatusTag]) -> bool {
    tags.iter().any(|tag| tag.found_in(line))
}

/// Whether a drained line lets the drain stop
///
/// With `search_for_success` unset, `[SUCCESS]` lines are treated as noise
/// and drained like any other.
pub fn ends_drain(line: &str, search_for_success: bool) -> bool {
    (search_for_success && StatusTag::Success.found_in(line)) || contains_any(line, &DRAIN_STOP_TAGS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_uses_containment() {
        assert_eq!(classify("[PONG]"), Some(StatusTag::Pong));
        assert_eq!(classify("board says [PONG] ok"), Some(StatusTag::Pong));
        assert_eq!(classify("PONG"), None);
        assert_eq!(classify(""), None);
    }

    #[test]
    fn test_similar_markers_do_not_collide() {
        assert_eq!(classify("[DISCONNECTED]"), Some(StatusTag::Disconnected));
        assert!(!StatusTag::Connected.found_in("[DISCONNECTED]"));
        assert_eq!(classify("[GET/SUCCESS]"), Some(StatusTag::GetSuccess));
        assert!(!StatusTag::Success.found_in("[GET/SUCCESS]"));
    }

    #[test]
    fn test_error_dominates() {
        assert_eq!(classify("[SUCCESS] [ERROR] partial"), Some(StatusTag::Error));
    }

    #[test]
    fn test_every_tag_classifies_to_itself() {
        for tag in StatusTag::all() {
            assert_eq!(classify(tag.marker()), Some(*tag), "{tag}");
        }
    }

    #[test]
    fn test_drain_stop_rules() {
        assert!(ends_drain("[SUCCESS] saved", true));
        assert!(!ends_drain("[SUCCESS] saved", false));
        assert!(ends_drain("[INFO] connecting", false));
        assert!(ends_drain("[GET/END]", false));
        assert!(!ends_drain("stray echo", true));
        assert!(!ends_drain("[POST/END]", true));
    }
}
