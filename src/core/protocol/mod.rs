//! Wire protocol spoken by the companion board
//!
//! - Command tags and payload construction
//! - Reply marker vocabulary and line classification

pub mod command;
pub mod tags;

pub use command::{Command, CommandTag};
pub use tags::{classify, contains_any, ends_drain, StatusTag, DRAIN_STOP_TAGS, WIFI_STOP_TEXT};
