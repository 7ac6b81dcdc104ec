//! Core of the board client
//!
//! This module provides:
//! - Line transports (serial port, TCP bridge)
//! - Wire protocol vocabulary (command tags, status markers)
//! - The protocol client with one method per board capability
//! - Session lifecycle
//! - Transcript logging
//! - An in-memory virtual board

pub mod client;
pub mod logger;
pub mod protocol;
pub mod session;
pub mod simulator;
pub mod transport;
