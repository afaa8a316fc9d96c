//! FastOSC Transport Layer
//!
//! This crate provides:
//! - The outbound [`DatagramSender`] capability a dispatcher sends through
//! - The inbound [`PacketSink`] capability decoded packets are handed to
//! - A UDP server with a non-blocking pull pump and an async serve loop

pub mod error;
pub mod traits;
pub mod udp;

pub use error::{Result, TransportError};
pub use traits::{DatagramSender, PacketSink};
pub use udp::{UdpServer, UdpServerConfig, ERROR_BACKOFF};
