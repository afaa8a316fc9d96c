//! Transport capability traits

use fastosc_core::Packet;
use std::fmt;
use std::net::SocketAddr;

use crate::error::Result;

/// Hands encoded frames to the network.
///
/// Sends are synchronous; dispatch never suspends.
pub trait DatagramSender: Send + Sync {
    fn send_to(&self, data: &[u8], remote: SocketAddr) -> Result<()>;
}

/// Receives decoded inbound packets
pub trait PacketSink: Send + Sync {
    type Error: fmt::Display;

    fn process_packet(&self, packet: &Packet, remote: SocketAddr) -> std::result::Result<(), Self::Error>;
}
