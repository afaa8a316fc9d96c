//! FastOSC Core
//!
//! Core types and encoding for the FastOSC control protocol: UDP datagrams
//! addressed to slash-delimited paths, each carrying a typed argument list.
//!
//! This crate provides:
//! - Argument values and their runtime kinds ([`ArgValue`], [`ArgKind`])
//! - The closed set of wire type tags ([`TypeTag`], [`ArgType`])
//! - Outbound frame assembly with type inference ([`MessageBuilder`], [`Frame`])
//! - Inbound datagram classification and decoding ([`Packet`], [`decode`])
//! - Address normalization and wildcard patterns ([`address`])
//!
//! Primitive wire encoding is delegated to [`rosc`].

pub mod address;
pub mod builder;
pub mod error;
pub mod packet;
pub mod tags;
pub mod types;

pub use address::{WildcardMatch, WildcardPattern};
pub use builder::{encode_message, infer_type, Frame, MessageBuilder, TypedArgument};
pub use error::{Error, Result};
pub use packet::{decode, is_bundle, is_message, Bundle, Message, Packet};
pub use rosc::OscTime;
pub use tags::{ArgType, TypeTag};
pub use types::{ArgKind, ArgValue};

/// Default UDP port for FastOSC servers
pub const DEFAULT_PORT: u16 = 11000;

/// Receive buffer size; large enough for any UDP payload
pub const MAX_DATAGRAM_SIZE: usize = 65536;
