//! Error types for FastOSC

use thiserror::Error;

/// Result type alias for FastOSC core operations
pub type Result<T> = std::result::Result<T, Error>;

/// FastOSC core error types
#[derive(Error, Debug)]
pub enum Error {
    /// Frame built without an address
    #[error("OSC addresses cannot be empty")]
    EmptyAddress,

    /// Explicit type outside the closed tag set
    #[error("arg type must be one of {}, or an array of valid types (got '{0}')", crate::tags::SUPPORTED_TAGS)]
    InvalidTypeTag(String),

    /// Explicit array type applied to a value of a different shape
    #[error("type {ty} does not fit value {value}")]
    TypeMismatch { ty: String, value: String },

    /// The primitive codec refused a value
    #[error("could not build the message: {0}")]
    Encode(String),

    /// Malformed inbound datagram
    #[error("decode error: {0}")]
    Decode(String),

    /// Datagram is neither a message nor a bundle
    #[error("datagram is neither an OSC message nor a bundle")]
    UnknownDatagram,

    /// Wildcard pattern compilation error
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),
}
