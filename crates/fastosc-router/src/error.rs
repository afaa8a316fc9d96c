//! Router error types

use fastosc_core::ArgKind;
use std::net::SocketAddr;
use thiserror::Error;

use crate::handler::HandlerError;

pub type Result<T> = std::result::Result<T, RouterError>;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("handler for {address} failed: {source}")]
    Handler {
        address: String,
        #[source]
        source: HandlerError,
    },

    #[error("invalid route {address}: {reason}")]
    InvalidRoute { address: String, reason: String },

    #[error("no sender configured, cannot send to {0}")]
    NoSender(SocketAddr),

    #[error("transport error: {0}")]
    Transport(#[from] fastosc_transport::TransportError),

    #[error("core protocol error: {0}")]
    Core(#[from] fastosc_core::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Received arguments do not fit a route's declared schema
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("expected {expected} arguments, received {received}")]
    ArgumentCount { expected: usize, received: usize },

    #[error("arg {value} of type <{found}> does not match <{expected}>")]
    ArgumentKind {
        index: usize,
        value: String,
        found: ArgKind,
        expected: ArgKind,
    },
}
