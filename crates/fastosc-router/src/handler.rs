//! Handler callbacks, outcomes and route metadata

use fastosc_core::{ArgKind, ArgValue};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::SystemTime;
use thiserror::Error;

/// Column the parameter list starts at in route summaries
pub const SUMMARY_ADDRESS_WIDTH: usize = 45;

/// What a handler made of one call
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Send these values back to the caller
    Reply(Vec<ArgValue>),
    /// Nothing to send
    Silent,
    /// The arguments do not fit this handler; skipped without a reply
    NotApplicable(String),
}

impl Outcome {
    /// An empty list and the single `[Nil]` sentinel both mean "no response"
    pub fn reply(values: Vec<ArgValue>) -> Self {
        match values.as_slice() {
            [] | [ArgValue::Nil] => Outcome::Silent,
            _ => Outcome::Reply(values),
        }
    }

    pub fn not_applicable(reason: impl Into<String>) -> Self {
        Outcome::NotApplicable(reason.into())
    }

    pub fn is_applicable(&self) -> bool {
        !matches!(self, Outcome::NotApplicable(_))
    }

    pub fn reply_values(&self) -> Option<&[ArgValue]> {
        match self {
            Outcome::Reply(values) => Some(values),
            _ => None,
        }
    }
}

/// A handler failure.
///
/// [`HandlerError::Argument`] means the handler does not apply to the
/// arguments it was given; the dispatcher treats it like
/// [`Outcome::NotApplicable`]. Every other variant is a hard failure.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("{0}")]
    Failed(String),

    #[error("argument {index} is not a valid <{expected}>")]
    Argument { index: usize, expected: ArgKind },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HandlerError {
    pub fn failed(message: impl Into<String>) -> Self {
        HandlerError::Failed(message.into())
    }
}

pub type HandlerResult = std::result::Result<Outcome, HandlerError>;

/// A registered callback: (arguments, remote endpoint) to outcome
pub type Handler = Arc<dyn Fn(&[ArgValue], SocketAddr) -> HandlerResult + Send + Sync>;

/// Normalizes what a route procedure returns into a response list.
///
/// Lists pass through unchanged, a bare value becomes a one-element list.
pub trait IntoReply {
    fn into_reply(self) -> Vec<ArgValue>;
}

impl IntoReply for Vec<ArgValue> {
    fn into_reply(self) -> Vec<ArgValue> {
        self
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Vec<ArgValue> {
        Vec::new()
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Vec<ArgValue> {
        match self {
            Some(v) => v.into_reply(),
            None => vec![ArgValue::Nil],
        }
    }
}

macro_rules! impl_into_reply {
    ($($t:ty),*) => {
        $(
            impl IntoReply for $t {
                fn into_reply(self) -> Vec<ArgValue> {
                    vec![ArgValue::from(self)]
                }
            }
        )*
    };
}

impl_into_reply!(ArgValue, bool, i32, i64, u8, u32, f32, f64, String, &str, Vec<u8>, SystemTime);

/// One declared parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamInfo {
    pub name: String,
    pub kind: ArgKind,
}

impl ParamInfo {
    pub fn new(name: impl Into<String>, kind: ArgKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Descriptive metadata attached to a registration.
///
/// Only used for introspection; dispatch never looks at it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandlerInfo {
    pub function_name: Option<String>,
    pub params: Vec<ParamInfo>,
    pub result_type: String,
    pub doc: Option<String>,
}

/// A registration with its metadata, as listed by
/// [`Dispatcher::descriptions`](crate::Dispatcher::descriptions)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlerDescription {
    pub address: String,
    pub function_name: Option<String>,
    pub params: Vec<ParamInfo>,
    pub result_type: String,
    pub doc: Option<String>,
}

impl HandlerDescription {
    pub fn new(address: impl Into<String>, info: HandlerInfo) -> Self {
        Self {
            address: address.into(),
            function_name: info.function_name,
            params: info.params,
            result_type: info.result_type,
            doc: info.doc,
        }
    }

    /// Human-readable route line, e.g.
    /// `Added route /song/get/tempo      [] -> [float]`
    pub fn summary(&self) -> String {
        let params = self
            .params
            .iter()
            .map(|p| format!("{}:{}", p.name, p.kind))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "Added route {:<width$}[{}] -> [{}]",
            self.address,
            params,
            self.result_type,
            width = SUMMARY_ADDRESS_WIDTH
        )
    }
}
