//! Argument values and their runtime kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::time::SystemTime;

/// A single message argument.
///
/// Floats compare and hash by bit pattern so values can take part in
/// listener keys.
#[derive(Debug, Clone)]
pub enum ArgValue {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Blob(Vec<u8>),
    Time(SystemTime),
    /// Fixed-size grouping. Four integers are sent as a MIDI packet.
    Tuple(Vec<ArgValue>),
    /// Variable-length nested sequence
    Array(Vec<ArgValue>),
}

impl ArgValue {
    pub fn kind(&self) -> ArgKind {
        match self {
            ArgValue::Nil => ArgKind::Nil,
            ArgValue::Bool(_) => ArgKind::Bool,
            ArgValue::Int(_) => ArgKind::Int,
            ArgValue::Float(_) => ArgKind::Float,
            ArgValue::String(_) => ArgKind::String,
            ArgValue::Blob(_) => ArgKind::Blob,
            ArgValue::Time(_) => ArgKind::Time,
            ArgValue::Tuple(_) => ArgKind::Tuple,
            ArgValue::Array(_) => ArgKind::Array,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, ArgValue::Nil)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ArgValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Floats, or integers widened to a float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ArgValue::Float(f) => Some(*f),
            ArgValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ArgValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            ArgValue::Blob(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_time(&self) -> Option<SystemTime> {
        match self {
            ArgValue::Time(t) => Some(*t),
            _ => None,
        }
    }

    /// Elements of a tuple or array
    pub fn elements(&self) -> Option<&[ArgValue]> {
        match self {
            ArgValue::Tuple(items) | ArgValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// A four-element tuple made only of integers
    pub fn is_midi_like(&self) -> bool {
        match self {
            ArgValue::Tuple(items) => {
                items.len() == 4 && items.iter().all(|v| matches!(v, ArgValue::Int(_)))
            }
            _ => false,
        }
    }
}

impl PartialEq for ArgValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArgValue::Nil, ArgValue::Nil) => true,
            (ArgValue::Bool(a), ArgValue::Bool(b)) => a == b,
            (ArgValue::Int(a), ArgValue::Int(b)) => a == b,
            (ArgValue::Float(a), ArgValue::Float(b)) => a.to_bits() == b.to_bits(),
            (ArgValue::String(a), ArgValue::String(b)) => a == b,
            (ArgValue::Blob(a), ArgValue::Blob(b)) => a == b,
            (ArgValue::Time(a), ArgValue::Time(b)) => a == b,
            (ArgValue::Tuple(a), ArgValue::Tuple(b)) => a == b,
            (ArgValue::Array(a), ArgValue::Array(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ArgValue {}

impl Hash for ArgValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ArgValue::Nil => {}
            ArgValue::Bool(b) => b.hash(state),
            ArgValue::Int(i) => i.hash(state),
            ArgValue::Float(f) => f.to_bits().hash(state),
            ArgValue::String(s) => s.hash(state),
            ArgValue::Blob(b) => b.hash(state),
            ArgValue::Time(t) => t.hash(state),
            ArgValue::Tuple(items) | ArgValue::Array(items) => items.hash(state),
        }
    }
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[ArgValue]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            ArgValue::Nil => write!(f, "nil"),
            ArgValue::Bool(b) => write!(f, "{}", b),
            ArgValue::Int(i) => write!(f, "{}", i),
            ArgValue::Float(v) => write!(f, "{:?}", v),
            ArgValue::String(s) => write!(f, "'{}'", s),
            ArgValue::Blob(b) => write!(f, "<blob {} bytes>", b.len()),
            ArgValue::Time(t) => match t.duration_since(SystemTime::UNIX_EPOCH) {
                Ok(d) => write!(f, "<time {}.{:09}>", d.as_secs(), d.subsec_nanos()),
                Err(_) => write!(f, "<time before epoch>"),
            },
            ArgValue::Tuple(items) => {
                write!(f, "(")?;
                join(f, items)?;
                write!(f, ")")
            }
            ArgValue::Array(items) => {
                write!(f, "[")?;
                join(f, items)?;
                write!(f, "]")
            }
        }
    }
}

impl From<bool> for ArgValue {
    fn from(v: bool) -> Self {
        ArgValue::Bool(v)
    }
}

impl From<i32> for ArgValue {
    fn from(v: i32) -> Self {
        ArgValue::Int(v as i64)
    }
}

impl From<i64> for ArgValue {
    fn from(v: i64) -> Self {
        ArgValue::Int(v)
    }
}

impl From<u8> for ArgValue {
    fn from(v: u8) -> Self {
        ArgValue::Int(v as i64)
    }
}

impl From<u32> for ArgValue {
    fn from(v: u32) -> Self {
        ArgValue::Int(v as i64)
    }
}

impl From<f32> for ArgValue {
    fn from(v: f32) -> Self {
        ArgValue::Float(v as f64)
    }
}

impl From<f64> for ArgValue {
    fn from(v: f64) -> Self {
        ArgValue::Float(v)
    }
}

impl From<String> for ArgValue {
    fn from(v: String) -> Self {
        ArgValue::String(v)
    }
}

impl From<&str> for ArgValue {
    fn from(v: &str) -> Self {
        ArgValue::String(v.to_string())
    }
}

impl From<Vec<u8>> for ArgValue {
    fn from(v: Vec<u8>) -> Self {
        ArgValue::Blob(v)
    }
}

impl From<&[u8]> for ArgValue {
    fn from(v: &[u8]) -> Self {
        ArgValue::Blob(v.to_vec())
    }
}

impl From<SystemTime> for ArgValue {
    fn from(v: SystemTime) -> Self {
        ArgValue::Time(v)
    }
}

impl From<Vec<ArgValue>> for ArgValue {
    fn from(v: Vec<ArgValue>) -> Self {
        ArgValue::Array(v)
    }
}

impl<T: Into<ArgValue>> From<Option<T>> for ArgValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ArgValue::Nil)
    }
}

/// Runtime kind of an argument, used for declared parameter schemas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgKind {
    Nil,
    Bool,
    Int,
    Float,
    String,
    Blob,
    Time,
    Tuple,
    Array,
    /// Accepts any value
    Any,
}

impl ArgKind {
    pub fn name(&self) -> &'static str {
        match self {
            ArgKind::Nil => "nil",
            ArgKind::Bool => "bool",
            ArgKind::Int => "int",
            ArgKind::Float => "float",
            ArgKind::String => "str",
            ArgKind::Blob => "bytes",
            ArgKind::Time => "time",
            ArgKind::Tuple => "tuple",
            ArgKind::Array => "list",
            ArgKind::Any => "any",
        }
    }

    /// Whether a received value satisfies this declared kind
    pub fn accepts(&self, value: &ArgValue) -> bool {
        *self == ArgKind::Any || *self == value.kind()
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
