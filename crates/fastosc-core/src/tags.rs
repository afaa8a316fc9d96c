//! Wire type tags
//!
//! Every argument is announced by a one-character tag in the
//! comma-prefixed type-tag string that precedes the payloads:
//!
//! ```text
//! i h f d s b r m t   (scalars with payload)
//! T F N               (scalars without payload)
//! [ ]                 (nested sequence start / stop)
//! ```

use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// The twelve scalar tags accepted as explicit argument types
pub const SUPPORTED_TAGS: &str = "fdihtbsrmTFN";

/// A single wire type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Int,
    Long,
    Float,
    Double,
    String,
    Blob,
    Rgba,
    Midi,
    TimeTag,
    True,
    False,
    Nil,
    ArrayStart,
    ArrayStop,
}

impl TypeTag {
    pub fn as_char(&self) -> char {
        match self {
            TypeTag::Int => 'i',
            TypeTag::Long => 'h',
            TypeTag::Float => 'f',
            TypeTag::Double => 'd',
            TypeTag::String => 's',
            TypeTag::Blob => 'b',
            TypeTag::Rgba => 'r',
            TypeTag::Midi => 'm',
            TypeTag::TimeTag => 't',
            TypeTag::True => 'T',
            TypeTag::False => 'F',
            TypeTag::Nil => 'N',
            TypeTag::ArrayStart => '[',
            TypeTag::ArrayStop => ']',
        }
    }

    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(TypeTag::Int),
            'h' => Some(TypeTag::Long),
            'f' => Some(TypeTag::Float),
            'd' => Some(TypeTag::Double),
            's' => Some(TypeTag::String),
            'b' => Some(TypeTag::Blob),
            'r' => Some(TypeTag::Rgba),
            'm' => Some(TypeTag::Midi),
            't' => Some(TypeTag::TimeTag),
            'T' => Some(TypeTag::True),
            'F' => Some(TypeTag::False),
            'N' => Some(TypeTag::Nil),
            '[' => Some(TypeTag::ArrayStart),
            ']' => Some(TypeTag::ArrayStop),
            _ => None,
        }
    }

    /// Everything except the array boundary markers
    pub fn is_scalar(&self) -> bool {
        !matches!(self, TypeTag::ArrayStart | TypeTag::ArrayStop)
    }

    /// Whether a payload follows the tag string for this tag
    pub fn has_payload(&self) -> bool {
        !matches!(
            self,
            TypeTag::True | TypeTag::False | TypeTag::Nil | TypeTag::ArrayStart | TypeTag::ArrayStop
        )
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl TryFrom<char> for TypeTag {
    type Error = Error;

    fn try_from(c: char) -> Result<Self> {
        TypeTag::from_char(c).ok_or_else(|| Error::InvalidTypeTag(c.to_string()))
    }
}

/// The declared type of one argument: a scalar tag, or a nested
/// sequence of declared types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgType {
    Scalar(TypeTag),
    Array(Vec<ArgType>),
}

impl ArgType {
    /// Reject array markers used as scalars, recursively
    pub fn validate(&self) -> Result<()> {
        match self {
            ArgType::Scalar(tag) if tag.is_scalar() => Ok(()),
            ArgType::Scalar(tag) => Err(Error::InvalidTypeTag(tag.to_string())),
            ArgType::Array(items) => items.iter().try_for_each(ArgType::validate),
        }
    }

    /// Append this type's tag characters, array markers included
    pub fn write_tags(&self, out: &mut String) {
        match self {
            ArgType::Scalar(tag) => out.push(tag.as_char()),
            ArgType::Array(items) => {
                out.push('[');
                for item in items {
                    item.write_tags(out);
                }
                out.push(']');
            }
        }
    }
}

impl From<TypeTag> for ArgType {
    fn from(tag: TypeTag) -> Self {
        ArgType::Scalar(tag)
    }
}

impl TryFrom<char> for ArgType {
    type Error = Error;

    fn try_from(c: char) -> Result<Self> {
        let ty = ArgType::Scalar(TypeTag::try_from(c)?);
        ty.validate()?;
        Ok(ty)
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_tags(&mut out);
        f.write_str(&out)
    }
}

/// Parses a single type such as `"i"` or `"[i[sf]]"`
impl FromStr for ArgType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars().peekable();
        let ty = parse_type(&mut chars, s)?;
        if chars.next().is_some() {
            return Err(Error::InvalidTypeTag(s.to_string()));
        }
        Ok(ty)
    }
}

fn parse_type<I>(chars: &mut std::iter::Peekable<I>, source: &str) -> Result<ArgType>
where
    I: Iterator<Item = char>,
{
    match chars.next() {
        Some('[') => {
            let mut items = Vec::new();
            loop {
                match chars.peek() {
                    Some(']') => {
                        chars.next();
                        return Ok(ArgType::Array(items));
                    }
                    Some(_) => items.push(parse_type(chars, source)?),
                    None => return Err(Error::InvalidTypeTag(source.to_string())),
                }
            }
        }
        Some(c) => ArgType::try_from(c),
        None => Err(Error::InvalidTypeTag(source.to_string())),
    }
}
