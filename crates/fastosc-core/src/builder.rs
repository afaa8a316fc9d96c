//! Outbound message builder
//!
//! Collects an ordered argument list, inferring a wire type tag for each
//! value unless one is supplied, and assembles the encoded frame.
//!
//! # Example
//!
//! ```
//! use fastosc_core::{ArgValue, MessageBuilder};
//!
//! let mut builder = MessageBuilder::with_address("/live/tempo");
//! builder.add_argument(true)?.add_argument(120)?.add_argument(0.5)?;
//! let frame = builder.build()?;
//! assert_eq!(frame.type_tags(), ",Tif");
//! # Ok::<(), fastosc_core::Error>(())
//! ```

use bytes::Bytes;
use rosc::{OscArray, OscColor, OscMessage, OscMidiMessage, OscPacket, OscTime, OscType};

use crate::tags::{ArgType, TypeTag};
use crate::types::ArgValue;
use crate::{Error, Result};

/// One entry of the argument list. Array boundary markers carry no value.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedArgument {
    pub tag: TypeTag,
    pub value: Option<ArgValue>,
}

impl TypedArgument {
    fn marker(tag: TypeTag) -> Self {
        Self { tag, value: None }
    }
}

/// Infer the wire type of a value.
///
/// Booleans get their dedicated tags, integers pick `i` or `h` by range,
/// floats are sent as `f`, a four-integer tuple is a MIDI packet and any
/// other grouping becomes a nested sequence.
pub fn infer_type(value: &ArgValue) -> ArgType {
    let tag = match value {
        ArgValue::String(_) => TypeTag::String,
        ArgValue::Blob(_) => TypeTag::Blob,
        ArgValue::Bool(true) => TypeTag::True,
        ArgValue::Bool(false) => TypeTag::False,
        ArgValue::Time(_) => TypeTag::TimeTag,
        ArgValue::Int(i) => {
            if i32::try_from(*i).is_ok() {
                TypeTag::Int
            } else {
                TypeTag::Long
            }
        }
        ArgValue::Float(_) => TypeTag::Float,
        v if v.is_midi_like() => TypeTag::Midi,
        ArgValue::Tuple(items) | ArgValue::Array(items) => {
            return ArgType::Array(items.iter().map(infer_type).collect());
        }
        ArgValue::Nil => TypeTag::Nil,
    };
    ArgType::Scalar(tag)
}

/// Builds frames for a single address
#[derive(Debug, Clone, Default)]
pub struct MessageBuilder {
    address: Option<String>,
    args: Vec<TypedArgument>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            address: Some(address.into()),
            args: Vec::new(),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    /// The (tag, value) list accumulated so far
    pub fn args(&self) -> &[TypedArgument] {
        &self.args
    }

    /// Append a value, inferring its type
    pub fn add_argument(&mut self, value: impl Into<ArgValue>) -> Result<&mut Self> {
        let value = value.into();
        let ty = infer_type(&value);
        self.add_typed_argument(value, ty)
    }

    /// Append a value with an explicit type.
    ///
    /// Fails immediately if the type uses a tag outside the closed set, or
    /// if an array type does not line up with the value's elements. Nothing
    /// is appended on failure.
    pub fn add_typed_argument(&mut self, value: impl Into<ArgValue>, ty: ArgType) -> Result<&mut Self> {
        ty.validate()?;
        let mut staged = Vec::new();
        stage(&mut staged, value.into(), &ty)?;
        self.args.extend(staged);
        Ok(self)
    }

    /// The comma-prefixed type-tag string
    pub fn type_tags(&self) -> String {
        let mut tags = String::with_capacity(self.args.len() + 1);
        tags.push(',');
        tags.extend(self.args.iter().map(|a| a.tag.as_char()));
        tags
    }

    /// Encode the frame: address, type-tag string, then each payload in
    /// argument order.
    pub fn build(&self) -> Result<Frame> {
        let address = match self.address.as_deref() {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => return Err(Error::EmptyAddress),
        };

        let message = OscMessage {
            addr: address.clone(),
            args: to_osc_args(&self.args)?,
        };
        let bytes = rosc::encoder::encode(&OscPacket::Message(message))
            .map_err(|e| Error::Encode(e.to_string()))?;

        Ok(Frame {
            address,
            type_tags: self.type_tags(),
            args: self.args.clone(),
            bytes: Bytes::from(bytes),
        })
    }
}

/// Build a frame from an address and values, inferring every type
pub fn encode_message(address: &str, args: &[ArgValue]) -> Result<Frame> {
    let mut builder = MessageBuilder::with_address(address);
    for arg in args {
        builder.add_argument(arg.clone())?;
    }
    builder.build()
}

/// An encoded message ready for the transport
#[derive(Debug, Clone)]
pub struct Frame {
    address: String,
    type_tags: String,
    args: Vec<TypedArgument>,
    bytes: Bytes,
}

impl Frame {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn type_tags(&self) -> &str {
        &self.type_tags
    }

    pub fn args(&self) -> &[TypedArgument] {
        &self.args
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes
    }
}

fn stage(out: &mut Vec<TypedArgument>, value: ArgValue, ty: &ArgType) -> Result<()> {
    match ty {
        ArgType::Scalar(tag) => {
            out.push(TypedArgument {
                tag: *tag,
                value: Some(value),
            });
            Ok(())
        }
        ArgType::Array(types) => {
            let items = match value {
                ArgValue::Tuple(items) | ArgValue::Array(items) if items.len() == types.len() => items,
                other => {
                    return Err(Error::TypeMismatch {
                        ty: ty.to_string(),
                        value: other.to_string(),
                    })
                }
            };
            out.push(TypedArgument::marker(TypeTag::ArrayStart));
            for (item, item_ty) in items.into_iter().zip(types) {
                stage(out, item, item_ty)?;
            }
            out.push(TypedArgument::marker(TypeTag::ArrayStop));
            Ok(())
        }
    }
}

/// Fold the flat (tag, value) list back into the codec's nested arguments
fn to_osc_args(args: &[TypedArgument]) -> Result<Vec<OscType>> {
    let mut stack: Vec<Vec<OscType>> = vec![Vec::new()];

    for arg in args {
        match arg.tag {
            TypeTag::ArrayStart => stack.push(Vec::new()),
            TypeTag::ArrayStop => {
                if stack.len() < 2 {
                    return Err(Error::Encode("unbalanced array stop".to_string()));
                }
                let content = stack.pop().unwrap_or_default();
                if let Some(parent) = stack.last_mut() {
                    parent.push(OscType::Array(OscArray { content }));
                }
            }
            tag => {
                let value = arg
                    .value
                    .as_ref()
                    .ok_or_else(|| Error::Encode(format!("missing value for '{}'", tag)))?;
                let encoded = encode_scalar(tag, value)?;
                if let Some(current) = stack.last_mut() {
                    current.push(encoded);
                }
            }
        }
    }

    if stack.len() != 1 {
        return Err(Error::Encode("unbalanced array start".to_string()));
    }
    Ok(stack.pop().unwrap_or_default())
}

fn encode_scalar(tag: TypeTag, value: &ArgValue) -> Result<OscType> {
    let mismatch = || Error::Encode(format!("{} is not a valid '{}' argument", value, tag));

    let encoded = match (tag, value) {
        (TypeTag::Int, ArgValue::Int(i)) => OscType::Int(
            i32::try_from(*i).map_err(|_| Error::Encode(format!("{} does not fit in 32 bits", i)))?,
        ),
        (TypeTag::Long, ArgValue::Int(i)) => OscType::Long(*i),
        (TypeTag::Float, ArgValue::Float(f)) => OscType::Float(*f as f32),
        (TypeTag::Float, ArgValue::Int(i)) => OscType::Float(*i as f32),
        (TypeTag::Double, ArgValue::Float(f)) => OscType::Double(*f),
        (TypeTag::Double, ArgValue::Int(i)) => OscType::Double(*i as f64),
        (TypeTag::String, ArgValue::String(s)) => OscType::String(s.clone()),
        (TypeTag::Blob, ArgValue::Blob(b)) => OscType::Blob(b.clone()),
        (TypeTag::Rgba, v) => {
            let [red, green, blue, alpha] = four_bytes(v).ok_or_else(mismatch)?;
            OscType::Color(OscColor {
                red,
                green,
                blue,
                alpha,
            })
        }
        (TypeTag::Midi, v) => {
            let [port, status, data1, data2] = four_bytes(v).ok_or_else(mismatch)?;
            OscType::Midi(OscMidiMessage {
                port,
                status,
                data1,
                data2,
            })
        }
        (TypeTag::TimeTag, ArgValue::Time(t)) => OscType::Time(
            OscTime::try_from(*t).map_err(|e| Error::Encode(format!("invalid timetag: {:?}", e)))?,
        ),
        (TypeTag::True, _) => OscType::Bool(true),
        (TypeTag::False, _) => OscType::Bool(false),
        (TypeTag::Nil, _) => OscType::Nil,
        _ => return Err(mismatch()),
    };
    Ok(encoded)
}

/// A four-element grouping of integers in byte range
fn four_bytes(value: &ArgValue) -> Option<[u8; 4]> {
    let items = value.elements()?;
    if items.len() != 4 {
        return None;
    }
    let mut out = [0u8; 4];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = u8::try_from(item.as_i64()?).ok()?;
    }
    Some(out)
}
