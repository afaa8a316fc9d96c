//! Inbound datagram classification and decoding

use rosc::{OscPacket, OscTime, OscType};
use std::time::SystemTime;

use crate::types::ArgValue;
use crate::{Error, Result};

/// Leading bytes of every bundle datagram
pub const BUNDLE_TAG: &[u8] = b"#bundle\0";

/// Timetag meaning "process immediately"
pub const IMMEDIATELY: OscTime = OscTime {
    seconds: 0,
    fractional: 1,
};

/// A datagram holding a single message starts with an address
pub fn is_message(data: &[u8]) -> bool {
    data.first() == Some(&b'/')
}

pub fn is_bundle(data: &[u8]) -> bool {
    data.starts_with(BUNDLE_TAG)
}

/// A decoded message: address plus ordered arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub address: String,
    pub args: Vec<ArgValue>,
}

impl Message {
    pub fn new(address: impl Into<String>, args: Vec<ArgValue>) -> Self {
        Self {
            address: address.into(),
            args,
        }
    }
}

/// An ordered collection of messages and nested bundles
#[derive(Debug, Clone, PartialEq)]
pub struct Bundle {
    pub timetag: OscTime,
    pub content: Vec<Packet>,
}

impl Bundle {
    pub fn immediate(content: Vec<Packet>) -> Self {
        Self {
            timetag: IMMEDIATELY,
            content,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Message(Message),
    Bundle(Bundle),
}

impl From<Message> for Packet {
    fn from(m: Message) -> Self {
        Packet::Message(m)
    }
}

impl From<Bundle> for Packet {
    fn from(b: Bundle) -> Self {
        Packet::Bundle(b)
    }
}

/// Classify and decode a raw datagram
pub fn decode(data: &[u8]) -> Result<Packet> {
    if !is_message(data) && !is_bundle(data) {
        return Err(Error::UnknownDatagram);
    }
    let (_, packet) = rosc::decoder::decode_udp(data).map_err(|e| Error::Decode(e.to_string()))?;
    Ok(Packet::from(packet))
}

impl From<OscPacket> for Packet {
    fn from(packet: OscPacket) -> Self {
        match packet {
            OscPacket::Message(msg) => Packet::Message(Message {
                address: msg.addr,
                args: msg.args.into_iter().map(ArgValue::from).collect(),
            }),
            OscPacket::Bundle(bundle) => Packet::Bundle(Bundle {
                timetag: bundle.timetag,
                content: bundle.content.into_iter().map(Packet::from).collect(),
            }),
        }
    }
}

impl From<OscType> for ArgValue {
    fn from(osc: OscType) -> Self {
        match osc {
            OscType::Int(i) => ArgValue::Int(i as i64),
            OscType::Long(l) => ArgValue::Int(l),
            OscType::Float(f) => ArgValue::Float(f as f64),
            OscType::Double(d) => ArgValue::Float(d),
            OscType::String(s) => ArgValue::String(s),
            OscType::Char(c) => ArgValue::String(c.to_string()),
            OscType::Blob(b) => ArgValue::Blob(b),
            OscType::Time(t) => ArgValue::Time(SystemTime::from(t)),
            OscType::Color(c) => ArgValue::Tuple(vec![
                ArgValue::Int(c.red as i64),
                ArgValue::Int(c.green as i64),
                ArgValue::Int(c.blue as i64),
                ArgValue::Int(c.alpha as i64),
            ]),
            OscType::Midi(m) => ArgValue::Tuple(vec![
                ArgValue::Int(m.port as i64),
                ArgValue::Int(m.status as i64),
                ArgValue::Int(m.data1 as i64),
                ArgValue::Int(m.data2 as i64),
            ]),
            OscType::Bool(b) => ArgValue::Bool(b),
            OscType::Nil => ArgValue::Nil,
            OscType::Inf => ArgValue::Float(f64::INFINITY),
            OscType::Array(arr) => ArgValue::Array(arr.content.into_iter().map(ArgValue::from).collect()),
        }
    }
}
