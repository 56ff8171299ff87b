pub mod reader;
pub mod writer;

/// @see: AMF0 specification, 2.1 Types Overview
pub mod amf0_marker {
    pub const NUMBER: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const STRING: u8 = 0x02;
    pub const OBJECT: u8 = 0x03;
    pub const MOVIECLIP: u8 = 0x04;
    pub const NULL: u8 = 0x05;
    pub const UNDEFINED: u8 = 0x06;
    pub const REFERENCE: u8 = 0x07;
    pub const ECMA_ARRAY: u8 = 0x08;
    pub const OBJECT_END: u8 = 0x09;
    pub const STRICT_ARRAY: u8 = 0x0A;
    pub const DATE: u8 = 0x0B;
    pub const LONG_STRING: u8 = 0x0C;
    pub const UNSUPPORTED: u8 = 0x0D;
    pub const RECORDSET: u8 = 0x0E;
    pub const XML_DOCUMENT: u8 = 0x0F;
    pub const TYPED_OBJECT: u8 = 0x10;
    pub const AVMPLUS_OBJECT: u8 = 0x11;
}

/// The AMF0 value subset command messages are built from. Long strings decode
/// into `String`; typed objects, references and AVM+ escapes are rejected by
/// the reader.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Boolean(bool),
    String(String),
    Object { entries: Vec<(String, Value)> },
    Null,
    Undefined,
    ECMAArray(Vec<(String, Value)>),
    ObjectEnd,
    StrictArray(Vec<Value>),
    Date { millis_timestamp: f64 },
}

impl Value {
    pub fn try_as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn try_as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn try_as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn try_into_pairs(self) -> Result<impl Iterator<Item = (String, Value)>, Self> {
        match self {
            Value::Object { entries } => Ok(entries.into_iter()),
            Value::ECMAArray(entries) => Ok(entries.into_iter()),
            value => Err(value),
        }
    }
}
