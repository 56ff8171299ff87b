use std::io;

use errors::AmfResult;

pub mod amf0;
pub mod errors;

pub use amf0::Value;

/// Wire encoding selector for command messages. Type 20 messages carry plain
/// AMF0 values; type 17 messages prefix the same AMF0 body with a one-byte
/// format selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Version {
    #[default]
    Amf0,
    Amf3,
}

pub fn string<T: Into<String>>(t: T) -> Value {
    Value::String(t.into())
}

pub fn number<T: Into<f64>>(t: T) -> Value {
    Value::Number(t.into())
}

pub fn bool(v: bool) -> Value {
    Value::Boolean(v)
}

pub fn null() -> Value {
    Value::Null
}

pub fn object<I>(entries: I) -> Value
where
    I: IntoIterator<Item = (String, Value)>,
{
    Value::Object {
        entries: entries.into_iter().collect(),
    }
}

impl Value {
    pub fn read_from<R>(reader: &mut R) -> AmfResult<Option<Self>>
    where
        R: io::Read,
    {
        amf0::reader::Reader::new(reader).read()
    }
}
