use std::io;

use crate::errors::{AmfError, AmfResult};

use byteorder::{BigEndian, WriteBytesExt};
use utils::traits::writer::WriteTo;

use super::{Value, amf0_marker};

impl<W: io::Write> WriteTo<W> for Value {
    type Error = AmfError;
    fn write_to(&self, writer: &mut W) -> Result<(), Self::Error> {
        match self {
            Value::Number(n) => Self::write_number(writer, *n),
            Value::Boolean(b) => Self::write_boolean(writer, *b),
            Value::String(s) => Self::write_string(writer, s),
            Value::Object { entries } => Self::write_anonymous_object(writer, entries),
            Value::Null => Self::write_null(writer),
            Value::Undefined => Self::write_undefined(writer),
            Value::ECMAArray(entries) => Self::write_ecma_array(writer, entries),
            Value::ObjectEnd => Self::write_object_end(writer),
            Value::StrictArray(values) => Self::write_strict_array(writer, values),
            Value::Date { millis_timestamp } => Self::write_date(writer, *millis_timestamp),
        }
    }
}

impl Value {
    pub fn write_number<W: io::Write>(writer: &mut W, v: f64) -> AmfResult<()> {
        writer.write_u8(amf0_marker::NUMBER)?;
        writer.write_f64::<BigEndian>(v)?;
        Ok(())
    }

    pub fn write_boolean<W: io::Write>(writer: &mut W, v: bool) -> AmfResult<()> {
        writer.write_u8(amf0_marker::BOOLEAN)?;
        writer.write_u8(v as u8)?;
        Ok(())
    }

    fn write_short_string_inner<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        writer.write_u16::<BigEndian>(v.len() as u16)?;
        writer.write_all(v.as_bytes())?;
        Ok(())
    }

    fn write_long_string_inner<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        writer.write_u32::<BigEndian>(v.len() as u32)?;
        writer.write_all(v.as_bytes())?;
        Ok(())
    }

    pub fn write_string<W: io::Write>(writer: &mut W, v: &str) -> AmfResult<()> {
        if v.len() < 0xFFFF {
            writer.write_u8(amf0_marker::STRING)?;
            Self::write_short_string_inner(writer, v)?;
        } else {
            writer.write_u8(amf0_marker::LONG_STRING)?;
            Self::write_long_string_inner(writer, v)?;
        }
        Ok(())
    }

    fn write_pairs_inner<W: io::Write>(
        writer: &mut W,
        entries: &[(String, Value)],
    ) -> AmfResult<()> {
        for (key, value) in entries {
            Self::write_short_string_inner(writer, key)?;
            value.write_to(writer)?;
        }
        writer.write_u16::<BigEndian>(0)?;
        writer.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }

    pub fn write_anonymous_object<W: io::Write>(
        writer: &mut W,
        entries: &[(String, Value)],
    ) -> AmfResult<()> {
        writer.write_u8(amf0_marker::OBJECT)?;
        Self::write_pairs_inner(writer, entries)?;
        Ok(())
    }

    pub fn write_null<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::NULL)?;
        Ok(())
    }

    pub fn write_undefined<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::UNDEFINED)?;
        Ok(())
    }

    pub fn write_ecma_array<W: io::Write>(
        writer: &mut W,
        entries: &[(String, Value)],
    ) -> AmfResult<()> {
        writer.write_u8(amf0_marker::ECMA_ARRAY)?;
        writer.write_u32::<BigEndian>(entries.len() as u32)?;
        Self::write_pairs_inner(writer, entries)?;
        Ok(())
    }

    fn write_object_end<W: io::Write>(writer: &mut W) -> AmfResult<()> {
        writer.write_u8(amf0_marker::OBJECT_END)?;
        Ok(())
    }

    pub fn write_strict_array<W: io::Write>(writer: &mut W, values: &[Value]) -> AmfResult<()> {
        writer.write_u8(amf0_marker::STRICT_ARRAY)?;
        writer.write_u32::<BigEndian>(values.len() as u32)?;
        for value in values {
            value.write_to(writer)?;
        }
        Ok(())
    }

    pub fn write_date<W: io::Write>(writer: &mut W, millis_timestamp: f64) -> AmfResult<()> {
        writer.write_u8(amf0_marker::DATE)?;
        writer.write_f64::<BigEndian>(millis_timestamp)?;
        writer.write_i16::<BigEndian>(0x0000)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::amf0::Value;
    use utils::traits::writer::WriteTo;

    use super::super::reader::Reader;

    macro_rules! encode {
        ($value:expr) => {{
            let mut buf = Vec::new();
            ($value).write_to(&mut buf).unwrap();
            buf
        }};
    }

    #[test]
    fn number() {
        assert_eq!(
            encode!(Value::Number(3.5)),
            [0x00, 0x40, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn boolean() {
        assert_eq!(encode!(Value::Boolean(true)), [0x01, 0x01]);
        assert_eq!(encode!(Value::Boolean(false)), [0x01, 0x00]);
    }

    #[test]
    fn string() {
        assert_eq!(
            encode!(Value::String("cam".to_string())),
            [0x02, 0x00, 0x03, b'c', b'a', b'm']
        );
    }

    #[test]
    fn null() {
        assert_eq!(encode!(Value::Null), [0x05]);
    }

    #[test]
    fn object_round_trip() {
        let value = Value::Object {
            entries: vec![
                ("level".to_string(), Value::String("status".to_string())),
                (
                    "code".to_string(),
                    Value::String("NetStream.Publish.Start".to_string()),
                ),
                ("capabilities".to_string(), Value::Number(31.0)),
            ],
        };
        let bytes = encode!(&value);
        let decoded = Reader::new(&mut &bytes[..]).read().unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn ecma_array_round_trip() {
        let value = Value::ECMAArray(vec![
            ("duration".to_string(), Value::Number(0.0)),
            ("encoder".to_string(), Value::String("obs".to_string())),
        ]);
        let bytes = encode!(&value);
        let decoded = Reader::new(&mut &bytes[..]).read().unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn strict_array_round_trip() {
        let value = Value::StrictArray(vec![
            Value::Number(1.0),
            Value::String("2".to_string()),
            Value::Null,
        ]);
        let bytes = encode!(&value);
        let decoded = Reader::new(&mut &bytes[..]).read().unwrap().unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn date_round_trip() {
        let value = Value::Date {
            millis_timestamp: 1_590_796_800_000.0,
        };
        let bytes = encode!(&value);
        let decoded = Reader::new(&mut &bytes[..]).read().unwrap().unwrap();
        assert_eq!(decoded, value);
    }
}
