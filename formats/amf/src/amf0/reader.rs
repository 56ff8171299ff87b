use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::errors::{AmfError, AmfResult};

use super::{Value, amf0_marker};

#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
}

impl<R> Reader<R> {
    pub fn into_inner(self) -> R {
        self.inner
    }

    pub fn inner_mut(&mut self) -> &mut R {
        &mut self.inner
    }
}

impl<R> Reader<R>
where
    R: io::Read,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one value. `Ok(None)` means the stream ended at a value
    /// boundary; running out of bytes mid-value is an error.
    pub fn read(&mut self) -> AmfResult<Option<Value>> {
        let marker = match self.inner.read_u8() {
            Ok(marker) => marker,
            Err(_) => return Ok(None),
        };
        let value = match marker {
            amf0_marker::NUMBER => self.read_number(),
            amf0_marker::BOOLEAN => self.read_boolean(),
            amf0_marker::STRING => self.read_string(),
            amf0_marker::OBJECT => self.read_anonymous_object(),
            amf0_marker::NULL => Ok(Value::Null),
            amf0_marker::UNDEFINED => Ok(Value::Undefined),
            amf0_marker::ECMA_ARRAY => self.read_ecma_array(),
            amf0_marker::OBJECT_END => Ok(Value::ObjectEnd),
            amf0_marker::STRICT_ARRAY => self.read_strict_array(),
            amf0_marker::DATE => self.read_date(),
            amf0_marker::LONG_STRING => self.read_long_string(),
            amf0_marker::MOVIECLIP
            | amf0_marker::REFERENCE
            | amf0_marker::UNSUPPORTED
            | amf0_marker::RECORDSET
            | amf0_marker::XML_DOCUMENT
            | amf0_marker::TYPED_OBJECT
            | amf0_marker::AVMPLUS_OBJECT => Err(AmfError::Unsupported { marker }),
            _ => Err(AmfError::Unknown { marker }),
        }?;
        Ok(Some(value))
    }

    pub fn read_all(&mut self) -> AmfResult<Vec<Value>> {
        let mut result = Vec::new();
        while let Some(value) = self.read()? {
            result.push(value);
        }
        Ok(result)
    }

    fn read_number(&mut self) -> AmfResult<Value> {
        let number = self.inner.read_f64::<BigEndian>()?;
        Ok(Value::Number(number))
    }

    fn read_boolean(&mut self) -> AmfResult<Value> {
        let byte = self.inner.read_u8()?;
        Ok(Value::Boolean(byte != 0))
    }

    fn read_utf8_inner(&mut self, len: usize) -> AmfResult<String> {
        let mut buffer = vec![0; len];
        self.inner.read_exact(&mut buffer)?;
        let result = String::from_utf8(buffer)?;
        Ok(result)
    }

    fn read_string(&mut self) -> AmfResult<Value> {
        let len = self.inner.read_u16::<BigEndian>()?;
        self.read_utf8_inner(len as usize).map(Value::String)
    }

    fn read_long_string(&mut self) -> AmfResult<Value> {
        let len = self.inner.read_u32::<BigEndian>()?;
        self.read_utf8_inner(len as usize).map(Value::String)
    }

    fn read_key_value_pairs_inner(&mut self) -> AmfResult<Vec<(String, Value)>> {
        let mut result: Vec<(String, Value)> = Vec::new();
        loop {
            let len = self.inner.read_u16::<BigEndian>()?;
            let key = self.read_utf8_inner(len as usize)?;
            match self.read()? {
                Some(Value::ObjectEnd) if key.is_empty() => break,
                Some(value) => result.push((key, value)),
                None => return Err(AmfError::DanglingKey),
            }
        }
        Ok(result)
    }

    fn read_anonymous_object(&mut self) -> AmfResult<Value> {
        let entries = self.read_key_value_pairs_inner()?;
        Ok(Value::Object { entries })
    }

    fn read_ecma_array(&mut self) -> AmfResult<Value> {
        // the associative count is advisory, the OBJECT_END sentinel is
        // authoritative
        let _count = self.inner.read_u32::<BigEndian>()?;
        let entries = self.read_key_value_pairs_inner()?;
        Ok(Value::ECMAArray(entries))
    }

    fn read_strict_array(&mut self) -> AmfResult<Value> {
        let count = self.inner.read_u32::<BigEndian>()?;
        let mut result = Vec::with_capacity(count as usize);
        for _ in 0..count {
            match self.read()? {
                Some(value) => result.push(value),
                None => {
                    return Err(AmfError::Io(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "strict array ended early",
                    )));
                }
            }
        }
        Ok(Value::StrictArray(result))
    }

    fn read_date(&mut self) -> AmfResult<Value> {
        let millis = self.inner.read_f64::<BigEndian>()?;
        let _time_zone = self.inner.read_i16::<BigEndian>()?;
        Ok(Value::Date {
            millis_timestamp: millis,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::{amf0::Value, errors::AmfError};

    use super::Reader;

    macro_rules! decode {
        ($bytes:expr) => {{
            let data: &[u8] = $bytes;
            Reader::new(&mut &data[..]).read()
        }};
    }

    #[test]
    fn number() {
        assert_eq!(
            decode!(&[0x00, 0x40, 0x0C, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00])
                .unwrap()
                .unwrap(),
            Value::Number(3.5)
        );
    }

    #[test]
    fn boolean() {
        assert_eq!(
            decode!(&[0x01, 0x01]).unwrap().unwrap(),
            Value::Boolean(true)
        );
        assert_eq!(
            decode!(&[0x01, 0x00]).unwrap().unwrap(),
            Value::Boolean(false)
        );
    }

    #[test]
    fn string() {
        assert_eq!(
            decode!(&[0x02, 0x00, 0x04, b'l', b'i', b'v', b'e'])
                .unwrap()
                .unwrap(),
            Value::String("live".to_string())
        );
    }

    #[test]
    fn long_string() {
        assert_eq!(
            decode!(&[0x0C, 0x00, 0x00, 0x00, 0x02, b'o', b'k'])
                .unwrap()
                .unwrap(),
            Value::String("ok".to_string())
        );
    }

    #[test]
    fn anonymous_object() {
        let bytes = [
            0x03, // object
            0x00, 0x03, b'a', b'p', b'p', // key "app"
            0x02, 0x00, 0x04, b'l', b'i', b'v', b'e', // value "live"
            0x00, 0x00, 0x09, // object end
        ];
        assert_eq!(
            decode!(&bytes).unwrap().unwrap(),
            Value::Object {
                entries: vec![("app".to_string(), Value::String("live".to_string()))]
            }
        );
    }

    #[test]
    fn ecma_array() {
        let bytes = [
            0x08, 0x00, 0x00, 0x00, 0x01, // ecma array, count 1
            0x00, 0x01, b'0', // key "0"
            0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 1.0
            0x00, 0x00, 0x09, // object end
        ];
        assert_eq!(
            decode!(&bytes).unwrap().unwrap(),
            Value::ECMAArray(vec![("0".to_string(), Value::Number(1.0))])
        );
    }

    #[test]
    fn strict_array() {
        let bytes = [
            0x0A, 0x00, 0x00, 0x00, 0x02, // strict array, count 2
            0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 1.0
            0x05, // null
        ];
        assert_eq!(
            decode!(&bytes).unwrap().unwrap(),
            Value::StrictArray(vec![Value::Number(1.0), Value::Null])
        );
    }

    #[test]
    fn null_and_undefined() {
        assert_eq!(decode!(&[0x05]).unwrap().unwrap(), Value::Null);
        assert_eq!(decode!(&[0x06]).unwrap().unwrap(), Value::Undefined);
    }

    #[test]
    fn empty_input_is_a_boundary() {
        assert!(decode!(&[]).unwrap().is_none());
    }

    #[test]
    fn truncated_value_is_an_error() {
        let result = decode!(&[0x00, 0x40, 0x0C]);
        assert!(matches!(result, Err(AmfError::Io(_))));
    }

    #[test]
    fn unsupported_marker() {
        assert!(matches!(
            decode!(&[0x10]),
            Err(AmfError::Unsupported { marker: 0x10 })
        ));
    }

    #[test]
    fn read_all_stops_at_boundary() {
        let bytes = [
            0x02, 0x00, 0x07, b'c', b'o', b'n', b'n', b'e', b'c', b't', // "connect"
            0x00, 0x3F, 0xF0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, // 1.0
        ];
        let values = Reader::new(&mut &bytes[..]).read_all().unwrap();
        assert_eq!(
            values,
            vec![Value::String("connect".to_string()), Value::Number(1.0)]
        );
    }
}
