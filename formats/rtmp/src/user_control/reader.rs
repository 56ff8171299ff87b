use std::io;

use byteorder::{BigEndian, ReadBytesExt};

use crate::chunk::errors::ChunkMessageError;
use utils::traits::reader::ReadFrom;

use super::{UserControlEvent, UserControlEventType};

impl<R: io::Read> ReadFrom<R> for UserControlEvent {
    type Error = ChunkMessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        let event_type = reader.read_u16::<BigEndian>()?;
        let event_type: UserControlEventType = event_type.try_into()?;
        match event_type {
            UserControlEventType::StreamBegin => Ok(UserControlEvent::StreamBegin {
                stream_id: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::StreamEOF => Ok(UserControlEvent::StreamEOF {
                stream_id: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::StreamDry => Ok(UserControlEvent::StreamDry {
                stream_id: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::SetBufferLength => Ok(UserControlEvent::SetBufferLength {
                stream_id: reader.read_u32::<BigEndian>()?,
                buffer_length: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::StreamIsRecorded => Ok(UserControlEvent::StreamIsRecorded {
                stream_id: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::PingRequest => Ok(UserControlEvent::PingRequest {
                timestamp: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::PingResponse => Ok(UserControlEvent::PingResponse {
                timestamp: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::BufferEmpty => Ok(UserControlEvent::BufferEmpty {
                stream_id: reader.read_u32::<BigEndian>()?,
            }),
            UserControlEventType::BufferReady => Ok(UserControlEvent::BufferReady {
                stream_id: reader.read_u32::<BigEndian>()?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use utils::traits::reader::ReadFrom;

    use crate::{chunk::errors::ChunkMessageError, user_control::UserControlEvent};

    #[test]
    fn stream_begin() {
        let bytes = [0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(
            UserControlEvent::read_from(&mut &bytes[..]).unwrap(),
            UserControlEvent::StreamBegin { stream_id: 1 }
        );
    }

    #[test]
    fn set_buffer_length() {
        let bytes = [0x00, 0x03, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x75, 0x30];
        assert_eq!(
            UserControlEvent::read_from(&mut &bytes[..]).unwrap(),
            UserControlEvent::SetBufferLength {
                stream_id: 1,
                buffer_length: 30_000
            }
        );
    }

    #[test]
    fn ping_request() {
        let bytes = [0x00, 0x06, 0x12, 0x34, 0x56, 0x78];
        assert_eq!(
            UserControlEvent::read_from(&mut &bytes[..]).unwrap(),
            UserControlEvent::PingRequest {
                timestamp: 0x1234_5678
            }
        );
    }

    #[test]
    fn buffer_empty_and_ready() {
        let empty = [0x00, 0x1F, 0x00, 0x00, 0x00, 0x01];
        let ready = [0x00, 0x20, 0x00, 0x00, 0x00, 0x01];
        assert_eq!(
            UserControlEvent::read_from(&mut &empty[..]).unwrap(),
            UserControlEvent::BufferEmpty { stream_id: 1 }
        );
        assert_eq!(
            UserControlEvent::read_from(&mut &ready[..]).unwrap(),
            UserControlEvent::BufferReady { stream_id: 1 }
        );
    }

    #[test]
    fn unknown_event_type() {
        let bytes = [0x00, 0x09, 0x00, 0x00, 0x00, 0x01];
        assert!(matches!(
            UserControlEvent::read_from(&mut &bytes[..]),
            Err(ChunkMessageError::UnknownEventType(9))
        ));
    }
}
