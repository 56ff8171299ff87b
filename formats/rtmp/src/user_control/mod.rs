use crate::chunk::errors::ChunkMessageError;

///! @see: 7.1.7. User Control Message Events
pub mod consts;
pub mod reader;
pub mod writer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEvent {
    StreamBegin {
        stream_id: u32,
    },
    StreamEOF {
        stream_id: u32,
    },
    StreamDry {
        stream_id: u32,
    },
    SetBufferLength {
        stream_id: u32,
        buffer_length: u32, // milliseconds
    },
    StreamIsRecorded {
        stream_id: u32,
    },
    PingRequest {
        timestamp: u32,
    },
    PingResponse {
        timestamp: u32,
    },
    BufferEmpty {
        stream_id: u32,
    },
    BufferReady {
        stream_id: u32,
    },
}

#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserControlEventType {
    StreamBegin = 0,
    StreamEOF = 1,
    StreamDry = 2,
    SetBufferLength = 3,
    StreamIsRecorded = 4,
    PingRequest = 6,
    PingResponse = 7,
    BufferEmpty = 31,
    BufferReady = 32,
}

impl From<UserControlEventType> for u16 {
    fn from(value: UserControlEventType) -> Self {
        value as u16
    }
}

impl TryFrom<u16> for UserControlEventType {
    type Error = ChunkMessageError;
    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(UserControlEventType::StreamBegin),
            1 => Ok(UserControlEventType::StreamEOF),
            2 => Ok(UserControlEventType::StreamDry),
            3 => Ok(UserControlEventType::SetBufferLength),
            4 => Ok(UserControlEventType::StreamIsRecorded),
            6 => Ok(UserControlEventType::PingRequest),
            7 => Ok(UserControlEventType::PingResponse),
            31 => Ok(UserControlEventType::BufferEmpty),
            32 => Ok(UserControlEventType::BufferReady),
            _ => Err(ChunkMessageError::UnknownEventType(value)),
        }
    }
}
