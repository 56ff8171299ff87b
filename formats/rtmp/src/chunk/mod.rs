use errors::{ChunkMessageError, ChunkMessageResult};

use crate::{
    message::{RtmpMessageType, RtmpUserMessageBody},
    protocol_control::{ProtocolControlMessage, ProtocolControlMessageType},
    user_control::{UserControlEvent, consts::USER_CONTROL_MESSAGE_TYPE},
};

pub mod consts;
pub mod errors;
pub mod reader;
pub mod writer;

pub type Csid = u32;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkBasicHeaderType {
    Type1 = 1,
    Type2 = 2,
    Type3 = 3,
}

///! @see: 5.3.1.1. Chunk Basic Header
///! 1, 2 or 3 bytes; the low 6 bits of the first byte select the form
#[derive(Debug, Clone)]
pub struct ChunkBasicHeader {
    header_type: ChunkBasicHeaderType,
    pub fmt: u8, // 2 bits
    pub chunk_stream_id: Csid,
}

impl ChunkBasicHeader {
    pub fn new(fmt: u8, csid: Csid) -> ChunkMessageResult<Self> {
        let header_type = match csid {
            id if id > 1 && id < 64 => ChunkBasicHeaderType::Type1,
            id if id > 63 && id < 320 => ChunkBasicHeaderType::Type2,
            id if id > 319 && id < 65600 => ChunkBasicHeaderType::Type3,
            _ => {
                return Err(ChunkMessageError::InvalidBasicHeader(format!(
                    "invalid csid: {}",
                    csid
                )));
            }
        };

        Ok(Self {
            header_type,
            fmt,
            chunk_stream_id: csid,
        })
    }

    pub fn header_length(&self) -> usize {
        self.header_type as usize
    }
}

///! @see: 5.3.1.2.1. Type 0 - full header, starts a chunk stream or rewinds
///! its timestamp. 11 bytes.
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                   timestamp                   |message length |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     message length (cont)     |message type id| msg stream id |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           message stream id (cont)            |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone)]
pub struct ChunkMessageHeaderType0 {
    pub timestamp: u32,         // 3 bytes, 0xFFFFFF escapes to extended
    pub message_length: u32,    // 3 bytes
    pub message_type_id: u8,    // 1 byte
    pub message_stream_id: u32, // 4 bytes, little endian
}

///! @see: 5.3.1.2.2. Type 1 - same message stream id as the preceding chunk.
///! 7 bytes.
#[derive(Debug, Clone)]
pub struct ChunkMessageHeaderType1 {
    pub timestamp_delta: u32, // 3 bytes
    pub message_length: u32,  // 3 bytes
    pub message_type_id: u8,  // 1 byte
}

///! @see: 5.3.1.2.3. Type 2 - same length and type as the preceding chunk.
///! 3 bytes.
#[derive(Debug, Clone)]
pub struct ChunkMessageHeaderType2 {
    pub timestamp_delta: u32, // 3 bytes
}

///! @see: 5.3.1.2.4. Type 3 - continuation, no message header.
#[derive(Debug, Clone)]
pub struct ChunkMessageHeaderType3 {}

#[derive(Debug, Clone)]
pub enum ChunkMessageHeader {
    Type0(ChunkMessageHeaderType0),
    Type1(ChunkMessageHeaderType1),
    Type2(ChunkMessageHeaderType2),
    Type3(ChunkMessageHeaderType3),
}

impl ChunkMessageHeader {
    pub fn header_length(&self) -> usize {
        match self {
            ChunkMessageHeader::Type0(_) => 11,
            ChunkMessageHeader::Type1(_) => 7,
            ChunkMessageHeader::Type2(_) => 3,
            ChunkMessageHeader::Type3(_) => 0,
        }
    }
}

/// The per-message view the reader hands out once a message completes: the
/// timestamp here is the absolute chunk-stream clock, never a delta.
#[derive(Debug, Clone)]
pub struct ChunkMessageCommonHeader {
    pub basic_header: ChunkBasicHeader,
    pub timestamp: u32,
    pub message_length: u32,
    pub message_type_id: u8,
    pub message_stream_id: u32,
    pub extended_timestamp_enabled: bool,
}

///! @see: 5.3.1. Chunk Format
/// +--------------+----------------+--------------------+--------------+
/// | Basic Header | Message Header | Extended Timestamp |  Chunk Data  |
/// +--------------+----------------+--------------------+--------------+
/// |                                                    |
/// |<------------------- Chunk Header ----------------->|
#[derive(Debug)]
pub struct ChunkMessage {
    pub header: ChunkMessageCommonHeader,
    pub chunk_message_body: RtmpChunkMessageBody,
}

#[derive(Debug)]
pub enum RtmpChunkMessageBody {
    ProtocolControl(ProtocolControlMessage),
    UserControl(UserControlEvent),
    RtmpUserMessage(Box<RtmpUserMessageBody>),
}

#[derive(Debug)]
pub enum ChunkMessageType {
    ProtocolControl(ProtocolControlMessageType),
    UserControl,
    RtmpUserMessage(RtmpMessageType),
}

impl TryFrom<u8> for ChunkMessageType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value == USER_CONTROL_MESSAGE_TYPE {
            return Ok(ChunkMessageType::UserControl);
        }

        if let Ok(v) = ProtocolControlMessageType::try_from(value) {
            return Ok(ChunkMessageType::ProtocolControl(v));
        }

        if let Ok(v) = RtmpMessageType::try_from(value) {
            return Ok(ChunkMessageType::RtmpUserMessage(v));
        }

        Err(ChunkMessageError::UnknownMessageType(value))
    }
}
