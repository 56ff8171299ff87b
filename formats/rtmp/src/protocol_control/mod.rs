use std::io;

use crate::chunk::errors::{ChunkMessageError, ChunkMessageResult};
use utils::traits::reader::ReadRemainingFrom;

pub mod consts;
pub mod reader;
pub mod writer;

///! @see: 5.4.1. Set Chunk Size (1)
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |0|                     chunk size (31 bits)                    |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct SetChunkSize {
    pub chunk_size: u32, // 31 bits, the reserved high bit must be 0
}

///! @see: 5.4.2. Abort Message (2)
#[derive(Debug, Clone, Copy)]
pub struct AbortMessage {
    pub chunk_stream_id: u32,
}

///! @see: 5.4.3. Acknowledgement (3)
#[derive(Debug, Clone, Copy)]
pub struct Acknowledgement {
    pub sequence_number: u32,
}

///! @see: 5.4.4. Window Acknowledgement Size (5)
#[derive(Debug, Clone, Copy)]
pub struct WindowAckSize {
    pub size: u32,
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolControlMessageType {
    SetChunkSize = 1,
    Abort = 2,
    Acknowledgement = 3,
    WindowAckSize = 5,
    SetPeerBandwidth = 6,
}

impl From<ProtocolControlMessageType> for u8 {
    fn from(value: ProtocolControlMessageType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for ProtocolControlMessageType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(ProtocolControlMessageType::SetChunkSize),
            2 => Ok(ProtocolControlMessageType::Abort),
            3 => Ok(ProtocolControlMessageType::Acknowledgement),
            5 => Ok(ProtocolControlMessageType::WindowAckSize),
            6 => Ok(ProtocolControlMessageType::SetPeerBandwidth),
            _ => Err(ChunkMessageError::UnknownMessageType(value)),
        }
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetPeerBandWidthLimitType {
    // The peer SHOULD limit its output bandwidth to the indicated window size.
    Hard = 0,
    // The peer SHOULD limit its output bandwidth to this window or the limit
    // already in effect, whichever is smaller.
    Soft = 1,
    // If the previous limit type was Hard, treat this message as Hard,
    // otherwise ignore it.
    Dynamic = 2,
}

impl TryFrom<u8> for SetPeerBandWidthLimitType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(SetPeerBandWidthLimitType::Hard),
            1 => Ok(SetPeerBandWidthLimitType::Soft),
            2 => Ok(SetPeerBandWidthLimitType::Dynamic),
            _ => Err(ChunkMessageError::InvalidMessage(format!(
                "invalid set peer bandwidth message, the limit type is unknown: {}",
                value
            ))),
        }
    }
}

///! @see: 5.4.5. Set Peer Bandwidth (6)
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                  Acknowledgement Window size                  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  Limit Type   |
/// +-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct SetPeerBandwidth {
    pub size: u32,
    pub limit_type: SetPeerBandWidthLimitType,
}

#[derive(Debug)]
pub enum ProtocolControlMessage {
    SetChunkSize(SetChunkSize),
    Abort(AbortMessage),
    Ack(Acknowledgement),
    WindowAckSize(WindowAckSize),
    SetPeerBandwidth(SetPeerBandwidth),
}

impl ProtocolControlMessage {
    pub fn read_from<R>(
        mut inner: R,
        message_type: ProtocolControlMessageType,
    ) -> ChunkMessageResult<ProtocolControlMessage>
    where
        R: io::Read,
    {
        ProtocolControlMessage::read_remaining_from(message_type, &mut inner)
    }
}
