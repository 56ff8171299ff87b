use tokio_util::bytes::BytesMut;

use crate::{
    chunk::errors::ChunkMessageError,
    commands::{RtmpC2SCommands, RtmpS2CCommands},
};

///! Message-layer payloads: what a reassembled chunk message decodes into.
/// https://stackoverflow.com/questions/59709461/difference-between-chunk-message-header-and-message-header-in-rtmp
pub mod reader;
pub mod writer;

#[derive(Debug)]
pub enum RtmpUserMessageBody {
    C2SCommand(RtmpC2SCommands),
    S2CCommand(RtmpS2CCommands),
    MetaData { payload: BytesMut },
    SharedObject { payload: BytesMut },
    Audio { payload: BytesMut },
    Video { payload: BytesMut },
    Aggregate { payload: BytesMut },
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtmpMessageType {
    UserControl = 4,
    Audio = 8,
    Video = 9,
    AMF3Data = 15,
    AMF3SharedObject = 16,
    AMF3Command = 17,
    AMF0Data = 18,
    AMF0SharedObject = 19,
    AMF0Command = 20,
    Aggregate = 22,
}

impl From<RtmpMessageType> for u8 {
    fn from(value: RtmpMessageType) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for RtmpMessageType {
    type Error = ChunkMessageError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(RtmpMessageType::UserControl),
            8 => Ok(RtmpMessageType::Audio),
            9 => Ok(RtmpMessageType::Video),
            15 => Ok(RtmpMessageType::AMF3Data),
            16 => Ok(RtmpMessageType::AMF3SharedObject),
            17 => Ok(RtmpMessageType::AMF3Command),
            18 => Ok(RtmpMessageType::AMF0Data),
            19 => Ok(RtmpMessageType::AMF0SharedObject),
            20 => Ok(RtmpMessageType::AMF0Command),
            22 => Ok(RtmpMessageType::Aggregate),
            _ => Err(ChunkMessageError::UnknownMessageType(value)),
        }
    }
}

impl RtmpMessageType {
    pub fn amf_version(&self) -> amf::Version {
        match self {
            RtmpMessageType::AMF3Command
            | RtmpMessageType::AMF3Data
            | RtmpMessageType::AMF3SharedObject => amf::Version::Amf3,
            _ => amf::Version::Amf0,
        }
    }
}
