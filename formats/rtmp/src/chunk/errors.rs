use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChunkMessageError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("unexpected fmt bits: {0:#b}")]
    UnexpectedFmt(u8),
    #[error("unknown message type: {0}")]
    UnknownMessageType(u8),
    #[error("invalid basic header: {0}")]
    InvalidBasicHeader(String),
    #[error("invalid message header: {0}")]
    InvalidMessageHeader(String),
    #[error("invalid message: {0}")]
    InvalidMessage(String),
    #[error("chunk stream {csid} started with fmt {fmt}, needs a full header first")]
    UnknownChunkStream { csid: u32, fmt: u8 },
    #[error("a chunk was consumed but its message is still incomplete")]
    IncompleteChunk,
    #[error("unknown user control event type: {0}")]
    UnknownEventType(u16),
    #[error("unexpected amf value: {0}")]
    UnexpectedAmfType(String),
    #[error("unexpected command name: {0}")]
    UnexpectedCommandName(String),
    #[error("amf codec failed: {0}")]
    Amf(#[from] amf::errors::AmfError),
}

pub type ChunkMessageResult<T> = Result<T, ChunkMessageError>;
