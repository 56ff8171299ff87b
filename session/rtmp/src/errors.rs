use std::io;

use rtmp_proto::{chunk::errors::ChunkMessageError, handshake::errors::HandshakeError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtmpSessionError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("handshake failed: {0}")]
    HandshakeFailed(#[from] HandshakeError),
    #[error("chunk message failed: {0}")]
    ChunkMessageFailed(#[from] ChunkMessageError),
    #[error("invalid stream param: {0}")]
    InvalidStreamParam(String),
    #[error("the session already hit a fatal error")]
    SessionUnusable,
}

pub type RtmpSessionResult<T> = Result<T, RtmpSessionError>;
