use std::{io, time::SystemTimeError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DigestError {
    #[error("the c1 digest validates with neither schema")]
    Invalid,
    #[error("digest length should be 32, got {length}")]
    WrongLength { length: usize },
}

#[derive(Debug, Error)]
pub enum HandshakeError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("bad rtmp version: {0}")]
    BadVersion(u8),
    #[error("digest failed: {0}")]
    DigestError(#[from] DigestError),
    #[error("system clock is off: {0}")]
    Time(#[from] SystemTimeError),
}

pub type HandshakeResult<T> = Result<T, HandshakeError>;
