use std::{io, string};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AmfError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("marker is not supported: {marker}")]
    Unsupported { marker: u8 },
    #[error("unknown marker: {marker}")]
    Unknown { marker: u8 },
    #[error("invalid utf8 string: {0}")]
    Utf8(#[from] string::FromUtf8Error),
    #[error("object key with no value")]
    DanglingKey,
}

pub type AmfResult<T> = Result<T, AmfError>;
