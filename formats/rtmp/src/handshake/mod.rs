use core::time;

use errors::HandshakeError;

pub mod consts;
pub mod digest;
pub mod errors;
pub mod reader;
pub mod server;
pub mod writer;

#[derive(Debug)]
pub struct C0S0Packet {
    pub version: Version,
}

pub struct C1S1Packet {
    pub timestamp: time::Duration,
    pub zeros: u32,
    pub random_bytes: [u8; 1528],
}

pub struct C2S2Packet {
    pub timestamp: time::Duration,
    pub timestamp2: time::Duration,
    pub random_echo: [u8; 1528],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Version {
    V0 = 0,
    V1 = 1,
    V2 = 2,
    V3 = 3,
}

impl From<Version> for u8 {
    fn from(value: Version) -> Self {
        value as u8
    }
}

impl TryFrom<u8> for Version {
    type Error = HandshakeError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Version::V0),
            1 => Ok(Version::V1),
            2 => Ok(Version::V2),
            3 => Ok(Version::V3),
            version => Err(HandshakeError::BadVersion(version)),
        }
    }
}

/// +-------------+                +-------------+
/// |    Client   | TCP/IP Network |    Server   |
/// +-------------+       |        +-------------+
///        |              |               |
///  Uninitialized        |         Uninitialized
///        |      C0      |               |
///        |------------->|        C0     |
///        |              |-------------->|
///        |      C1      |               |
///        |------------->|        S0     |
///        |              |<--------------|
///        |              |        S1     |
///  Version sent         |<--------------|
///        |      S0      |               |
///        |<-------------|               |
///        |      S1      |               |
///        |<-------------|         Version sent
///        |              |        C1     |
///        |              |-------------->|
///        |      C2      |               |
///        |------------->|        S2     |
///        |              |<--------------|
///     Ack sent          |            Ack Sent
///        |      S2      |               |
///        |<-------------|               |
///        |              |        C2     |
///        |              |-------------->|
///   Handshake Done      |          Handshake Done
///        |              |               |
///     Pictorial Representation of Handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeServerState {
    Uninitialized,
    VersionReceived,
    AckSent,
    Done,
}

pub const RTMP_VERSION: Version = Version::V3;
