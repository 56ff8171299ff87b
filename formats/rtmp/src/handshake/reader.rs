use core::time;
use std::io;

use super::{C0S0Packet, C1S1Packet, C2S2Packet, errors::HandshakeResult};
use byteorder::{BigEndian, ReadBytesExt};

pub struct Reader<R> {
    inner: R,
}

impl<R> Reader<R>
where
    R: io::Read,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn read_c0s0(&mut self) -> HandshakeResult<C0S0Packet> {
        let version = self.inner.read_u8()?;
        Ok(C0S0Packet {
            version: version.try_into()?,
        })
    }

    pub fn read_c1s1(&mut self) -> HandshakeResult<C1S1Packet> {
        let time = self.inner.read_u32::<BigEndian>()?;
        let zeros = self.inner.read_u32::<BigEndian>()?;
        let mut buf = [0; 1528];
        self.inner.read_exact(&mut buf)?;
        Ok(C1S1Packet {
            timestamp: time::Duration::from_millis(time as u64),
            zeros,
            random_bytes: buf,
        })
    }

    pub fn read_c2s2(&mut self) -> HandshakeResult<C2S2Packet> {
        let time = self.inner.read_u32::<BigEndian>()?;
        let time2 = self.inner.read_u32::<BigEndian>()?;
        let mut buf = [0; 1528];
        self.inner.read_exact(&mut buf)?;
        Ok(C2S2Packet {
            timestamp: time::Duration::from_millis(time as u64),
            timestamp2: time::Duration::from_millis(time2 as u64),
            random_echo: buf,
        })
    }
}

impl<R> Reader<R> {
    pub fn into_inner(self) -> R {
        self.inner
    }
}
