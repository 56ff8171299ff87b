use crate::chunk::errors::ChunkMessageError;

use super::{
    AbortMessage, Acknowledgement, ProtocolControlMessage, ProtocolControlMessageType,
    SetChunkSize, SetPeerBandwidth, WindowAckSize,
};
use byteorder::{BigEndian, ReadBytesExt};
use std::io;
use utils::traits::reader::{ReadFrom, ReadRemainingFrom};

impl<R: io::Read> ReadRemainingFrom<ProtocolControlMessageType, R> for ProtocolControlMessage {
    type Error = ChunkMessageError;
    fn read_remaining_from(
        header: ProtocolControlMessageType,
        reader: &mut R,
    ) -> Result<Self, Self::Error> {
        match header {
            ProtocolControlMessageType::SetChunkSize => Ok(ProtocolControlMessage::SetChunkSize(
                SetChunkSize::read_from(reader)?,
            )),
            ProtocolControlMessageType::Abort => Ok(ProtocolControlMessage::Abort(
                AbortMessage::read_from(reader)?,
            )),
            ProtocolControlMessageType::Acknowledgement => Ok(ProtocolControlMessage::Ack(
                Acknowledgement::read_from(reader)?,
            )),
            ProtocolControlMessageType::WindowAckSize => Ok(ProtocolControlMessage::WindowAckSize(
                WindowAckSize::read_from(reader)?,
            )),
            ProtocolControlMessageType::SetPeerBandwidth => Ok(
                ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth::read_from(reader)?),
            ),
        }
    }
}

impl<R: io::Read> ReadFrom<R> for SetChunkSize {
    type Error = ChunkMessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        let chunk_size = reader.read_u32::<BigEndian>()?;
        if (chunk_size as i32) < 0 {
            return Err(ChunkMessageError::InvalidMessage(format!(
                "invalid set chunk size message, the reserved bit is not zero: {:#b}",
                chunk_size
            )));
        }
        if chunk_size < 1 {
            return Err(ChunkMessageError::InvalidMessage(
                "invalid set chunk size message, the chunk size is 0".to_owned(),
            ));
        }

        Ok(SetChunkSize { chunk_size })
    }
}

impl<R: io::Read> ReadFrom<R> for AbortMessage {
    type Error = ChunkMessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(AbortMessage {
            chunk_stream_id: reader.read_u32::<BigEndian>()?,
        })
    }
}

impl<R: io::Read> ReadFrom<R> for Acknowledgement {
    type Error = ChunkMessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(Acknowledgement {
            sequence_number: reader.read_u32::<BigEndian>()?,
        })
    }
}

impl<R: io::Read> ReadFrom<R> for WindowAckSize {
    type Error = ChunkMessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        Ok(WindowAckSize {
            size: reader.read_u32::<BigEndian>()?,
        })
    }
}

impl<R: io::Read> ReadFrom<R> for SetPeerBandwidth {
    type Error = ChunkMessageError;
    fn read_from(reader: &mut R) -> Result<Self, Self::Error> {
        let size = reader.read_u32::<BigEndian>()?;
        let limit_type = reader.read_u8()?;

        Ok(SetPeerBandwidth {
            size,
            limit_type: limit_type.try_into()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use utils::traits::reader::ReadFrom;

    use crate::{
        chunk::errors::ChunkMessageError,
        protocol_control::{SetChunkSize, SetPeerBandWidthLimitType, SetPeerBandwidth},
    };

    #[test]
    fn set_chunk_size() {
        let bytes = [0x00, 0x00, 0x10, 0x00];
        let message = SetChunkSize::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(message.chunk_size, 4096);
    }

    #[test]
    fn set_chunk_size_reserved_bit() {
        let bytes = [0x80, 0x00, 0x10, 0x00];
        assert!(matches!(
            SetChunkSize::read_from(&mut &bytes[..]),
            Err(ChunkMessageError::InvalidMessage(_))
        ));
    }

    #[test]
    fn set_chunk_size_zero() {
        let bytes = [0x00, 0x00, 0x00, 0x00];
        assert!(SetChunkSize::read_from(&mut &bytes[..]).is_err());
    }

    #[test]
    fn set_peer_bandwidth() {
        let bytes = [0x00, 0x26, 0x25, 0xA0, 0x02];
        let message = SetPeerBandwidth::read_from(&mut &bytes[..]).unwrap();
        assert_eq!(message.size, 2_500_000);
        assert_eq!(message.limit_type, SetPeerBandWidthLimitType::Dynamic);
    }

    #[test]
    fn set_peer_bandwidth_bad_limit_type() {
        let bytes = [0x00, 0x26, 0x25, 0xA0, 0x03];
        assert!(SetPeerBandwidth::read_from(&mut &bytes[..]).is_err());
    }
}
