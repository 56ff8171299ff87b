use tokio_util::bytes::BytesMut;

use crate::{
    chunk::{ChunkMessageCommonHeader, errors::ChunkMessageResult},
    commands,
};

use super::{RtmpMessageType, RtmpUserMessageBody};

impl RtmpUserMessageBody {
    /// Interprets a fully reassembled message payload. `c2s` selects the
    /// role-gated command table: a server parses requests, a client parses
    /// responses.
    pub fn parse(
        header: &ChunkMessageCommonHeader,
        payload: BytesMut,
        c2s: bool,
    ) -> ChunkMessageResult<Self> {
        let message_type: RtmpMessageType = header.message_type_id.try_into()?;
        let message = match message_type {
            RtmpMessageType::AMF0Data | RtmpMessageType::AMF3Data => {
                RtmpUserMessageBody::MetaData { payload }
            }
            RtmpMessageType::Audio => RtmpUserMessageBody::Audio { payload },
            RtmpMessageType::Video => RtmpUserMessageBody::Video { payload },
            RtmpMessageType::Aggregate => RtmpUserMessageBody::Aggregate { payload },
            RtmpMessageType::AMF0SharedObject | RtmpMessageType::AMF3SharedObject => {
                RtmpUserMessageBody::SharedObject { payload }
            }
            RtmpMessageType::AMF0Command | RtmpMessageType::AMF3Command => {
                let version = message_type.amf_version();
                let mut reader = commands::reader::Reader::new(&payload[..], version);
                if c2s {
                    RtmpUserMessageBody::C2SCommand(reader.read_c2s_command()?)
                } else {
                    RtmpUserMessageBody::S2CCommand(reader.read_s2c_command_auto()?)
                }
            }
            // user control events never reach the message layer, the chunk
            // reader dispatches them on type id 4
            RtmpMessageType::UserControl => {
                return Err(crate::chunk::errors::ChunkMessageError::UnknownMessageType(
                    header.message_type_id,
                ));
            }
        };
        Ok(message)
    }
}
