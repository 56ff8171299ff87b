use std::io;

use crate::{chunk::errors::ChunkMessageResult, commands};

use super::RtmpUserMessageBody;

impl RtmpUserMessageBody {
    pub fn write_to<W>(&self, writer: &mut W, version: amf::Version) -> ChunkMessageResult<()>
    where
        W: io::Write,
    {
        match self {
            RtmpUserMessageBody::C2SCommand(command) => {
                commands::writer::Writer::new(writer, version).write_c2s(command)
            }
            RtmpUserMessageBody::S2CCommand(command) => {
                commands::writer::Writer::new(writer, version).write_s2c(command)
            }
            RtmpUserMessageBody::MetaData { payload }
            | RtmpUserMessageBody::SharedObject { payload }
            | RtmpUserMessageBody::Audio { payload }
            | RtmpUserMessageBody::Video { payload }
            | RtmpUserMessageBody::Aggregate { payload } => {
                writer.write_all(payload)?;
                Ok(())
            }
        }
    }
}
