use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use std::{cmp::min, collections::HashMap};
use tokio_util::bytes::{BufMut, BytesMut};

use crate::{
    commands::{
        CallCommandRequest, CallCommandResponse, ConnectCommandRequest, ConnectCommandResponse,
        CreateStreamCommandRequest, CreateStreamCommandResponse, DeleteStreamCommand,
        OnStatusCommand, PauseCommand, PlayCommand, PublishCommand, ReceiveAudioCommand,
        ReceiveVideoCommand, RtmpC2SCommands, RtmpS2CCommands, SeekCommand,
        consts::s2c_command_names,
    },
    message::{RtmpMessageType, RtmpUserMessageBody},
    protocol_control::{
        AbortMessage, Acknowledgement, ProtocolControlMessage, ProtocolControlMessageType,
        SetChunkSize, SetPeerBandWidthLimitType, SetPeerBandwidth, WindowAckSize,
        consts::PROTOCOL_CONTROL_MESSAGE_STREAM_ID,
    },
    user_control::{
        UserControlEvent,
        consts::{USER_CONTROL_MESSAGE_STREAM_ID, USER_CONTROL_MESSAGE_TYPE},
    },
};

use super::{
    ChunkBasicHeader, ChunkMessage, ChunkMessageCommonHeader, ChunkMessageHeader,
    ChunkMessageHeaderType0, ChunkMessageHeaderType1, ChunkMessageHeaderType2,
    ChunkMessageHeaderType3, Csid, RtmpChunkMessageBody,
    consts::{INIT_CHUNK_SIZE, MAX_TIMESTAMP, csid},
    errors::ChunkMessageResult,
};
use utils::traits::writer::WriteTo;

#[derive(Debug, Default)]
struct WriteContext {
    timestamp: u32,
    timestamp_delta: u32,
    extended_timestamp_enabled: bool,
    message_length: u32,
    message_stream_id: u32,
    message_type_id: u8,
}

/// Message-to-chunk segmenter. Output accumulates in an internal buffer the
/// embedder drains with [`Writer::split_output`]; header bytes always land
/// before their payload bytes.
#[derive(Debug)]
pub struct Writer {
    inner: BytesMut,
    context: HashMap<Csid, WriteContext>,
    chunk_size: usize,
    bytes_written: usize,
}

impl Default for Writer {
    fn default() -> Self {
        Self::new()
    }
}

impl Writer {
    pub fn new() -> Self {
        Self {
            inner: BytesMut::with_capacity(4096),
            context: HashMap::new(),
            chunk_size: INIT_CHUNK_SIZE,
            bytes_written: 0,
        }
    }

    #[inline]
    pub fn get_bytes_written(&self) -> usize {
        self.bytes_written
    }

    #[inline]
    pub fn has_output(&self) -> bool {
        !self.inner.is_empty()
    }

    /// Takes everything written so far, leaving the buffer empty.
    pub fn split_output(&mut self) -> BytesMut {
        self.inner.split()
    }

    pub fn write(
        &mut self,
        mut message: ChunkMessage,
        version: amf::Version,
    ) -> ChunkMessageResult<()> {
        let already_buffered = self.inner.len();
        let mut body = Vec::with_capacity(4096);
        match &message.chunk_message_body {
            RtmpChunkMessageBody::ProtocolControl(m) => m.write_to(&mut body)?,
            RtmpChunkMessageBody::UserControl(m) => m.write_to(&mut body)?,
            RtmpChunkMessageBody::RtmpUserMessage(m) => m.write_to(&mut body, version)?,
        }
        message.header.message_length = body.len() as u32;

        let basic_header = message.header.basic_header.clone();
        let message_header = self.justify_message_header(&message.header);

        self.write_basic_header(&basic_header)?;
        let extended = self.write_message_header(&message_header, &basic_header)?;

        let first = min(self.chunk_size, body.len());
        self.inner.extend_from_slice(&body[..first]);
        let mut offset = first;

        while offset < body.len() {
            let continuation = ChunkBasicHeader {
                fmt: 3,
                ..basic_header.clone()
            };
            self.write_basic_header(&continuation)?;
            // a continuation repeats the first chunk's extended timestamp
            if let Some(value) = extended {
                self.inner.put_u32(value);
            }
            let size = min(self.chunk_size, body.len() - offset);
            self.inner.extend_from_slice(&body[offset..offset + size]);
            offset += size;
        }

        self.bytes_written += self.inner.len() - already_buffered;
        Ok(())
    }

    /// Picks the smallest header the peer can still decode from the last one
    /// sent on this chunk stream.
    fn justify_message_header(&self, header: &ChunkMessageCommonHeader) -> ChunkMessageHeader {
        let full = ChunkMessageHeader::Type0(ChunkMessageHeaderType0 {
            timestamp: header.timestamp,
            message_length: header.message_length,
            message_type_id: header.message_type_id,
            message_stream_id: header.message_stream_id,
        });

        let ctx = match self.context.get(&header.basic_header.chunk_stream_id) {
            Some(ctx) => ctx,
            None => return full,
        };

        if ctx.message_stream_id != header.message_stream_id || header.timestamp < ctx.timestamp {
            return full;
        }

        let timestamp_delta = header.timestamp - ctx.timestamp;
        if ctx.message_length != header.message_length
            || ctx.message_type_id != header.message_type_id
        {
            return ChunkMessageHeader::Type1(ChunkMessageHeaderType1 {
                timestamp_delta,
                message_length: header.message_length,
                message_type_id: header.message_type_id,
            });
        }

        if ctx.timestamp_delta != timestamp_delta {
            return ChunkMessageHeader::Type2(ChunkMessageHeaderType2 { timestamp_delta });
        }

        ChunkMessageHeader::Type3(ChunkMessageHeaderType3 {})
    }

    fn write_basic_header(&mut self, header: &ChunkBasicHeader) -> ChunkMessageResult<()> {
        let mut writer = (&mut self.inner).writer();
        match header.header_length() {
            1 => {
                writer.write_u8((header.fmt << 6) | header.chunk_stream_id as u8)?;
            }
            2 => {
                writer.write_u8(header.fmt << 6)?;
                writer.write_u8((header.chunk_stream_id - 64) as u8)?;
            }
            _ => {
                writer.write_u8((header.fmt << 6) | 0b00000001)?;
                let csid = header.chunk_stream_id - 64;
                writer.write_u8((csid % 256) as u8)?;
                writer.write_u8((csid / 256) as u8)?;
            }
        }
        Ok(())
    }

    /// Writes the message header (and extended timestamp when escaped) and
    /// folds it into the chunk stream's write context. Returns the 4-byte
    /// value continuations have to repeat, if any.
    fn write_message_header(
        &mut self,
        header: &ChunkMessageHeader,
        basic_header: &ChunkBasicHeader,
    ) -> ChunkMessageResult<Option<u32>> {
        let ctx = self.context.entry(basic_header.chunk_stream_id).or_default();
        let mut writer = (&mut self.inner).writer();
        match header {
            ChunkMessageHeader::Type0(header) => {
                let extended = header.timestamp >= MAX_TIMESTAMP;
                writer.write_u24::<BigEndian>(header.timestamp.min(MAX_TIMESTAMP))?;
                writer.write_u24::<BigEndian>(header.message_length)?;
                writer.write_u8(header.message_type_id)?;
                writer.write_u32::<LittleEndian>(header.message_stream_id)?;
                if extended {
                    writer.write_u32::<BigEndian>(header.timestamp)?;
                }

                ctx.timestamp = header.timestamp;
                ctx.timestamp_delta = 0;
                ctx.extended_timestamp_enabled = extended;
                ctx.message_length = header.message_length;
                ctx.message_type_id = header.message_type_id;
                ctx.message_stream_id = header.message_stream_id;
                Ok(extended.then_some(header.timestamp))
            }
            ChunkMessageHeader::Type1(header) => {
                let extended = header.timestamp_delta >= MAX_TIMESTAMP;
                writer.write_u24::<BigEndian>(header.timestamp_delta.min(MAX_TIMESTAMP))?;
                writer.write_u24::<BigEndian>(header.message_length)?;
                writer.write_u8(header.message_type_id)?;
                if extended {
                    writer.write_u32::<BigEndian>(header.timestamp_delta)?;
                }

                ctx.timestamp += header.timestamp_delta;
                ctx.timestamp_delta = header.timestamp_delta;
                ctx.extended_timestamp_enabled = extended;
                ctx.message_length = header.message_length;
                ctx.message_type_id = header.message_type_id;
                Ok(extended.then_some(header.timestamp_delta))
            }
            ChunkMessageHeader::Type2(header) => {
                let extended = header.timestamp_delta >= MAX_TIMESTAMP;
                writer.write_u24::<BigEndian>(header.timestamp_delta.min(MAX_TIMESTAMP))?;
                if extended {
                    writer.write_u32::<BigEndian>(header.timestamp_delta)?;
                }

                ctx.timestamp += header.timestamp_delta;
                ctx.timestamp_delta = header.timestamp_delta;
                ctx.extended_timestamp_enabled = extended;
                Ok(extended.then_some(header.timestamp_delta))
            }
            ChunkMessageHeader::Type3(_) => {
                let extended = ctx.extended_timestamp_enabled;
                if extended {
                    writer.write_u32::<BigEndian>(ctx.timestamp_delta)?;
                }
                ctx.timestamp += ctx.timestamp_delta;
                Ok(extended.then_some(ctx.timestamp_delta))
            }
        }
    }

    fn make_protocol_control_common_header(
        message_length: u32,
        message_type: ProtocolControlMessageType,
    ) -> ChunkMessageResult<ChunkMessageCommonHeader> {
        Ok(ChunkMessageCommonHeader {
            basic_header: ChunkBasicHeader::new(0, csid::PROTOCOL_CONTROL.into())?,
            timestamp: 0,
            message_length,
            message_type_id: message_type.into(),
            message_stream_id: PROTOCOL_CONTROL_MESSAGE_STREAM_ID.into(),
            extended_timestamp_enabled: false,
        })
    }

    pub fn write_set_chunk_size(&mut self, chunk_size: u32) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_protocol_control_common_header(
                    4,
                    ProtocolControlMessageType::SetChunkSize,
                )?,
                chunk_message_body: RtmpChunkMessageBody::ProtocolControl(
                    ProtocolControlMessage::SetChunkSize(SetChunkSize {
                        chunk_size: chunk_size & 0x7FFF_FFFF,
                    }),
                ),
            },
            amf::Version::Amf0,
        )?;
        // later messages are chunked at the announced size
        self.chunk_size = (chunk_size & 0x7FFF_FFFF) as usize;
        Ok(())
    }

    pub fn write_abort_message(&mut self, chunk_stream_id: u32) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_protocol_control_common_header(
                    4,
                    ProtocolControlMessageType::Abort,
                )?,
                chunk_message_body: RtmpChunkMessageBody::ProtocolControl(
                    ProtocolControlMessage::Abort(AbortMessage { chunk_stream_id }),
                ),
            },
            amf::Version::Amf0,
        )
    }

    pub fn write_acknowledgement_message(
        &mut self,
        sequence_number: u32,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_protocol_control_common_header(
                    4,
                    ProtocolControlMessageType::Acknowledgement,
                )?,
                chunk_message_body: RtmpChunkMessageBody::ProtocolControl(
                    ProtocolControlMessage::Ack(Acknowledgement { sequence_number }),
                ),
            },
            amf::Version::Amf0,
        )
    }

    pub fn write_window_ack_size_message(
        &mut self,
        window_ack_size: u32,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_protocol_control_common_header(
                    4,
                    ProtocolControlMessageType::WindowAckSize,
                )?,
                chunk_message_body: RtmpChunkMessageBody::ProtocolControl(
                    ProtocolControlMessage::WindowAckSize(WindowAckSize {
                        size: window_ack_size,
                    }),
                ),
            },
            amf::Version::Amf0,
        )
    }

    pub fn write_set_peer_bandwidth(
        &mut self,
        ack_window_size: u32,
        limit_type: SetPeerBandWidthLimitType,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_protocol_control_common_header(
                    5,
                    ProtocolControlMessageType::SetPeerBandwidth,
                )?,
                chunk_message_body: RtmpChunkMessageBody::ProtocolControl(
                    ProtocolControlMessage::SetPeerBandwidth(SetPeerBandwidth {
                        size: ack_window_size,
                        limit_type,
                    }),
                ),
            },
            amf::Version::Amf0,
        )
    }

    fn make_user_control_common_header(
        message_length: u32,
    ) -> ChunkMessageResult<ChunkMessageCommonHeader> {
        Ok(ChunkMessageCommonHeader {
            basic_header: ChunkBasicHeader::new(0, csid::USER_CONTROL.into())?,
            timestamp: 0,
            message_length,
            message_type_id: USER_CONTROL_MESSAGE_TYPE,
            message_stream_id: USER_CONTROL_MESSAGE_STREAM_ID.into(),
            extended_timestamp_enabled: false,
        })
    }

    fn write_user_control_event(&mut self, event: UserControlEvent) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_user_control_common_header(0)?,
                chunk_message_body: RtmpChunkMessageBody::UserControl(event),
            },
            amf::Version::Amf0,
        )
    }

    pub fn write_stream_begin(&mut self, stream_id: u32) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::StreamBegin { stream_id })
    }

    pub fn write_stream_eof(&mut self, stream_id: u32) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::StreamEOF { stream_id })
    }

    pub fn write_stream_dry(&mut self, stream_id: u32) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::StreamDry { stream_id })
    }

    pub fn write_set_buffer_length(
        &mut self,
        stream_id: u32,
        buffer_length: u32,
    ) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::SetBufferLength {
            stream_id,
            buffer_length,
        })
    }

    pub fn write_stream_is_recorded(&mut self, stream_id: u32) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::StreamIsRecorded { stream_id })
    }

    pub fn write_ping_request(&mut self, timestamp: u32) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::PingRequest { timestamp })
    }

    pub fn write_ping_response(&mut self, timestamp: u32) -> ChunkMessageResult<()> {
        self.write_user_control_event(UserControlEvent::PingResponse { timestamp })
    }

    fn make_command_common_header(
        message_stream_id: u32,
        encoding: amf::Version,
    ) -> ChunkMessageResult<ChunkMessageCommonHeader> {
        let message_type = match encoding {
            amf::Version::Amf0 => RtmpMessageType::AMF0Command,
            amf::Version::Amf3 => RtmpMessageType::AMF3Command,
        };
        Ok(ChunkMessageCommonHeader {
            basic_header: ChunkBasicHeader::new(0, csid::INVOKE.into())?,
            timestamp: 0,
            message_length: 0, // justified at write time
            message_type_id: message_type.into(),
            message_stream_id,
            extended_timestamp_enabled: false,
        })
    }

    fn write_c2s_command(&mut self, command: RtmpC2SCommands) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_command_common_header(0, amf::Version::Amf0)?,
                chunk_message_body: RtmpChunkMessageBody::RtmpUserMessage(Box::new(
                    RtmpUserMessageBody::C2SCommand(command),
                )),
            },
            amf::Version::Amf0,
        )
    }

    fn write_s2c_command(
        &mut self,
        command: RtmpS2CCommands,
        message_stream_id: u32,
        encoding: amf::Version,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: Self::make_command_common_header(message_stream_id, encoding)?,
                chunk_message_body: RtmpChunkMessageBody::RtmpUserMessage(Box::new(
                    RtmpUserMessageBody::S2CCommand(command),
                )),
            },
            encoding,
        )
    }

    pub fn write_connect_request(
        &mut self,
        message: ConnectCommandRequest,
    ) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::Connect(message))
    }

    #[allow(clippy::too_many_arguments)]
    pub fn write_connect_response(
        &mut self,
        success: bool,
        transaction_id: f64,
        fmsver: &str,
        capabilities: f64,
        code: &str,
        level: &str,
        description: &str,
        encoding: amf::Version,
    ) -> ChunkMessageResult<()> {
        let mut properties = std::collections::HashMap::new();
        properties.insert("fmsVer".to_string(), amf::string(fmsver));
        properties.insert("capabilities".to_string(), amf::number(capabilities));

        let mut information = std::collections::HashMap::new();
        information.insert("level".to_string(), amf::string(level));
        information.insert("code".to_string(), amf::string(code));
        information.insert("description".to_string(), amf::string(description));
        information.insert(
            "objectEncoding".to_string(),
            amf::number(match encoding {
                amf::Version::Amf0 => 0_u8,
                amf::Version::Amf3 => 3_u8,
            }),
        );

        self.write_s2c_command(
            RtmpS2CCommands::Connect(ConnectCommandResponse {
                success,
                transaction_id,
                properties: Some(properties),
                information: Some(information),
            }),
            0,
            encoding,
        )
    }

    pub fn write_call_request(&mut self, message: CallCommandRequest) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::Call(message))
    }

    pub fn write_call_response(
        &mut self,
        success: bool,
        transaction_id: f64,
        command_object: Option<std::collections::HashMap<String, amf::Value>>,
        values: Vec<amf::Value>,
    ) -> ChunkMessageResult<()> {
        let command_name = if success {
            s2c_command_names::RESULT
        } else {
            s2c_command_names::ERROR
        };
        self.write_s2c_command(
            RtmpS2CCommands::Call(CallCommandResponse {
                command_name: command_name.to_string(),
                transaction_id,
                command_object,
                values,
            }),
            0,
            amf::Version::Amf0,
        )
    }

    pub fn write_create_stream_request(
        &mut self,
        message: CreateStreamCommandRequest,
    ) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::CreateStream(message))
    }

    pub fn write_create_stream_response(
        &mut self,
        success: bool,
        transaction_id: f64,
        stream_id: f64,
    ) -> ChunkMessageResult<()> {
        self.write_s2c_command(
            RtmpS2CCommands::CreateStream(CreateStreamCommandResponse {
                success,
                transaction_id,
                command_object: None,
                stream_id,
            }),
            0,
            amf::Version::Amf0,
        )
    }

    pub fn write_on_status_response(
        &mut self,
        level: &str,
        code: &str,
        description: &str,
        message_stream_id: u32,
        encoding: amf::Version,
    ) -> ChunkMessageResult<()> {
        let mut info_object = std::collections::HashMap::new();
        info_object.insert("level".to_string(), amf::string(level));
        info_object.insert("code".to_string(), amf::string(code));
        info_object.insert("description".to_string(), amf::string(description));
        self.write_s2c_command(
            RtmpS2CCommands::OnStatus(OnStatusCommand {
                transaction_id: 0.0,
                info_object,
            }),
            message_stream_id,
            encoding,
        )
    }

    pub fn write_play_request(&mut self, message: PlayCommand) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::Play(message))
    }

    pub fn write_delete_stream_request(
        &mut self,
        message: DeleteStreamCommand,
    ) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::DeleteStream(message))
    }

    pub fn write_receive_audio_request(
        &mut self,
        message: ReceiveAudioCommand,
    ) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::ReceiveAudio(message))
    }

    pub fn write_receive_video_request(
        &mut self,
        message: ReceiveVideoCommand,
    ) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::ReceiveVideo(message))
    }

    pub fn write_publish_request(&mut self, message: PublishCommand) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::Publish(message))
    }

    pub fn write_seek_request(&mut self, message: SeekCommand) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::Seek(message))
    }

    pub fn write_pause_request(&mut self, message: PauseCommand) -> ChunkMessageResult<()> {
        self.write_c2s_command(RtmpC2SCommands::Pause(message))
    }

    pub fn write_meta(
        &mut self,
        payload: BytesMut,
        timestamp: u32,
        message_stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: ChunkMessageCommonHeader {
                    basic_header: ChunkBasicHeader::new(0, csid::INVOKE.into())?,
                    timestamp,
                    message_length: 0,
                    message_type_id: RtmpMessageType::AMF0Data.into(),
                    message_stream_id,
                    extended_timestamp_enabled: timestamp >= MAX_TIMESTAMP,
                },
                chunk_message_body: RtmpChunkMessageBody::RtmpUserMessage(Box::new(
                    RtmpUserMessageBody::MetaData { payload },
                )),
            },
            amf::Version::Amf0,
        )
    }

    pub fn write_audio(
        &mut self,
        payload: BytesMut,
        timestamp: u32,
        message_stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: ChunkMessageCommonHeader {
                    basic_header: ChunkBasicHeader::new(0, csid::AUDIO.into())?,
                    timestamp,
                    message_length: 0,
                    message_type_id: RtmpMessageType::Audio.into(),
                    message_stream_id,
                    extended_timestamp_enabled: timestamp >= MAX_TIMESTAMP,
                },
                chunk_message_body: RtmpChunkMessageBody::RtmpUserMessage(Box::new(
                    RtmpUserMessageBody::Audio { payload },
                )),
            },
            amf::Version::Amf0,
        )
    }

    pub fn write_video(
        &mut self,
        payload: BytesMut,
        timestamp: u32,
        message_stream_id: u32,
    ) -> ChunkMessageResult<()> {
        self.write(
            ChunkMessage {
                header: ChunkMessageCommonHeader {
                    basic_header: ChunkBasicHeader::new(0, csid::VIDEO.into())?,
                    timestamp,
                    message_length: 0,
                    message_type_id: RtmpMessageType::Video.into(),
                    message_stream_id,
                    extended_timestamp_enabled: timestamp >= MAX_TIMESTAMP,
                },
                chunk_message_body: RtmpChunkMessageBody::RtmpUserMessage(Box::new(
                    RtmpUserMessageBody::Video { payload },
                )),
            },
            amf::Version::Amf0,
        )
    }
}
