use std::{cmp::min, io::Cursor};

use rtmp_proto::{
    chunk::{self, ChunkMessage, ChunkMessageCommonHeader, RtmpChunkMessageBody,
        errors::ChunkMessageError},
    commands::{
        CallCommandRequest, ConnectCommandRequest, CreateStreamCommandRequest,
        DeleteStreamCommand, PauseCommand, PlayCommand, PublishCommand, PublishingType,
        ReceiveAudioCommand, ReceiveVideoCommand, RtmpC2SCommands, SeekCommand,
        consts::RESPONSE_STREAM_ID,
    },
    handshake::server::HandshakeServer,
    message::RtmpUserMessageBody,
    protocol_control::{
        AbortMessage, Acknowledgement, ProtocolControlMessage, SetChunkSize,
        SetPeerBandWidthLimitType, SetPeerBandwidth, WindowAckSize,
    },
    user_control::UserControlEvent,
};
use tokio_util::bytes::{Buf, BytesMut};

use crate::{
    config::RtmpSessionConfig,
    consts::{FMS_CAPABILITIES, FMSVER, response_code, response_level},
    errors::{RtmpSessionError, RtmpSessionResult},
    handler::SessionHandler,
};

#[derive(Debug, Default, Clone)]
pub struct SessionStat {
    pub audio_frames_received: u64,
    pub video_frames_received: u64,
    pub meta_frames_received: u64,
    pub aggregate_frames_received: u64,
    pub audio_frames_sent: u64,
    pub video_frames_sent: u64,
    pub meta_frames_sent: u64,
    pub audio_frames_dropped: u64,
    pub video_frames_dropped: u64,
}

#[derive(Debug, Default)]
struct StreamProperties {
    app: String,
    tc_url: String,
    stream_name: String,
    publishing_type: PublishingType,
    amf_version: amf::Version,
}

/// Push-style server session: `input` drives handshake, demultiplexing and
/// dispatch; replies and media leave through the handler's `send`. One
/// session per connection, single-threaded, dead after the first fatal error.
pub struct ServerSession<H> {
    handler: H,
    config: RtmpSessionConfig,

    read_buffer: BytesMut,
    handshake: HandshakeServer,
    chunk_reader: chunk::reader::Reader,
    chunk_writer: chunk::writer::Writer,

    stream_properties: StreamProperties,
    stream_id: u32,
    receive_audio: bool,
    receive_video: bool,
    buffer_length_ms: u32,

    ack_window_size_read: Option<u32>,
    last_acknowledged: u32,
    ack_window_size_write: Option<SetPeerBandwidth>,
    acknowledged_sequence_number: Option<u32>,

    stat: SessionStat,
    poisoned: bool,
}

impl<H> ServerSession<H>
where
    H: SessionHandler,
{
    pub fn new(handler: H, config: RtmpSessionConfig) -> Self {
        let buffer_length_ms = config.buffer_length_ms;
        Self {
            handler,
            config,
            read_buffer: BytesMut::with_capacity(4096),
            handshake: HandshakeServer::new(),
            chunk_reader: chunk::reader::Reader::new(),
            chunk_writer: chunk::writer::Writer::new(),
            stream_properties: StreamProperties::default(),
            stream_id: 0,
            receive_audio: true,
            receive_video: true,
            buffer_length_ms,
            ack_window_size_read: None,
            last_acknowledged: 0,
            ack_window_size_write: None,
            acknowledged_sequence_number: None,
            stat: SessionStat::default(),
            poisoned: false,
        }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    pub fn stats(&self) -> &SessionStat {
        &self.stat
    }

    pub fn handshake_done(&self) -> bool {
        self.handshake.is_done()
    }

    pub fn app(&self) -> &str {
        &self.stream_properties.app
    }

    pub fn tc_url(&self) -> &str {
        &self.stream_properties.tc_url
    }

    pub fn stream_name(&self) -> &str {
        &self.stream_properties.stream_name
    }

    pub fn publishing_type(&self) -> PublishingType {
        self.stream_properties.publishing_type
    }

    pub fn buffer_length_ms(&self) -> u32 {
        self.buffer_length_ms
    }

    /// The last Acknowledgement sequence number the peer reported.
    pub fn peer_acknowledged(&self) -> Option<u32> {
        self.acknowledged_sequence_number
    }

    fn fail(&mut self, err: RtmpSessionError) -> RtmpSessionError {
        self.poisoned = true;
        self.handler.on_error(&err);
        err
    }

    /// Feeds received bytes into the session. Any number of callbacks may
    /// fire before this returns; callbacks must not re-enter the session.
    pub fn input(&mut self, data: &[u8]) -> RtmpSessionResult<()> {
        if self.poisoned {
            return Err(RtmpSessionError::SessionUnusable);
        }
        self.input_inner(data).map_err(|err| self.fail(err))
    }

    fn input_inner(&mut self, data: &[u8]) -> RtmpSessionResult<()> {
        self.read_buffer.extend_from_slice(data);

        if !self.handshake.is_done() {
            let mut output = BytesMut::new();
            let mut cursor = Cursor::new(&self.read_buffer[..]);
            self.handshake.process(&mut cursor, &mut output)?;
            let consumed = cursor.position() as usize;
            self.read_buffer.advance(consumed);
            if !output.is_empty() {
                self.handler.send(&output)?;
            }
            if !self.handshake.is_done() {
                return Ok(());
            }
        }

        loop {
            let mut cursor = Cursor::new(&self.read_buffer[..]);
            match self.chunk_reader.read(&mut cursor, true) {
                Ok(Some(message)) => {
                    let consumed = cursor.position() as usize;
                    self.read_buffer.advance(consumed);
                    tracing::trace!("got message: {:?}", message.header);
                    self.process_message(message)?;
                    self.flush_output()?;
                }
                Ok(None) => break,
                Err(ChunkMessageError::IncompleteChunk) => {
                    let consumed = cursor.position() as usize;
                    self.read_buffer.advance(consumed);
                }
                Err(err) => return Err(err.into()),
            }
            self.maybe_acknowledge()?;
        }
        Ok(())
    }

    /// Outbound audio frame towards a playing client; dropped while the peer
    /// has receiveAudio off.
    pub fn send_audio(&mut self, payload: BytesMut, timestamp: u32) -> RtmpSessionResult<()> {
        if self.poisoned {
            return Err(RtmpSessionError::SessionUnusable);
        }
        if !self.receive_audio {
            self.stat.audio_frames_dropped += 1;
            return Ok(());
        }
        self.send_audio_inner(payload, timestamp)
            .map_err(|err| self.fail(err))
    }

    fn send_audio_inner(&mut self, payload: BytesMut, timestamp: u32) -> RtmpSessionResult<()> {
        self.chunk_writer
            .write_audio(payload, timestamp, self.stream_id)?;
        self.stat.audio_frames_sent += 1;
        self.flush_output()
    }

    /// Outbound video frame; dropped while the peer has receiveVideo off.
    pub fn send_video(&mut self, payload: BytesMut, timestamp: u32) -> RtmpSessionResult<()> {
        if self.poisoned {
            return Err(RtmpSessionError::SessionUnusable);
        }
        if !self.receive_video {
            self.stat.video_frames_dropped += 1;
            return Ok(());
        }
        self.send_video_inner(payload, timestamp)
            .map_err(|err| self.fail(err))
    }

    fn send_video_inner(&mut self, payload: BytesMut, timestamp: u32) -> RtmpSessionResult<()> {
        self.chunk_writer
            .write_video(payload, timestamp, self.stream_id)?;
        self.stat.video_frames_sent += 1;
        self.flush_output()
    }

    /// Outbound data message (e.g. onMetaData), an opaque AMF0 body.
    pub fn send_metadata(&mut self, payload: BytesMut) -> RtmpSessionResult<()> {
        if self.poisoned {
            return Err(RtmpSessionError::SessionUnusable);
        }
        self.send_metadata_inner(payload).map_err(|err| self.fail(err))
    }

    fn send_metadata_inner(&mut self, payload: BytesMut) -> RtmpSessionResult<()> {
        self.chunk_writer.write_meta(payload, 0, self.stream_id)?;
        self.stat.meta_frames_sent += 1;
        self.flush_output()
    }

    fn flush_output(&mut self) -> RtmpSessionResult<()> {
        if self.chunk_writer.has_output() {
            let output = self.chunk_writer.split_output();
            self.handler.send(&output)?;
        }
        Ok(())
    }

    fn maybe_acknowledge(&mut self) -> RtmpSessionResult<()> {
        if let Some(window) = self.ack_window_size_read {
            let received = self.chunk_reader.get_bytes_received();
            if received.wrapping_sub(self.last_acknowledged) >= window {
                tracing::trace!("acknowledging {} received bytes", received);
                self.chunk_writer.write_acknowledgement_message(received)?;
                self.last_acknowledged = received;
                self.flush_output()?;
            }
        }
        Ok(())
    }

    fn process_message(&mut self, message: ChunkMessage) -> RtmpSessionResult<()> {
        let header = message.header;
        match message.chunk_message_body {
            RtmpChunkMessageBody::ProtocolControl(request) => {
                self.process_protocol_control_message(request)
            }
            RtmpChunkMessageBody::UserControl(event) => self.process_user_control_event(event),
            RtmpChunkMessageBody::RtmpUserMessage(message) => {
                self.process_user_message(*message, header)
            }
        }
    }

    fn process_user_message(
        &mut self,
        message: RtmpUserMessageBody,
        header: ChunkMessageCommonHeader,
    ) -> RtmpSessionResult<()> {
        match message {
            RtmpUserMessageBody::C2SCommand(command) => self.process_user_command(command)?,
            RtmpUserMessageBody::Audio { payload } => {
                self.stat.audio_frames_received += 1;
                self.handler.on_audio(payload, header.timestamp);
            }
            RtmpUserMessageBody::Video { payload } => {
                self.stat.video_frames_received += 1;
                self.handler.on_video(payload, header.timestamp);
            }
            RtmpUserMessageBody::MetaData { payload } => {
                self.stat.meta_frames_received += 1;
                self.handler.on_metadata(payload, header.timestamp);
            }
            RtmpUserMessageBody::Aggregate { payload } => {
                self.stat.aggregate_frames_received += 1;
                tracing::warn!("ignoring an aggregate message of {} bytes", payload.len());
            }
            RtmpUserMessageBody::SharedObject { payload } => {
                tracing::warn!("ignoring a shared object message of {} bytes", payload.len());
            }
            RtmpUserMessageBody::S2CCommand(command) => {
                tracing::error!("got an unexpected s2c command: {:?}", command);
            }
        }
        Ok(())
    }

    fn process_user_command(&mut self, command: RtmpC2SCommands) -> RtmpSessionResult<()> {
        match command {
            RtmpC2SCommands::Connect(request) => self.process_connect_command(request),
            RtmpC2SCommands::Call(request) => self.process_call_request(request),
            RtmpC2SCommands::CreateStream(request) => self.process_create_stream_command(request),
            RtmpC2SCommands::DeleteStream(request) => self.process_delete_stream_command(request),
            RtmpC2SCommands::Pause(request) => self.process_pause_request(request),
            RtmpC2SCommands::Play(request) => self.process_play_request(request),
            RtmpC2SCommands::Publish(request) => self.process_publish_command(request),
            RtmpC2SCommands::ReceiveAudio(request) => self.process_receive_audio_request(request),
            RtmpC2SCommands::ReceiveVideo(request) => self.process_receive_video_request(request),
            RtmpC2SCommands::Seek(request) => self.process_seek_request(request),
        }
    }

    fn process_connect_command(
        &mut self,
        request: ConnectCommandRequest,
    ) -> RtmpSessionResult<()> {
        tracing::info!(
            "connect: app {}, tcUrl {}",
            request.command_object.app,
            request.command_object.tc_url
        );
        self.stream_properties.app = request.command_object.app;
        self.stream_properties.tc_url = request.command_object.tc_url;
        self.stream_properties.amf_version = request.command_object.object_encoding;

        self.chunk_writer
            .write_window_ack_size_message(self.config.window_ack_size)?;
        self.chunk_writer.write_set_peer_bandwidth(
            self.config.peer_bandwidth,
            SetPeerBandWidthLimitType::Dynamic,
        )?;
        self.chunk_writer.write_set_chunk_size(self.config.chunk_size)?;
        self.chunk_writer.write_connect_response(
            true,
            request.transaction_id,
            FMSVER,
            FMS_CAPABILITIES,
            response_code::NET_CONNECTION_CONNECT_SUCCESS,
            response_level::STATUS,
            "Connection succeeded.",
            self.stream_properties.amf_version,
        )?;
        Ok(())
    }

    fn process_create_stream_command(
        &mut self,
        request: CreateStreamCommandRequest,
    ) -> RtmpSessionResult<()> {
        self.stream_id = RESPONSE_STREAM_ID.into();
        self.chunk_writer.write_create_stream_response(
            true,
            request.transaction_id,
            self.stream_id as f64,
        )?;
        tracing::info!("createStream replied with stream id {}", self.stream_id);
        Ok(())
    }

    fn process_publish_command(&mut self, request: PublishCommand) -> RtmpSessionResult<()> {
        let amf_version = self.stream_properties.amf_version;
        if request.publishing_name.is_empty() {
            self.chunk_writer.write_on_status_response(
                response_level::ERROR,
                response_code::NET_STREAM_PUBLISH_BAD_NAME,
                "empty stream name",
                self.stream_id,
                amf_version,
            )?;
            return Ok(());
        }

        let verdict = self.handler.on_publish(
            &self.stream_properties.app,
            &request.publishing_name,
            request.publishing_type,
        );
        match verdict {
            Ok(()) => {
                self.stream_properties.stream_name = request.publishing_name;
                self.stream_properties.publishing_type = request.publishing_type;

                self.chunk_writer.write_stream_begin(self.stream_id)?;
                self.chunk_writer.write_on_status_response(
                    response_level::STATUS,
                    response_code::NET_STREAM_PUBLISH_START,
                    "publish start",
                    self.stream_id,
                    amf_version,
                )?;
                tracing::info!(
                    "publish start: app {}, stream {}",
                    self.stream_properties.app,
                    self.stream_properties.stream_name
                );
            }
            Err(denied) => {
                tracing::warn!("publish rejected: {}", denied);
                self.chunk_writer.write_on_status_response(
                    response_level::ERROR,
                    response_code::NET_STREAM_PUBLISH_FAILED,
                    &denied.description,
                    self.stream_id,
                    amf_version,
                )?;
            }
        }
        Ok(())
    }

    fn process_play_request(&mut self, request: PlayCommand) -> RtmpSessionResult<()> {
        let amf_version = self.stream_properties.amf_version;
        // only an explicit -1 asks for a live stream
        let live = request.start == -1.0;

        let verdict = self.handler.on_play(
            &self.stream_properties.app,
            &request.stream_name,
            request.start,
            request.duration,
            request.reset,
        );
        match verdict {
            Ok(()) => {
                self.stream_properties.stream_name = request.stream_name;
                self.stream_properties.publishing_type = if live {
                    PublishingType::Live
                } else {
                    PublishingType::Record
                };

                self.chunk_writer.write_set_chunk_size(self.config.chunk_size)?;
                if !live {
                    self.chunk_writer.write_stream_is_recorded(self.stream_id)?;
                }
                self.chunk_writer.write_stream_begin(self.stream_id)?;
                if request.reset {
                    self.chunk_writer.write_on_status_response(
                        response_level::STATUS,
                        response_code::NET_STREAM_PLAY_RESET,
                        "reset stream",
                        self.stream_id,
                        amf_version,
                    )?;
                }
                self.chunk_writer.write_on_status_response(
                    response_level::STATUS,
                    response_code::NET_STREAM_PLAY_START,
                    "play start",
                    self.stream_id,
                    amf_version,
                )?;
                tracing::info!(
                    "play start: app {}, stream {}",
                    self.stream_properties.app,
                    self.stream_properties.stream_name
                );
            }
            Err(denied) => {
                tracing::warn!("play rejected: {}", denied);
                self.chunk_writer.write_on_status_response(
                    response_level::ERROR,
                    response_code::NET_STREAM_PLAY_FAILED,
                    &denied.description,
                    self.stream_id,
                    amf_version,
                )?;
            }
        }
        Ok(())
    }

    fn process_pause_request(&mut self, request: PauseCommand) -> RtmpSessionResult<()> {
        let amf_version = self.stream_properties.amf_version;
        let verdict = self
            .handler
            .on_pause(request.pause_flag, request.milliseconds);
        let (level, code, description) = match (&verdict, request.pause_flag) {
            (Ok(()), true) => (
                response_level::STATUS,
                response_code::NET_STREAM_PAUSE_NOTIFY,
                "paused",
            ),
            (Ok(()), false) => (
                response_level::STATUS,
                response_code::NET_STREAM_UNPAUSE_NOTIFY,
                "unpaused",
            ),
            (Err(_), _) => (
                response_level::ERROR,
                response_code::NET_STREAM_PAUSE_FAILED,
                "pause failed",
            ),
        };
        self.chunk_writer.write_on_status_response(
            level,
            code,
            description,
            self.stream_id,
            amf_version,
        )?;
        Ok(())
    }

    fn process_seek_request(&mut self, request: SeekCommand) -> RtmpSessionResult<()> {
        let amf_version = self.stream_properties.amf_version;
        let verdict = self.handler.on_seek(request.milliseconds);
        let (level, code, description) = match &verdict {
            Ok(()) => (
                response_level::STATUS,
                response_code::NET_STREAM_SEEK_NOTIFY,
                "seeked",
            ),
            Err(_) => (
                response_level::ERROR,
                response_code::NET_STREAM_SEEK_FAILED,
                "seek failed",
            ),
        };
        self.chunk_writer.write_on_status_response(
            level,
            code,
            description,
            self.stream_id,
            amf_version,
        )?;
        Ok(())
    }

    fn process_delete_stream_command(
        &mut self,
        request: DeleteStreamCommand,
    ) -> RtmpSessionResult<()> {
        let amf_version = self.stream_properties.amf_version;
        let verdict = self.handler.on_delete_stream(request.stream_id as u32);
        self.stream_id = 0;
        let (level, code, description) = match &verdict {
            Ok(()) => (
                response_level::STATUS,
                response_code::NET_STREAM_DELETE_SUCCESS,
                "delete stream success",
            ),
            Err(_) => (
                response_level::ERROR,
                response_code::NET_STREAM_DELETE_FAILED,
                "delete stream failed",
            ),
        };
        self.chunk_writer.write_on_status_response(
            level,
            code,
            description,
            self.stream_id,
            amf_version,
        )?;
        tracing::info!("deleteStream handled for stream {}", request.stream_id);
        Ok(())
    }

    fn process_receive_audio_request(
        &mut self,
        request: ReceiveAudioCommand,
    ) -> RtmpSessionResult<()> {
        self.receive_audio = request.bool_flag;
        if request.bool_flag {
            let amf_version = self.stream_properties.amf_version;
            self.chunk_writer.write_on_status_response(
                response_level::STATUS,
                response_code::NET_STREAM_SEEK_NOTIFY,
                "audio resumed",
                self.stream_id,
                amf_version,
            )?;
            self.chunk_writer.write_on_status_response(
                response_level::STATUS,
                response_code::NET_STREAM_PLAY_START,
                "play start",
                self.stream_id,
                amf_version,
            )?;
        }
        Ok(())
    }

    fn process_receive_video_request(
        &mut self,
        request: ReceiveVideoCommand,
    ) -> RtmpSessionResult<()> {
        self.receive_video = request.bool_flag;
        if request.bool_flag {
            let amf_version = self.stream_properties.amf_version;
            self.chunk_writer.write_on_status_response(
                response_level::STATUS,
                response_code::NET_STREAM_SEEK_NOTIFY,
                "video resumed",
                self.stream_id,
                amf_version,
            )?;
            self.chunk_writer.write_on_status_response(
                response_level::STATUS,
                response_code::NET_STREAM_PLAY_START,
                "play start",
                self.stream_id,
                amf_version,
            )?;
        }
        Ok(())
    }

    fn process_call_request(&mut self, request: CallCommandRequest) -> RtmpSessionResult<()> {
        match request.procedure_name.as_str() {
            // stream prep calls common clients fire around publish
            "releaseStream" | "FCPublish" | "FCUnpublish" | "FCSubscribe" => {
                self.chunk_writer
                    .write_call_response(true, request.transaction_id, None, Vec::new())?;
            }
            name => {
                tracing::warn!("unknown call procedure {}, replying _error", name);
                let information = amf::object([
                    (
                        "level".to_string(),
                        amf::string(response_level::ERROR),
                    ),
                    (
                        "code".to_string(),
                        amf::string(response_code::NET_CONNECTION_CALL_FAILED),
                    ),
                    (
                        "description".to_string(),
                        amf::string(format!("no such method: {}", name)),
                    ),
                ]);
                self.chunk_writer.write_call_response(
                    false,
                    request.transaction_id,
                    None,
                    vec![information],
                )?;
            }
        }
        Ok(())
    }

    fn process_protocol_control_message(
        &mut self,
        request: ProtocolControlMessage,
    ) -> RtmpSessionResult<()> {
        match request {
            ProtocolControlMessage::SetChunkSize(request) => {
                self.process_set_chunk_size_request(request)
            }
            ProtocolControlMessage::Abort(request) => self.process_abort_request(request),
            ProtocolControlMessage::Ack(request) => self.process_acknowledgement(request),
            ProtocolControlMessage::WindowAckSize(request) => {
                self.process_window_ack_size_request(request)
            }
            ProtocolControlMessage::SetPeerBandwidth(request) => {
                self.process_set_peer_bandwidth_request(request)?
            }
        }
        Ok(())
    }

    fn process_set_chunk_size_request(&mut self, request: SetChunkSize) {
        let old_size = self
            .chunk_reader
            .set_chunk_size(request.chunk_size as usize);
        tracing::trace!(
            "inbound chunk size updated from {} to {}",
            old_size,
            request.chunk_size
        );
    }

    fn process_abort_request(&mut self, request: AbortMessage) {
        tracing::info!("peer aborted chunk stream {}", request.chunk_stream_id);
        self.chunk_reader
            .abort_chunk_message(request.chunk_stream_id);
        self.handler.on_abort(request.chunk_stream_id);
    }

    fn process_acknowledgement(&mut self, request: Acknowledgement) {
        tracing::trace!("peer acknowledged {} bytes", request.sequence_number);
        self.acknowledged_sequence_number = Some(request.sequence_number);
    }

    fn process_window_ack_size_request(&mut self, request: WindowAckSize) {
        tracing::info!("peer wants acknowledgements every {} bytes", request.size);
        self.ack_window_size_read = Some(request.size);
    }

    fn process_set_peer_bandwidth_request(
        &mut self,
        request: SetPeerBandwidth,
    ) -> RtmpSessionResult<()> {
        let mut window_ack_size = None;
        match &mut self.ack_window_size_write {
            None => self.ack_window_size_write = Some(request),
            Some(limit) => match request.limit_type {
                SetPeerBandWidthLimitType::Hard => {
                    if limit.size != request.size {
                        window_ack_size = Some(request.size);
                    }
                    *limit = request;
                }
                SetPeerBandWidthLimitType::Soft => {
                    if limit.size != request.size {
                        window_ack_size = Some(request.size);
                    }
                    limit.size = min(limit.size, request.size);
                }
                SetPeerBandWidthLimitType::Dynamic => {
                    if limit.limit_type == SetPeerBandWidthLimitType::Hard {
                        if limit.size != request.size {
                            window_ack_size = Some(request.size);
                        }
                        limit.size = request.size;
                    } else {
                        tracing::trace!("ignoring a dynamic set peer bandwidth, last was soft");
                    }
                }
            },
        }

        if let Some(size) = window_ack_size {
            self.chunk_writer.write_window_ack_size_message(size)?;
        }
        Ok(())
    }

    fn process_user_control_event(&mut self, event: UserControlEvent) -> RtmpSessionResult<()> {
        match event {
            UserControlEvent::SetBufferLength {
                stream_id: _,
                buffer_length,
            } => {
                self.buffer_length_ms = buffer_length;
                tracing::trace!("peer buffer length is {} ms", buffer_length);
            }
            UserControlEvent::PingRequest { timestamp } => {
                tracing::trace!("ping request at {}", timestamp);
                self.chunk_writer.write_ping_response(timestamp)?;
            }
            UserControlEvent::PingResponse { timestamp } => {
                tracing::trace!("ping response at {}", timestamp);
            }
            event => {
                tracing::warn!("ignoring an unexpected user control event: {:?}", event);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use rtmp_proto::{
        chunk::{self, RtmpChunkMessageBody, errors::ChunkMessageError},
        commands::{
            CallCommandRequest, ConnectCommandRequest, ConnectCommandRequestObject,
            CreateStreamCommandRequest, DeleteStreamCommand, PauseCommand, PlayCommand,
            PublishCommand, PublishingType, ReceiveAudioCommand, RtmpS2CCommands, SeekCommand,
        },
        handshake::consts::RTMP_HANDSHAKE_SIZE,
        message::RtmpUserMessageBody,
        protocol_control::{ProtocolControlMessage, SetPeerBandWidthLimitType},
        user_control::UserControlEvent,
    };
    use tokio_util::bytes::{Buf, BytesMut};

    use crate::{
        config::RtmpSessionConfig,
        handler::{HandlerResult, SessionDenied, SessionHandler},
    };

    use super::ServerSession;

    #[derive(Debug, PartialEq)]
    enum Event {
        Publish {
            app: String,
            stream_name: String,
            publishing_type: PublishingType,
        },
        Play {
            app: String,
            stream_name: String,
            start: f64,
            duration: f64,
            reset: bool,
        },
        Pause {
            pause: bool,
            milliseconds: f64,
        },
        Seek {
            milliseconds: f64,
        },
        DeleteStream {
            stream_id: u32,
        },
        Audio {
            payload: Vec<u8>,
            timestamp: u32,
        },
        Video {
            payload: Vec<u8>,
            timestamp: u32,
        },
        Metadata {
            payload: Vec<u8>,
        },
        Abort {
            chunk_stream_id: u32,
        },
    }

    #[derive(Default)]
    struct RecordingHandler {
        sent: Vec<u8>,
        events: Vec<Event>,
        errors: Vec<String>,
        deny_publish: bool,
        deny_play: bool,
    }

    impl SessionHandler for RecordingHandler {
        fn send(&mut self, data: &[u8]) -> std::io::Result<()> {
            self.sent.extend_from_slice(data);
            Ok(())
        }

        fn on_publish(
            &mut self,
            app: &str,
            stream_name: &str,
            publishing_type: PublishingType,
        ) -> HandlerResult {
            self.events.push(Event::Publish {
                app: app.to_string(),
                stream_name: stream_name.to_string(),
                publishing_type,
            });
            if self.deny_publish {
                Err(SessionDenied::new("publish denied"))
            } else {
                Ok(())
            }
        }

        fn on_play(
            &mut self,
            app: &str,
            stream_name: &str,
            start: f64,
            duration: f64,
            reset: bool,
        ) -> HandlerResult {
            self.events.push(Event::Play {
                app: app.to_string(),
                stream_name: stream_name.to_string(),
                start,
                duration,
                reset,
            });
            if self.deny_play {
                Err(SessionDenied::new("play denied"))
            } else {
                Ok(())
            }
        }

        fn on_pause(&mut self, pause: bool, milliseconds: f64) -> HandlerResult {
            self.events.push(Event::Pause {
                pause,
                milliseconds,
            });
            Ok(())
        }

        fn on_seek(&mut self, milliseconds: f64) -> HandlerResult {
            self.events.push(Event::Seek { milliseconds });
            Ok(())
        }

        fn on_delete_stream(&mut self, stream_id: u32) -> HandlerResult {
            self.events.push(Event::DeleteStream { stream_id });
            Ok(())
        }

        fn on_audio(&mut self, payload: BytesMut, timestamp: u32) {
            self.events.push(Event::Audio {
                payload: payload.to_vec(),
                timestamp,
            });
        }

        fn on_video(&mut self, payload: BytesMut, timestamp: u32) {
            self.events.push(Event::Video {
                payload: payload.to_vec(),
                timestamp,
            });
        }

        fn on_metadata(&mut self, payload: BytesMut, _timestamp: u32) {
            self.events.push(Event::Metadata {
                payload: payload.to_vec(),
            });
        }

        fn on_abort(&mut self, chunk_stream_id: u32) {
            self.events.push(Event::Abort { chunk_stream_id });
        }

        fn on_error(&mut self, error: &crate::errors::RtmpSessionError) {
            self.errors.push(error.to_string());
        }
    }

    /// What the peer sees on its end of the wire.
    #[derive(Debug)]
    enum PeerMessage {
        Control(ProtocolControlMessage),
        UserControl(UserControlEvent),
        Command(RtmpS2CCommands),
        Audio { payload: Vec<u8>, timestamp: u32 },
        Video { payload: Vec<u8>, timestamp: u32 },
        Metadata { payload: Vec<u8> },
    }

    struct PeerDecoder {
        reader: chunk::reader::Reader,
        buffer: BytesMut,
    }

    impl PeerDecoder {
        fn new() -> Self {
            Self {
                reader: chunk::reader::Reader::new(),
                buffer: BytesMut::new(),
            }
        }

        fn pull_from(&mut self, session: &mut ServerSession<RecordingHandler>) {
            self.buffer.extend_from_slice(&session.handler().sent);
            session.handler_mut().sent.clear();
        }

        fn drain(&mut self) -> Vec<PeerMessage> {
            let mut messages = Vec::new();
            loop {
                let mut cursor = Cursor::new(&self.buffer[..]);
                match self.reader.read(&mut cursor, false) {
                    Ok(Some(message)) => {
                        let consumed = cursor.position() as usize;
                        self.buffer.advance(consumed);
                        let timestamp = message.header.timestamp;
                        match message.chunk_message_body {
                            RtmpChunkMessageBody::ProtocolControl(control) => {
                                if let ProtocolControlMessage::SetChunkSize(m) = &control {
                                    self.reader.set_chunk_size(m.chunk_size as usize);
                                }
                                messages.push(PeerMessage::Control(control));
                            }
                            RtmpChunkMessageBody::UserControl(event) => {
                                messages.push(PeerMessage::UserControl(event));
                            }
                            RtmpChunkMessageBody::RtmpUserMessage(body) => match *body {
                                RtmpUserMessageBody::S2CCommand(command) => {
                                    messages.push(PeerMessage::Command(command));
                                }
                                RtmpUserMessageBody::Audio { payload } => {
                                    messages.push(PeerMessage::Audio {
                                        payload: payload.to_vec(),
                                        timestamp,
                                    });
                                }
                                RtmpUserMessageBody::Video { payload } => {
                                    messages.push(PeerMessage::Video {
                                        payload: payload.to_vec(),
                                        timestamp,
                                    });
                                }
                                RtmpUserMessageBody::MetaData { payload } => {
                                    messages.push(PeerMessage::Metadata {
                                        payload: payload.to_vec(),
                                    });
                                }
                                body => panic!("unexpected server message: {:?}", body),
                            },
                        }
                    }
                    Ok(None) => break,
                    Err(ChunkMessageError::IncompleteChunk) => {
                        let consumed = cursor.position() as usize;
                        self.buffer.advance(consumed);
                    }
                    Err(err) => panic!("peer side failed to parse server bytes: {:?}", err),
                }
            }
            messages
        }
    }

    fn object_get(value: &amf::Value, key: &str) -> Option<amf::Value> {
        match value {
            amf::Value::Object { entries } => entries
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone()),
            _ => None,
        }
    }

    fn on_status_code(command: &RtmpS2CCommands) -> String {
        match command {
            RtmpS2CCommands::OnStatus(status) => status
                .info_object
                .get("code")
                .and_then(|v| v.try_as_str())
                .unwrap_or_default()
                .to_string(),
            command => panic!("expected an onStatus, got {:?}", command),
        }
    }

    fn start_session(handler: RecordingHandler) -> (ServerSession<RecordingHandler>, PeerDecoder) {
        let mut session = ServerSession::new(handler, RtmpSessionConfig::default());
        session.input(&[3]).unwrap();
        session.input(&vec![0u8; RTMP_HANDSHAKE_SIZE]).unwrap();
        session.input(&vec![0u8; RTMP_HANDSHAKE_SIZE]).unwrap();
        assert!(session.handshake_done());
        assert_eq!(session.handler().sent.len(), 1 + 2 * RTMP_HANDSHAKE_SIZE);
        session.handler_mut().sent.clear();
        (session, PeerDecoder::new())
    }

    fn feed(
        session: &mut ServerSession<RecordingHandler>,
        peer: &mut PeerDecoder,
        client: &mut chunk::writer::Writer,
    ) {
        let bytes = client.split_output();
        session.input(&bytes).unwrap();
        peer.pull_from(session);
    }

    fn connect(session: &mut ServerSession<RecordingHandler>, peer: &mut PeerDecoder) {
        let mut client = chunk::writer::Writer::new();
        client
            .write_connect_request(ConnectCommandRequest {
                transaction_id: 1.0,
                command_object: ConnectCommandRequestObject {
                    app: "live".to_string(),
                    tc_url: "rtmp://localhost/live".to_string(),
                    ..Default::default()
                },
                optional_user_arguments: None,
            })
            .unwrap();
        feed(session, peer, &mut client);
    }

    fn create_stream(session: &mut ServerSession<RecordingHandler>, peer: &mut PeerDecoder) {
        let mut client = chunk::writer::Writer::new();
        client
            .write_create_stream_request(CreateStreamCommandRequest {
                transaction_id: 4.0,
                command_object: None,
            })
            .unwrap();
        feed(session, peer, &mut client);
    }

    #[test]
    fn handshake_emits_s0_s1_s2() {
        let mut session =
            ServerSession::new(RecordingHandler::default(), RtmpSessionConfig::default());

        session.input(&[3]).unwrap();
        assert!(session.handler().sent.is_empty());

        session.input(&vec![0u8; RTMP_HANDSHAKE_SIZE]).unwrap();
        let sent = &session.handler().sent;
        assert_eq!(sent.len(), 1 + 2 * RTMP_HANDSHAKE_SIZE);
        assert_eq!(sent[0], 3);
        // s2 echoes c1
        assert_eq!(
            &sent[1 + RTMP_HANDSHAKE_SIZE..],
            &vec![0u8; RTMP_HANDSHAKE_SIZE][..]
        );
        assert!(!session.handshake_done());

        session.input(&vec![0u8; RTMP_HANDSHAKE_SIZE]).unwrap();
        assert!(session.handshake_done());
    }

    #[test]
    fn handshake_rejects_future_versions() {
        let mut session =
            ServerSession::new(RecordingHandler::default(), RtmpSessionConfig::default());
        assert!(session.input(&[9]).is_err());
        assert!(!session.handler().errors.is_empty());
        assert!(matches!(
            session.input(&[3]),
            Err(crate::errors::RtmpSessionError::SessionUnusable)
        ));
    }

    #[test]
    fn connect_pushes_window_bandwidth_chunk_size_then_result() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);

        let messages = peer.drain();
        assert_eq!(messages.len(), 4);

        match &messages[0] {
            PeerMessage::Control(ProtocolControlMessage::WindowAckSize(m)) => {
                assert_eq!(m.size, 2_500_000);
            }
            message => panic!("expected window ack size, got {:?}", message),
        }
        match &messages[1] {
            PeerMessage::Control(ProtocolControlMessage::SetPeerBandwidth(m)) => {
                assert_eq!(m.size, 2_500_000);
                assert_eq!(m.limit_type, SetPeerBandWidthLimitType::Dynamic);
            }
            message => panic!("expected set peer bandwidth, got {:?}", message),
        }
        match &messages[2] {
            PeerMessage::Control(ProtocolControlMessage::SetChunkSize(m)) => {
                assert_eq!(m.chunk_size, 4096);
            }
            message => panic!("expected set chunk size, got {:?}", message),
        }
        match &messages[3] {
            PeerMessage::Command(RtmpS2CCommands::Call(response)) => {
                assert_eq!(response.command_name, "_result");
                assert_eq!(response.transaction_id, 1.0);
                let properties = response.command_object.as_ref().unwrap();
                assert_eq!(
                    properties.get("fmsVer").unwrap().try_as_str(),
                    Some("FMS/3,0,1,123")
                );
                assert_eq!(
                    properties.get("capabilities").unwrap().try_as_f64(),
                    Some(31.0)
                );
                assert_eq!(
                    object_get(&response.values[0], "code").unwrap().try_as_str(),
                    Some("NetConnection.Connect.Success")
                );
            }
            message => panic!("expected the connect _result, got {:?}", message),
        }

        assert_eq!(session.app(), "live");
        assert_eq!(session.tc_url(), "rtmp://localhost/live");
    }

    #[test]
    fn create_stream_replies_with_stream_id_one() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        peer.drain();

        create_stream(&mut session, &mut peer);
        let messages = peer.drain();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            PeerMessage::Command(RtmpS2CCommands::Call(response)) => {
                assert_eq!(response.command_name, "_result");
                assert_eq!(response.transaction_id, 4.0);
                assert!(response.command_object.is_none());
                assert_eq!(response.values[0].try_as_f64(), Some(1.0));
            }
            message => panic!("expected the createStream _result, got {:?}", message),
        }
    }

    #[test]
    fn publish_sends_stream_begin_then_status_and_forwards_audio() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_publish_request(PublishCommand {
                transaction_id: 0.0,
                publishing_name: "cam".to_string(),
                publishing_type: PublishingType::Live,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        assert_eq!(
            session.handler().events,
            vec![Event::Publish {
                app: "live".to_string(),
                stream_name: "cam".to_string(),
                publishing_type: PublishingType::Live,
            }]
        );

        let messages = peer.drain();
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            PeerMessage::UserControl(UserControlEvent::StreamBegin { stream_id }) => {
                assert_eq!(*stream_id, 1);
            }
            message => panic!("expected stream begin, got {:?}", message),
        }
        match &messages[1] {
            PeerMessage::Command(command) => {
                assert_eq!(on_status_code(command), "NetStream.Publish.Start");
            }
            message => panic!("expected the publish onStatus, got {:?}", message),
        }

        session.handler_mut().events.clear();
        let mut client = chunk::writer::Writer::new();
        client
            .write_audio(BytesMut::from(&[1u8, 2, 3][..]), 0, 1)
            .unwrap();
        client
            .write_audio(BytesMut::from(&[4u8, 5, 6][..]), 20, 1)
            .unwrap();
        client
            .write_audio(BytesMut::from(&[7u8, 8, 9][..]), 40, 1)
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        let timestamps: Vec<u32> = session
            .handler()
            .events
            .iter()
            .map(|event| match event {
                Event::Audio { timestamp, .. } => *timestamp,
                event => panic!("expected audio, got {:?}", event),
            })
            .collect();
        assert_eq!(timestamps, vec![0, 20, 40]);
        assert_eq!(session.stats().audio_frames_received, 3);

        session.handler_mut().events.clear();
        let mut client = chunk::writer::Writer::new();
        client
            .write_meta(BytesMut::from(&[2u8; 40][..]), 0, 1)
            .unwrap();
        client
            .write_video(BytesMut::from(&[3u8; 60][..]), 50, 1)
            .unwrap();
        feed(&mut session, &mut peer, &mut client);
        assert_eq!(
            session.handler().events,
            vec![
                Event::Metadata {
                    payload: vec![2u8; 40]
                },
                Event::Video {
                    payload: vec![3u8; 60],
                    timestamp: 50,
                },
            ]
        );
        assert_eq!(session.stats().meta_frames_received, 1);
        assert_eq!(session.stats().video_frames_received, 1);
    }

    #[test]
    fn publish_rejection_suppresses_the_success_path() {
        let handler = RecordingHandler {
            deny_publish: true,
            ..Default::default()
        };
        let (mut session, mut peer) = start_session(handler);
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_publish_request(PublishCommand {
                transaction_id: 0.0,
                publishing_name: "cam".to_string(),
                publishing_type: PublishingType::Live,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        let messages = peer.drain();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            PeerMessage::Command(RtmpS2CCommands::OnStatus(status)) => {
                assert_eq!(
                    status.info_object.get("level").unwrap().try_as_str(),
                    Some("error")
                );
                assert_eq!(
                    status.info_object.get("code").unwrap().try_as_str(),
                    Some("NetStream.Publish.Failed")
                );
                assert_eq!(
                    status.info_object.get("description").unwrap().try_as_str(),
                    Some("publish denied")
                );
            }
            message => panic!("expected an error onStatus, got {:?}", message),
        }
    }

    #[test]
    fn play_rejection_answers_with_an_error_status() {
        let handler = RecordingHandler {
            deny_play: true,
            ..Default::default()
        };
        let (mut session, mut peer) = start_session(handler);
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_play_request(PlayCommand {
                transaction_id: 0.0,
                stream_name: "cam".to_string(),
                start: -1.0,
                duration: -1.0,
                reset: false,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        let messages = peer.drain();
        assert_eq!(messages.len(), 1);
        match &messages[0] {
            PeerMessage::Command(RtmpS2CCommands::OnStatus(status)) => {
                assert_eq!(
                    status.info_object.get("level").unwrap().try_as_str(),
                    Some("error")
                );
                assert_eq!(
                    status.info_object.get("code").unwrap().try_as_str(),
                    Some("NetStream.Play.Failed")
                );
            }
            message => panic!("expected an error onStatus, got {:?}", message),
        }
    }

    #[test]
    fn play_live_with_reset() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_play_request(PlayCommand {
                transaction_id: 0.0,
                stream_name: "cam".to_string(),
                start: -1.0,
                duration: -1.0,
                reset: true,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        assert_eq!(
            session.handler().events,
            vec![Event::Play {
                app: "live".to_string(),
                stream_name: "cam".to_string(),
                start: -1.0,
                duration: -1.0,
                reset: true,
            }]
        );

        let messages = peer.drain();
        assert_eq!(messages.len(), 4);
        assert!(matches!(
            messages[0],
            PeerMessage::Control(ProtocolControlMessage::SetChunkSize(_))
        ));
        assert!(matches!(
            messages[1],
            PeerMessage::UserControl(UserControlEvent::StreamBegin { stream_id: 1 })
        ));
        match &messages[2] {
            PeerMessage::Command(command) => {
                assert_eq!(on_status_code(command), "NetStream.Play.Reset");
            }
            message => panic!("expected the reset onStatus, got {:?}", message),
        }
        match &messages[3] {
            PeerMessage::Command(command) => {
                assert_eq!(on_status_code(command), "NetStream.Play.Start");
            }
            message => panic!("expected the start onStatus, got {:?}", message),
        }
    }

    #[test]
    fn play_recorded_announces_stream_is_recorded() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_play_request(PlayCommand {
                transaction_id: 0.0,
                stream_name: "vod".to_string(),
                start: 0.0,
                duration: -1.0,
                reset: false,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        let messages = peer.drain();
        assert_eq!(messages.len(), 4);
        assert!(matches!(
            messages[1],
            PeerMessage::UserControl(UserControlEvent::StreamIsRecorded { stream_id: 1 })
        ));
        assert!(matches!(
            messages[2],
            PeerMessage::UserControl(UserControlEvent::StreamBegin { stream_id: 1 })
        ));
        match &messages[3] {
            PeerMessage::Command(command) => {
                assert_eq!(on_status_code(command), "NetStream.Play.Start");
            }
            message => panic!("expected the start onStatus, got {:?}", message),
        }
    }

    #[test]
    fn media_path_round_trips_extended_timestamps() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);

        let mut client = chunk::writer::Writer::new();
        client
            .write_play_request(PlayCommand {
                transaction_id: 0.0,
                stream_name: "cam".to_string(),
                start: -1.0,
                duration: -1.0,
                reset: false,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);
        peer.drain();

        session
            .send_video(BytesMut::from(&[1u8, 2, 3, 4][..]), 0x0100_0000)
            .unwrap();
        session
            .send_audio(BytesMut::from(&[5u8, 6][..]), 0x0100_0010)
            .unwrap();
        session.send_metadata(BytesMut::from(&[9u8; 16][..])).unwrap();
        peer.pull_from(&mut session);

        let messages = peer.drain();
        assert_eq!(messages.len(), 3);
        match &messages[0] {
            PeerMessage::Video { payload, timestamp } => {
                assert_eq!(payload, &vec![1, 2, 3, 4]);
                assert_eq!(*timestamp, 0x0100_0000);
            }
            message => panic!("expected video, got {:?}", message),
        }
        match &messages[1] {
            PeerMessage::Audio { payload, timestamp } => {
                assert_eq!(payload, &vec![5, 6]);
                assert_eq!(*timestamp, 0x0100_0010);
            }
            message => panic!("expected audio, got {:?}", message),
        }
        match &messages[2] {
            PeerMessage::Metadata { payload } => assert_eq!(payload, &vec![9u8; 16]),
            message => panic!("expected metadata, got {:?}", message),
        }
        assert_eq!(session.stats().video_frames_sent, 1);
        assert_eq!(session.stats().audio_frames_sent, 1);
        assert_eq!(session.stats().meta_frames_sent, 1);
    }

    #[test]
    fn set_chunk_size_lets_large_messages_through() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());

        let payload: Vec<u8> = (0..5000).map(|i| (i % 256) as u8).collect();
        let mut client = chunk::writer::Writer::new();
        client.write_set_chunk_size(4096).unwrap();
        client
            .write_audio(BytesMut::from(&payload[..]), 33, 1)
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        assert_eq!(
            session.handler().events,
            vec![Event::Audio {
                payload: payload.clone(),
                timestamp: 33,
            }]
        );
    }

    #[test]
    fn ping_request_is_echoed() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());

        let mut client = chunk::writer::Writer::new();
        client.write_ping_request(0x1234_5678).unwrap();
        feed(&mut session, &mut peer, &mut client);

        let messages = peer.drain();
        assert_eq!(messages.len(), 1);
        assert!(matches!(
            messages[0],
            PeerMessage::UserControl(UserControlEvent::PingResponse {
                timestamp: 0x1234_5678
            })
        ));
    }

    #[test]
    fn receive_audio_off_drops_outbound_audio() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_receive_audio_request(ReceiveAudioCommand {
                transaction_id: 0.0,
                bool_flag: false,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);
        assert!(peer.drain().is_empty());

        session
            .send_audio(BytesMut::from(&[1u8, 2][..]), 0)
            .unwrap();
        peer.pull_from(&mut session);
        assert!(peer.drain().is_empty());
        assert_eq!(session.stats().audio_frames_dropped, 1);

        // switching it back on elicits the double status reply
        let mut client = chunk::writer::Writer::new();
        client
            .write_receive_audio_request(ReceiveAudioCommand {
                transaction_id: 0.0,
                bool_flag: true,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);
        let messages = peer.drain();
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            PeerMessage::Command(command) => {
                assert_eq!(on_status_code(command), "NetStream.Seek.Notify");
            }
            message => panic!("expected an onStatus, got {:?}", message),
        }
        match &messages[1] {
            PeerMessage::Command(command) => {
                assert_eq!(on_status_code(command), "NetStream.Play.Start");
            }
            message => panic!("expected an onStatus, got {:?}", message),
        }

        session
            .send_audio(BytesMut::from(&[3u8, 4][..]), 10)
            .unwrap();
        peer.pull_from(&mut session);
        assert_eq!(peer.drain().len(), 1);
    }

    #[test]
    fn pause_seek_and_delete_stream_reply_with_notifications() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        create_stream(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_pause_request(PauseCommand {
                transaction_id: 0.0,
                pause_flag: true,
                milliseconds: 1000.0,
            })
            .unwrap();
        client
            .write_pause_request(PauseCommand {
                transaction_id: 0.0,
                pause_flag: false,
                milliseconds: 1000.0,
            })
            .unwrap();
        client
            .write_seek_request(SeekCommand {
                transaction_id: 0.0,
                milliseconds: 3000.0,
            })
            .unwrap();
        client
            .write_delete_stream_request(DeleteStreamCommand {
                transaction_id: 0.0,
                stream_id: 1.0,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        let codes: Vec<String> = peer
            .drain()
            .iter()
            .map(|message| match message {
                PeerMessage::Command(command) => on_status_code(command),
                message => panic!("expected commands only, got {:?}", message),
            })
            .collect();
        assert_eq!(
            codes,
            vec![
                "NetStream.Pause.Notify",
                "NetStream.Unpause.Notify",
                "NetStream.Seek.Notify",
                "NetStream.DeleteStream.Success",
            ]
        );

        assert_eq!(
            session.handler().events,
            vec![
                Event::Pause {
                    pause: true,
                    milliseconds: 1000.0
                },
                Event::Pause {
                    pause: false,
                    milliseconds: 1000.0
                },
                Event::Seek {
                    milliseconds: 3000.0
                },
                Event::DeleteStream { stream_id: 1 },
            ]
        );
    }

    #[test]
    fn release_stream_gets_a_result_and_unknown_calls_an_error() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());
        connect(&mut session, &mut peer);
        peer.drain();

        let mut client = chunk::writer::Writer::new();
        client
            .write_call_request(CallCommandRequest {
                procedure_name: "releaseStream".to_string(),
                transaction_id: 2.0,
                command_object: None,
                optional_arguments: Some(amf::string("cam")),
            })
            .unwrap();
        client
            .write_call_request(CallCommandRequest {
                procedure_name: "doMagic".to_string(),
                transaction_id: 3.0,
                command_object: None,
                optional_arguments: None,
            })
            .unwrap();
        feed(&mut session, &mut peer, &mut client);

        let messages = peer.drain();
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            PeerMessage::Command(RtmpS2CCommands::Call(response)) => {
                assert_eq!(response.command_name, "_result");
                assert_eq!(response.transaction_id, 2.0);
            }
            message => panic!("expected a call _result, got {:?}", message),
        }
        match &messages[1] {
            PeerMessage::Command(RtmpS2CCommands::Call(response)) => {
                assert_eq!(response.command_name, "_error");
                assert_eq!(response.transaction_id, 3.0);
                assert_eq!(
                    object_get(&response.values[0], "code").unwrap().try_as_str(),
                    Some("NetConnection.Call.Failed")
                );
            }
            message => panic!("expected a call _error, got {:?}", message),
        }
    }

    #[test]
    fn window_ack_size_makes_the_session_acknowledge() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());

        let mut client = chunk::writer::Writer::new();
        client.write_window_ack_size_message(64).unwrap();
        for i in 0u32..4 {
            client
                .write_audio(BytesMut::from(&[i as u8; 30][..]), i * 10, 1)
                .unwrap();
        }
        feed(&mut session, &mut peer, &mut client);

        let acks: Vec<u32> = peer
            .drain()
            .iter()
            .filter_map(|message| match message {
                PeerMessage::Control(ProtocolControlMessage::Ack(m)) => Some(m.sequence_number),
                _ => None,
            })
            .collect();
        assert!(!acks.is_empty());
        assert!(acks[0] >= 64);
    }

    #[test]
    fn abort_discards_reassembly_and_surfaces_the_event() {
        let (mut session, mut peer) = start_session(RecordingHandler::default());

        // half of a 200-byte message on chunk stream 5
        let mut partial = vec![0x05];
        partial.extend([0x00, 0x00, 0x01]); // timestamp 1
        partial.extend([0x00, 0x00, 0xC8]); // length 200
        partial.push(8);
        partial.extend(1u32.to_le_bytes());
        partial.extend(vec![0x55u8; 128]);
        session.input(&partial).unwrap();

        let mut client = chunk::writer::Writer::new();
        client.write_abort_message(5).unwrap();
        feed(&mut session, &mut peer, &mut client);

        assert_eq!(
            session.handler().events,
            vec![Event::Abort {
                chunk_stream_id: 5
            }]
        );

        // the chunk stream is usable again from a fresh full header
        let mut fresh = vec![0x05];
        fresh.extend([0x00, 0x00, 0x02]);
        fresh.extend([0x00, 0x00, 0x02]); // length 2
        fresh.push(8);
        fresh.extend(1u32.to_le_bytes());
        fresh.extend([0xAA, 0xBB]);
        session.input(&fresh).unwrap();

        assert!(matches!(
            session.handler().events.last(),
            Some(Event::Audio { .. })
        ));
    }

    #[test]
    fn garbage_after_handshake_poisons_the_session() {
        let (mut session, _peer) = start_session(RecordingHandler::default());

        // a continuation chunk for a stream that never started
        let result = session.input(&[0xC7, 0x00]);
        assert!(result.is_err());
        assert_eq!(session.handler().errors.len(), 1);
        assert!(matches!(
            session.input(&[0x03]),
            Err(crate::errors::RtmpSessionError::SessionUnusable)
        ));
    }
}
