use crate::chunk::errors::{ChunkMessageError, ChunkMessageResult};

use super::{
    CallCommandRequest, CallCommandResponse, ConnectCommandRequest, ConnectCommandRequestObject,
    ConnectCommandResponse, CreateStreamCommandRequest, CreateStreamCommandResponse,
    DeleteStreamCommand, OnStatusCommand, PauseCommand, PlayCommand, PublishCommand,
    ReceiveAudioCommand, ReceiveVideoCommand, RtmpC2SCommands, RtmpS2CCommands,
    RtmpS2CCommandsType, SeekCommand,
    consts::{c2s_command_names, s2c_command_names},
};
use amf::Value as AmfValue;
use byteorder::ReadBytesExt;
use std::{collections::HashMap, io};

#[derive(Debug)]
pub struct Reader<R> {
    inner: R,
    amf_version: amf::Version,
}

impl<R> Reader<R>
where
    R: io::Read,
{
    pub fn new(inner: R, amf_version: amf::Version) -> Self {
        Self { inner, amf_version }
    }

    /// Type 17 command payloads carry a one-byte format selector in front of
    /// the AMF0 body.
    fn skip_format_selector(&mut self) -> ChunkMessageResult<()> {
        if self.amf_version == amf::Version::Amf3 {
            self.inner.read_u8()?;
        }
        Ok(())
    }

    pub fn read_c2s_command(&mut self) -> ChunkMessageResult<RtmpC2SCommands> {
        self.skip_format_selector()?;
        let command_name = self.read_amf_string()?;

        match command_name.as_str() {
            c2s_command_names::CONNECT => {
                Ok(RtmpC2SCommands::Connect(self.read_c2s_connect_command()?))
            }
            c2s_command_names::CREATE_STREAM => Ok(RtmpC2SCommands::CreateStream(
                self.read_c2s_create_stream_command()?,
            )),
            c2s_command_names::PLAY => Ok(RtmpC2SCommands::Play(self.read_c2s_play_command()?)),
            c2s_command_names::DELETE_STREAM => Ok(RtmpC2SCommands::DeleteStream(
                self.read_c2s_delete_stream_command()?,
            )),
            c2s_command_names::RECEIVE_AUDIO => Ok(RtmpC2SCommands::ReceiveAudio(
                self.read_c2s_receive_audio_command()?,
            )),
            c2s_command_names::RECEIVE_VIDEO => Ok(RtmpC2SCommands::ReceiveVideo(
                self.read_c2s_receive_video_command()?,
            )),
            c2s_command_names::PUBLISH => {
                Ok(RtmpC2SCommands::Publish(self.read_c2s_publish_command()?))
            }
            c2s_command_names::SEEK => Ok(RtmpC2SCommands::Seek(self.read_c2s_seek_command()?)),
            c2s_command_names::PAUSE => Ok(RtmpC2SCommands::Pause(self.read_c2s_pause_command()?)),
            procedure_name => Ok(RtmpC2SCommands::Call(
                self.read_c2s_call_command(procedure_name.to_string())?,
            )),
        }
    }

    /// Client-role decoding: the caller resolves what this `_result`/`_error`
    /// answers through its transaction table and passes the expectation in.
    pub fn read_s2c_command(
        &mut self,
        command_type: RtmpS2CCommandsType,
    ) -> ChunkMessageResult<RtmpS2CCommands> {
        self.skip_format_selector()?;
        match command_type {
            RtmpS2CCommandsType::Connect => {
                Ok(RtmpS2CCommands::Connect(self.read_s2c_connect_command()?))
            }
            RtmpS2CCommandsType::Call => Ok(RtmpS2CCommands::Call(self.read_s2c_call_command()?)),
            RtmpS2CCommandsType::CreateStream => Ok(RtmpS2CCommands::CreateStream(
                self.read_s2c_create_stream_command()?,
            )),
            RtmpS2CCommandsType::OnStatus => Ok(RtmpS2CCommands::OnStatus(
                self.read_s2c_on_status_command()?,
            )),
        }
    }

    /// Decodes a response stream without a transaction table: `onStatus`
    /// parses fully, `_result`/`_error` come back as the generic call shape.
    pub fn read_s2c_command_auto(&mut self) -> ChunkMessageResult<RtmpS2CCommands> {
        self.skip_format_selector()?;
        let command_name = self.read_amf_string()?;
        match command_name.as_str() {
            s2c_command_names::ON_STATUS => Ok(RtmpS2CCommands::OnStatus(
                self.read_s2c_on_status_remaining()?,
            )),
            s2c_command_names::RESULT | s2c_command_names::ERROR => {
                let transaction_id = self.read_amf_number()?;
                let command_object = self.read_amf_object()?;
                let mut values = Vec::new();
                while let Some(value) = self.read_amf_any()? {
                    values.push(value);
                }
                Ok(RtmpS2CCommands::Call(CallCommandResponse {
                    command_name,
                    transaction_id,
                    command_object,
                    values,
                }))
            }
            name => Err(ChunkMessageError::UnexpectedCommandName(name.to_string())),
        }
    }

    fn read_c2s_connect_command(&mut self) -> ChunkMessageResult<ConnectCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        if transaction_id as u8 != 1 {
            tracing::warn!(
                "connect transaction_id should be 1, got {} instead",
                transaction_id
            );
        }
        let command_object_map = self.read_amf_object()?.ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType(
                "connect command object should be a key-value pair type".to_string(),
            )
        })?;
        let command_object: ConnectCommandRequestObject = command_object_map.try_into()?;

        let optional_user_arguments = self.read_amf_object()?;
        Ok(ConnectCommandRequest {
            transaction_id,
            command_object,
            optional_user_arguments,
        })
    }

    fn read_s2c_connect_command(&mut self) -> ChunkMessageResult<ConnectCommandResponse> {
        let command_name = self.read_result_or_error_name()?;
        let transaction_id = self.read_amf_number()?;
        let properties = self.read_amf_object()?;
        let information = self.read_amf_object()?;

        Ok(ConnectCommandResponse {
            success: command_name == s2c_command_names::RESULT,
            transaction_id,
            properties,
            information,
        })
    }

    fn read_c2s_call_command(
        &mut self,
        procedure_name: String,
    ) -> ChunkMessageResult<CallCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        let command_object = self.read_amf_object()?;
        let optional_arguments = self.read_amf_any()?;
        Ok(CallCommandRequest {
            procedure_name,
            transaction_id,
            command_object,
            optional_arguments,
        })
    }

    fn read_s2c_call_command(&mut self) -> ChunkMessageResult<CallCommandResponse> {
        let command_name = self.read_result_or_error_name()?;
        let transaction_id = self.read_amf_number()?;
        let command_object = self.read_amf_object()?;
        let mut values = Vec::new();
        while let Some(value) = self.read_amf_any()? {
            values.push(value);
        }
        Ok(CallCommandResponse {
            command_name,
            transaction_id,
            command_object,
            values,
        })
    }

    fn read_c2s_create_stream_command(&mut self) -> ChunkMessageResult<CreateStreamCommandRequest> {
        let transaction_id = self.read_amf_number()?;
        let command_object = self.read_amf_object()?;
        Ok(CreateStreamCommandRequest {
            transaction_id,
            command_object,
        })
    }

    fn read_s2c_create_stream_command(
        &mut self,
    ) -> ChunkMessageResult<CreateStreamCommandResponse> {
        let command_name = self.read_result_or_error_name()?;
        let transaction_id = self.read_amf_number()?;
        let command_object = self.read_amf_object()?;
        let stream_id = self.read_amf_number()?;
        Ok(CreateStreamCommandResponse {
            success: command_name == s2c_command_names::RESULT,
            transaction_id,
            command_object,
            stream_id,
        })
    }

    fn read_s2c_on_status_command(&mut self) -> ChunkMessageResult<OnStatusCommand> {
        let command_name = self.read_amf_string()?;
        if command_name != s2c_command_names::ON_STATUS {
            return Err(ChunkMessageError::UnexpectedCommandName(format!(
                "expect onStatus, got: {}",
                command_name
            )));
        }
        self.read_s2c_on_status_remaining()
    }

    fn read_s2c_on_status_remaining(&mut self) -> ChunkMessageResult<OnStatusCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;

        let info_object = self.read_amf_object()?.ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType(
                "onStatus info object should be a key-value pair type".to_string(),
            )
        })?;
        for field in ["level", "code", "description"] {
            if !info_object.contains_key(field) {
                return Err(ChunkMessageError::UnexpectedAmfType(format!(
                    "onStatus info object misses the {} field",
                    field
                )));
            }
        }
        match info_object.get("level").and_then(|v| v.try_as_str()) {
            Some("warning") | Some("status") | Some("error") => {}
            level => {
                return Err(ChunkMessageError::UnexpectedAmfType(format!(
                    "onStatus level should be warning, status or error, got: {:?}",
                    level
                )));
            }
        }
        Ok(OnStatusCommand {
            transaction_id,
            info_object,
        })
    }

    fn read_c2s_play_command(&mut self) -> ChunkMessageResult<PlayCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let stream_name = self.read_amf_string()?;
        // everything behind the name is optional
        let start = self.read_amf_number_or(-2.0)?;
        let duration = self.read_amf_number_or(-1.0)?;
        let reset = self.read_amf_bool_or(false)?;
        Ok(PlayCommand {
            transaction_id,
            stream_name,
            start,
            duration,
            reset,
        })
    }

    fn read_c2s_delete_stream_command(&mut self) -> ChunkMessageResult<DeleteStreamCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let stream_id = self.read_amf_number()?;
        Ok(DeleteStreamCommand {
            transaction_id,
            stream_id,
        })
    }

    fn read_c2s_receive_audio_command(&mut self) -> ChunkMessageResult<ReceiveAudioCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let bool_flag = self.read_amf_bool()?;
        Ok(ReceiveAudioCommand {
            transaction_id,
            bool_flag,
        })
    }

    fn read_c2s_receive_video_command(&mut self) -> ChunkMessageResult<ReceiveVideoCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let bool_flag = self.read_amf_bool()?;
        Ok(ReceiveVideoCommand {
            transaction_id,
            bool_flag,
        })
    }

    fn read_c2s_publish_command(&mut self) -> ChunkMessageResult<PublishCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let publishing_name = self.read_amf_string()?;
        let publishing_type = self.read_amf_string()?;
        Ok(PublishCommand {
            transaction_id,
            publishing_name,
            publishing_type: publishing_type.as_str().try_into()?,
        })
    }

    fn read_c2s_seek_command(&mut self) -> ChunkMessageResult<SeekCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let milliseconds = self.read_amf_number()?;
        Ok(SeekCommand {
            transaction_id,
            milliseconds,
        })
    }

    fn read_c2s_pause_command(&mut self) -> ChunkMessageResult<PauseCommand> {
        let transaction_id = self.read_amf_number()?;
        self.read_amf_null()?;
        let pause_flag = self.read_amf_bool()?;
        let milliseconds = self.read_amf_number()?;
        Ok(PauseCommand {
            transaction_id,
            pause_flag,
            milliseconds,
        })
    }

    fn read_result_or_error_name(&mut self) -> ChunkMessageResult<String> {
        let command_name = self.read_amf_string()?;
        if command_name != s2c_command_names::RESULT && command_name != s2c_command_names::ERROR {
            return Err(ChunkMessageError::UnexpectedCommandName(format!(
                "expect _result or _error, got: {}",
                command_name
            )));
        }
        Ok(command_name)
    }

    fn read_amf_any(&mut self) -> ChunkMessageResult<Option<AmfValue>> {
        Ok(AmfValue::read_from(&mut self.inner)?)
    }

    fn read_amf_required(&mut self) -> ChunkMessageResult<AmfValue> {
        self.read_amf_any()?.ok_or_else(|| {
            ChunkMessageError::Io(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "command ended early",
            ))
        })
    }

    fn read_amf_null(&mut self) -> ChunkMessageResult<()> {
        match self.read_amf_required()? {
            AmfValue::Null => Ok(()),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a null type, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_string(&mut self) -> ChunkMessageResult<String> {
        match self.read_amf_required()? {
            AmfValue::String(s) => Ok(s),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a string type, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_number(&mut self) -> ChunkMessageResult<f64> {
        match self.read_amf_required()? {
            AmfValue::Number(n) => Ok(n),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a number type, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_number_or(&mut self, default: f64) -> ChunkMessageResult<f64> {
        match self.read_amf_any()? {
            None => Ok(default),
            Some(AmfValue::Number(n)) => Ok(n),
            Some(value) => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a number type, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_bool(&mut self) -> ChunkMessageResult<bool> {
        match self.read_amf_required()? {
            AmfValue::Boolean(b) => Ok(b),
            value => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a bool type, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_bool_or(&mut self, default: bool) -> ChunkMessageResult<bool> {
        match self.read_amf_any()? {
            None => Ok(default),
            Some(AmfValue::Boolean(b)) => Ok(b),
            Some(value) => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect a bool type, got: {:?}",
                value
            ))),
        }
    }

    fn read_amf_object(&mut self) -> ChunkMessageResult<Option<HashMap<String, AmfValue>>> {
        match self.read_amf_any()? {
            None => Ok(None),
            Some(AmfValue::Null) | Some(AmfValue::Undefined) => Ok(None),
            Some(value) => match value.try_into_pairs() {
                Err(value) => Err(ChunkMessageError::UnexpectedAmfType(format!(
                    "expect a key-value pair type, got: {:?}",
                    value
                ))),
                Ok(pairs) => Ok(Some(pairs.collect())),
            },
        }
    }
}
