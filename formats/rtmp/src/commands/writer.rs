use std::{collections::HashMap, io};

use byteorder::WriteBytesExt;
use utils::traits::writer::WriteTo;

use crate::chunk::errors::ChunkMessageResult;

use super::{
    CallCommandRequest, CallCommandResponse, ConnectCommandRequest, ConnectCommandResponse,
    CreateStreamCommandRequest, CreateStreamCommandResponse, DeleteStreamCommand, OnStatusCommand,
    PauseCommand, PlayCommand, PublishCommand, ReceiveAudioCommand, ReceiveVideoCommand,
    RtmpC2SCommands, RtmpS2CCommands, SeekCommand,
    consts::{c2s_command_names, s2c_command_names},
};

#[derive(Debug)]
pub struct Writer<W> {
    inner: W,
    amf_version: amf::Version,
}

impl<W> Writer<W>
where
    W: io::Write,
{
    pub fn new(inner: W, amf_version: amf::Version) -> Self {
        Self { inner, amf_version }
    }

    fn write_format_selector(&mut self) -> ChunkMessageResult<()> {
        if self.amf_version == amf::Version::Amf3 {
            self.inner.write_u8(0)?;
        }
        Ok(())
    }

    pub fn write_c2s(&mut self, command: &RtmpC2SCommands) -> ChunkMessageResult<()> {
        self.write_format_selector()?;
        match command {
            RtmpC2SCommands::Connect(request) => self.write_connect_request(request),
            RtmpC2SCommands::Call(request) => self.write_call_request(request),
            RtmpC2SCommands::CreateStream(request) => self.write_create_stream_request(request),
            RtmpC2SCommands::Play(request) => self.write_play_request(request),
            RtmpC2SCommands::DeleteStream(request) => self.write_delete_stream_request(request),
            RtmpC2SCommands::ReceiveAudio(request) => self.write_receive_audio_request(request),
            RtmpC2SCommands::ReceiveVideo(request) => self.write_receive_video_request(request),
            RtmpC2SCommands::Publish(request) => self.write_publish_request(request),
            RtmpC2SCommands::Seek(request) => self.write_seek_request(request),
            RtmpC2SCommands::Pause(request) => self.write_pause_request(request),
        }
    }

    pub fn write_s2c(&mut self, command: &RtmpS2CCommands) -> ChunkMessageResult<()> {
        self.write_format_selector()?;
        match command {
            RtmpS2CCommands::Connect(response) => self.write_connect_response(response),
            RtmpS2CCommands::Call(response) => self.write_call_response(response),
            RtmpS2CCommands::CreateStream(response) => self.write_create_stream_response(response),
            RtmpS2CCommands::OnStatus(command) => self.write_on_status(command),
        }
    }

    fn write_connect_request(&mut self, request: &ConnectCommandRequest) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::CONNECT))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&request.command_object.to_amf_object())?;
        if let Some(arguments) = &request.optional_user_arguments {
            self.write_object(arguments)?;
        }
        Ok(())
    }

    fn write_connect_response(
        &mut self,
        response: &ConnectCommandResponse,
    ) -> ChunkMessageResult<()> {
        self.write_result_or_error_name(response.success)?;
        self.write_value(&amf::number(response.transaction_id))?;
        self.write_optional_object(&response.properties)?;
        self.write_optional_object(&response.information)?;
        Ok(())
    }

    fn write_call_request(&mut self, request: &CallCommandRequest) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(request.procedure_name.clone()))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_optional_object(&request.command_object)?;
        if let Some(arguments) = &request.optional_arguments {
            self.write_value(arguments)?;
        }
        Ok(())
    }

    fn write_call_response(&mut self, response: &CallCommandResponse) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(response.command_name.clone()))?;
        self.write_value(&amf::number(response.transaction_id))?;
        self.write_optional_object(&response.command_object)?;
        for value in &response.values {
            self.write_value(value)?;
        }
        Ok(())
    }

    fn write_create_stream_request(
        &mut self,
        request: &CreateStreamCommandRequest,
    ) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::CREATE_STREAM))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_optional_object(&request.command_object)?;
        Ok(())
    }

    fn write_create_stream_response(
        &mut self,
        response: &CreateStreamCommandResponse,
    ) -> ChunkMessageResult<()> {
        self.write_result_or_error_name(response.success)?;
        self.write_value(&amf::number(response.transaction_id))?;
        self.write_optional_object(&response.command_object)?;
        self.write_value(&amf::number(response.stream_id))?;
        Ok(())
    }

    fn write_on_status(&mut self, command: &OnStatusCommand) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(s2c_command_names::ON_STATUS))?;
        self.write_value(&amf::number(command.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_object(&command.info_object)?;
        Ok(())
    }

    fn write_play_request(&mut self, request: &PlayCommand) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::PLAY))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::string(request.stream_name.clone()))?;
        self.write_value(&amf::number(request.start))?;
        self.write_value(&amf::number(request.duration))?;
        self.write_value(&amf::bool(request.reset))?;
        Ok(())
    }

    fn write_delete_stream_request(
        &mut self,
        request: &DeleteStreamCommand,
    ) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::DELETE_STREAM))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::number(request.stream_id))?;
        Ok(())
    }

    fn write_receive_audio_request(
        &mut self,
        request: &ReceiveAudioCommand,
    ) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::RECEIVE_AUDIO))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::bool(request.bool_flag))?;
        Ok(())
    }

    fn write_receive_video_request(
        &mut self,
        request: &ReceiveVideoCommand,
    ) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::RECEIVE_VIDEO))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::bool(request.bool_flag))?;
        Ok(())
    }

    fn write_publish_request(&mut self, request: &PublishCommand) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::PUBLISH))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::string(request.publishing_name.clone()))?;
        self.write_value(&amf::string(request.publishing_type.to_string()))?;
        Ok(())
    }

    fn write_seek_request(&mut self, request: &SeekCommand) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::SEEK))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::number(request.milliseconds))?;
        Ok(())
    }

    fn write_pause_request(&mut self, request: &PauseCommand) -> ChunkMessageResult<()> {
        self.write_value(&amf::string(c2s_command_names::PAUSE))?;
        self.write_value(&amf::number(request.transaction_id))?;
        self.write_value(&amf::null())?;
        self.write_value(&amf::bool(request.pause_flag))?;
        self.write_value(&amf::number(request.milliseconds))?;
        Ok(())
    }

    fn write_result_or_error_name(&mut self, success: bool) -> ChunkMessageResult<()> {
        let name = if success {
            s2c_command_names::RESULT
        } else {
            s2c_command_names::ERROR
        };
        self.write_value(&amf::string(name))
    }

    fn write_value(&mut self, value: &amf::Value) -> ChunkMessageResult<()> {
        value.write_to(&mut self.inner)?;
        Ok(())
    }

    fn write_object(&mut self, map: &HashMap<String, amf::Value>) -> ChunkMessageResult<()> {
        let value = amf::object(map.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.write_value(&value)
    }

    fn write_optional_object(
        &mut self,
        map: &Option<HashMap<String, amf::Value>>,
    ) -> ChunkMessageResult<()> {
        match map {
            Some(map) => self.write_object(map),
            None => self.write_value(&amf::null()),
        }
    }
}
