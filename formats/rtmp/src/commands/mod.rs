use std::{collections::HashMap, fmt};

use crate::chunk::errors::ChunkMessageError;

pub mod consts;
pub mod reader;
pub mod writer;

fn extract_string_field(map: &HashMap<String, amf::Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(|value| value.try_as_str())
        .map(|v| v.to_string())
}

fn extract_number_field(map: &HashMap<String, amf::Value>, key: &str) -> Option<f64> {
    map.get(key).and_then(|value| value.try_as_f64())
}

fn extract_bool_field(map: &HashMap<String, amf::Value>, key: &str) -> Option<bool> {
    map.get(key).and_then(|value| value.try_as_bool())
}

///! @see: 7.2.1.1. connect
/// Clients differ a lot in which keys they send; only `app` is load-bearing,
/// everything else falls back to a default.
#[derive(Debug, Clone, Default)]
pub struct ConnectCommandRequestObject {
    pub app: String,
    pub flash_version: String,
    pub swf_url: String,
    pub tc_url: String,
    pub fpad: bool,
    pub audio_codecs: u16,
    pub video_codecs: u16,
    pub video_function: u16,
    pub page_url: String,
    pub object_encoding: amf::Version,
}

impl TryFrom<HashMap<String, amf::Value>> for ConnectCommandRequestObject {
    type Error = ChunkMessageError;
    fn try_from(value: HashMap<String, amf::Value>) -> Result<Self, Self::Error> {
        let app = extract_string_field(&value, "app").ok_or_else(|| {
            ChunkMessageError::UnexpectedAmfType(
                "connect command object needs an app field".to_string(),
            )
        })?;

        Ok(ConnectCommandRequestObject {
            app,
            flash_version: extract_string_field(&value, "flashver").unwrap_or_default(),
            swf_url: extract_string_field(&value, "swfUrl").unwrap_or_default(),
            tc_url: extract_string_field(&value, "tcUrl").unwrap_or_default(),
            fpad: extract_bool_field(&value, "fpad").unwrap_or(false),
            audio_codecs: extract_number_field(&value, "audioCodecs").unwrap_or(0.0) as u16,
            video_codecs: extract_number_field(&value, "videoCodecs").unwrap_or(0.0) as u16,
            video_function: extract_number_field(&value, "videoFunction").unwrap_or(0.0) as u16,
            page_url: extract_string_field(&value, "pageUrl").unwrap_or_default(),
            object_encoding: match extract_number_field(&value, "objectEncoding").unwrap_or(0.0)
                as u8
            {
                3 => amf::Version::Amf3,
                _ => amf::Version::Amf0,
            },
        })
    }
}

impl ConnectCommandRequestObject {
    fn to_amf_object(&self) -> amf::Value {
        amf::object([
            ("app".to_string(), amf::string(self.app.clone())),
            (
                "flashver".to_string(),
                amf::string(self.flash_version.clone()),
            ),
            ("swfUrl".to_string(), amf::string(self.swf_url.clone())),
            ("tcUrl".to_string(), amf::string(self.tc_url.clone())),
            ("fpad".to_string(), amf::bool(self.fpad)),
            ("audioCodecs".to_string(), amf::number(self.audio_codecs)),
            ("videoCodecs".to_string(), amf::number(self.video_codecs)),
            (
                "videoFunction".to_string(),
                amf::number(self.video_function),
            ),
            ("pageUrl".to_string(), amf::string(self.page_url.clone())),
            (
                "objectEncoding".to_string(),
                amf::number(match self.object_encoding {
                    amf::Version::Amf0 => 0_u8,
                    amf::Version::Amf3 => 3_u8,
                }),
            ),
        ])
    }
}

#[derive(Debug)]
pub struct ConnectCommandRequest {
    pub transaction_id: f64, // always 1
    pub command_object: ConnectCommandRequestObject,
    pub optional_user_arguments: Option<HashMap<String, amf::Value>>,
}

/// Read side of a connect `_result`/`_error`.
#[derive(Debug)]
pub struct ConnectCommandResponse {
    pub success: bool,
    pub transaction_id: f64,
    pub properties: Option<HashMap<String, amf::Value>>,
    pub information: Option<HashMap<String, amf::Value>>,
}

#[derive(Debug)]
pub struct CallCommandRequest {
    pub procedure_name: String,
    pub transaction_id: f64,
    pub command_object: Option<HashMap<String, amf::Value>>,
    pub optional_arguments: Option<amf::Value>,
}

/// Generic `_result`/`_error` shape; whatever followed the command object is
/// kept verbatim in `values`. A client resolves the concrete meaning through
/// its transaction table.
#[derive(Debug)]
pub struct CallCommandResponse {
    pub command_name: String, // "_result" or "_error"
    pub transaction_id: f64,
    pub command_object: Option<HashMap<String, amf::Value>>,
    pub values: Vec<amf::Value>,
}

#[derive(Debug)]
pub struct CreateStreamCommandRequest {
    pub transaction_id: f64,
    pub command_object: Option<HashMap<String, amf::Value>>,
}

#[derive(Debug)]
pub struct CreateStreamCommandResponse {
    pub success: bool,
    pub transaction_id: f64,
    pub command_object: Option<HashMap<String, amf::Value>>,
    pub stream_id: f64,
}

#[derive(Debug)]
pub struct OnStatusCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub info_object: HashMap<String, amf::Value>, // at least: level, code, description
}

#[derive(Debug)]
pub struct PlayCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub stream_name: String,
    pub start: f64,    // seconds, defaults to -2
    pub duration: f64, // seconds, defaults to -1
    pub reset: bool,
}

#[derive(Debug)]
pub struct DeleteStreamCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub stream_id: f64,
}

#[derive(Debug)]
pub struct ReceiveAudioCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub bool_flag: bool,
}

#[derive(Debug)]
pub struct ReceiveVideoCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub bool_flag: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PublishingType {
    #[default]
    Live,
    Record,
    Append,
}

impl TryFrom<&str> for PublishingType {
    type Error = ChunkMessageError;
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "live" => Ok(PublishingType::Live),
            "record" => Ok(PublishingType::Record),
            "append" => Ok(PublishingType::Append),
            _ => Err(ChunkMessageError::UnexpectedAmfType(format!(
                "expect publish type to be live, record or append, got {}",
                value
            ))),
        }
    }
}

impl fmt::Display for PublishingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublishingType::Live => write!(f, "live"),
            PublishingType::Record => write!(f, "record"),
            PublishingType::Append => write!(f, "append"),
        }
    }
}

#[derive(Debug)]
pub struct PublishCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub publishing_name: String,
    pub publishing_type: PublishingType,
}

#[derive(Debug)]
pub struct SeekCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub milliseconds: f64,
}

#[derive(Debug)]
pub struct PauseCommand {
    pub transaction_id: f64, // 0
    // command_object is null
    pub pause_flag: bool, // pause or unpause
    pub milliseconds: f64,
}

#[derive(Debug)]
pub enum RtmpC2SCommands {
    Connect(ConnectCommandRequest),
    Call(CallCommandRequest),
    CreateStream(CreateStreamCommandRequest),
    Play(PlayCommand),
    DeleteStream(DeleteStreamCommand),
    ReceiveAudio(ReceiveAudioCommand),
    ReceiveVideo(ReceiveVideoCommand),
    Publish(PublishCommand),
    Seek(SeekCommand),
    Pause(PauseCommand),
}

#[derive(Debug)]
pub enum RtmpS2CCommands {
    Connect(ConnectCommandResponse),
    Call(CallCommandResponse),
    CreateStream(CreateStreamCommandResponse),
    OnStatus(OnStatusCommand),
}

/// What a client expects a `_result`/`_error` to resolve to, looked up in its
/// transaction table.
#[derive(Debug, Clone, Copy)]
pub enum RtmpS2CCommandsType {
    Connect,
    Call,
    CreateStream,
    OnStatus,
}
