// @see: 7.2.1. NetConnection Commands / 7.2.2. NetStream Commands
pub mod c2s_command_names {
    pub const CONNECT: &str = "connect";
    pub const CREATE_STREAM: &str = "createStream";
    pub const PLAY: &str = "play";
    pub const DELETE_STREAM: &str = "deleteStream";
    pub const RECEIVE_AUDIO: &str = "receiveAudio";
    pub const RECEIVE_VIDEO: &str = "receiveVideo";
    pub const PUBLISH: &str = "publish";
    pub const SEEK: &str = "seek";
    pub const PAUSE: &str = "pause";
}

pub mod s2c_command_names {
    pub const RESULT: &str = "_result";
    pub const ERROR: &str = "_error";
    pub const ON_STATUS: &str = "onStatus";
}

pub const RESPONSE_STREAM_ID: u8 = 1;
