pub const FMSVER: &str = "FMS/3,0,1,123";
pub const FMS_CAPABILITIES: f64 = 31.0;

pub mod response_code {
    pub const NET_CONNECTION_CONNECT_SUCCESS: &str = "NetConnection.Connect.Success";

    pub const NET_STREAM_PUBLISH_START: &str = "NetStream.Publish.Start";
    pub const NET_STREAM_PUBLISH_BAD_NAME: &str = "NetStream.Publish.BadName";
    pub const NET_STREAM_PUBLISH_FAILED: &str = "NetStream.Publish.Failed";
    pub const NET_STREAM_PLAY_START: &str = "NetStream.Play.Start";
    pub const NET_STREAM_PLAY_RESET: &str = "NetStream.Play.Reset";
    pub const NET_STREAM_PLAY_FAILED: &str = "NetStream.Play.Failed";
    pub const NET_STREAM_PAUSE_NOTIFY: &str = "NetStream.Pause.Notify";
    pub const NET_STREAM_UNPAUSE_NOTIFY: &str = "NetStream.Unpause.Notify";
    pub const NET_STREAM_PAUSE_FAILED: &str = "NetStream.Pause.Failed";
    pub const NET_STREAM_SEEK_NOTIFY: &str = "NetStream.Seek.Notify";
    pub const NET_STREAM_SEEK_FAILED: &str = "NetStream.Seek.Failed";
    pub const NET_STREAM_DELETE_SUCCESS: &str = "NetStream.DeleteStream.Success";
    pub const NET_STREAM_DELETE_FAILED: &str = "NetStream.DeleteStream.Failed";

    pub const NET_CONNECTION_CALL_FAILED: &str = "NetConnection.Call.Failed";
}

pub mod response_level {
    pub const STATUS: &str = "status";
    pub const WARNING: &str = "warning";
    pub const ERROR: &str = "error";
}
