use std::io;

use rtmp_proto::commands::PublishingType;
use thiserror::Error;
use tokio_util::bytes::BytesMut;

use crate::errors::RtmpSessionError;

/// An application veto on a stream operation. The session turns it into the
/// matching error-level reply and skips the success sequence.
#[derive(Debug, Error)]
#[error("{description}")]
pub struct SessionDenied {
    pub description: String,
}

impl SessionDenied {
    pub fn new<T: Into<String>>(description: T) -> Self {
        Self {
            description: description.into(),
        }
    }
}

pub type HandlerResult = Result<(), SessionDenied>;

/// The capability surface a session drives. Callbacks run inside `input` and
/// must not call back into the same session.
pub trait SessionHandler {
    /// Ships outbound bytes towards the peer. A short write is fatal to the
    /// session, so implementations should either take everything or fail.
    fn send(&mut self, data: &[u8]) -> io::Result<()>;

    fn on_publish(
        &mut self,
        app: &str,
        stream_name: &str,
        publishing_type: PublishingType,
    ) -> HandlerResult;

    fn on_play(
        &mut self,
        app: &str,
        stream_name: &str,
        start: f64,
        duration: f64,
        reset: bool,
    ) -> HandlerResult;

    fn on_pause(&mut self, pause: bool, milliseconds: f64) -> HandlerResult {
        let _ = (pause, milliseconds);
        Ok(())
    }

    fn on_seek(&mut self, milliseconds: f64) -> HandlerResult {
        let _ = milliseconds;
        Ok(())
    }

    fn on_delete_stream(&mut self, stream_id: u32) -> HandlerResult {
        let _ = stream_id;
        Ok(())
    }

    fn on_audio(&mut self, payload: BytesMut, timestamp: u32);

    fn on_video(&mut self, payload: BytesMut, timestamp: u32);

    fn on_metadata(&mut self, payload: BytesMut, timestamp: u32) {
        let _ = (payload, timestamp);
    }

    /// The peer aborted an in-flight message on this chunk stream.
    fn on_abort(&mut self, chunk_stream_id: u32) {
        let _ = chunk_stream_id;
    }

    /// Called once for the error that poisons the session; `input` returns
    /// the same error.
    fn on_error(&mut self, error: &RtmpSessionError) {
        let _ = error;
    }
}
