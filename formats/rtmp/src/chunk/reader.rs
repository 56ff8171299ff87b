use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use std::{
    cmp::min,
    collections::HashMap,
    io::{Cursor, Read},
};
use tokio_util::bytes::{Buf, BytesMut};

use crate::{message::RtmpUserMessageBody, protocol_control, user_control};

use super::{
    ChunkBasicHeader, ChunkMessage, ChunkMessageCommonHeader, ChunkMessageType, Csid,
    RtmpChunkMessageBody,
    consts::{INIT_CHUNK_SIZE, MAX_TIMESTAMP},
    errors::{ChunkMessageError, ChunkMessageResult},
};
use utils::traits::reader::ReadFrom;

#[derive(Debug, Default)]
struct ChunkPayload {
    payload: BytesMut,
    remaining_length: usize,
}

/// Per chunk-stream state: the last full header plus the running message
/// clock and the reassembly buffer.
#[derive(Debug, Default)]
struct ReadContext {
    timestamp: u64,
    timestamp_delta: u32,
    extended_timestamp_enabled: bool,
    message_length: u32,
    message_stream_id: u32,
    message_type_id: u8,
    incomplete_chunk: Option<ChunkPayload>,
}

/// The parsed-but-not-yet-applied view of one chunk header. Applying it to
/// the context is deferred until the whole chunk is buffered, so a short read
/// never leaves half-applied state behind.
#[derive(Debug)]
struct RawChunkHeader {
    basic_header: ChunkBasicHeader,
    time_field: u32,
    extended_time: Option<u32>,
    message_length: Option<u32>,
    message_type_id: Option<u8>,
    message_stream_id: Option<u32>,
}

#[derive(Debug)]
pub struct Reader {
    context: HashMap<Csid, ReadContext>,
    chunk_size: usize,
    bytes_received: u32,
}

impl Default for Reader {
    fn default() -> Self {
        Self::new()
    }
}

impl Reader {
    pub fn new() -> Self {
        Self {
            context: HashMap::new(),
            chunk_size: INIT_CHUNK_SIZE,
            bytes_received: 0,
        }
    }

    /// Running count of wire bytes consumed, for Acknowledgement bookkeeping.
    #[inline]
    pub fn get_bytes_received(&self) -> u32 {
        self.bytes_received
    }

    pub fn set_chunk_size(&mut self, size: usize) -> usize {
        let old_size = self.chunk_size;
        self.chunk_size = size;
        old_size
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Discards any partly reassembled message on the chunk stream.
    pub fn abort_chunk_message(&mut self, csid: Csid) {
        if let Some(ctx) = self.context.get_mut(&csid) {
            ctx.incomplete_chunk = None;
        }
    }

    /// Consumes exactly one chunk from `reader`.
    ///
    /// - `Ok(Some(message))` — the chunk completed a message; the cursor
    ///   position is the consumed byte count.
    /// - `Ok(None)` — not enough bytes buffered; nothing was consumed and no
    ///   state changed, the caller retries with more data.
    /// - `Err(IncompleteChunk)` — a whole chunk was consumed but its message
    ///   still needs more chunks; the caller advances and calls again.
    pub fn read(
        &mut self,
        reader: &mut Cursor<&[u8]>,
        c2s: bool,
    ) -> ChunkMessageResult<Option<ChunkMessage>> {
        let start = reader.position();

        let raw_header = match self.read_raw_header(reader)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let csid = raw_header.basic_header.chunk_stream_id;
        let fmt = raw_header.basic_header.fmt;

        // how much payload this chunk carries
        let message_length = match raw_header.message_length {
            Some(length) => length,
            None => match self.context.get(&csid) {
                Some(ctx) => ctx.message_length,
                None => return Err(ChunkMessageError::UnknownChunkStream { csid, fmt }),
            },
        };
        let remaining_length = match self.context.get(&csid).and_then(|ctx| {
            ctx.incomplete_chunk
                .as_ref()
                .map(|chunk| chunk.remaining_length)
        }) {
            Some(remaining) => remaining,
            None => message_length as usize,
        };
        let payload_size = min(self.chunk_size, remaining_length);
        if reader.remaining() < payload_size {
            return Ok(None);
        }

        // everything is buffered, commit the header to the context
        let header = self.apply_raw_header(&raw_header)?;

        let ctx = self
            .context
            .get_mut(&csid)
            .expect("the context was just created");
        let chunk = ctx.incomplete_chunk.get_or_insert_with(|| ChunkPayload {
            payload: BytesMut::with_capacity(message_length as usize),
            remaining_length: message_length as usize,
        });

        let mut bytes = vec![0; payload_size];
        reader.read_exact(&mut bytes)?;
        chunk.payload.extend_from_slice(&bytes);
        chunk.remaining_length -= payload_size;

        let consumed = (reader.position() - start) as u32;
        self.bytes_received = self.bytes_received.wrapping_add(consumed);

        let complete = ctx
            .incomplete_chunk
            .as_ref()
            .map(|chunk| chunk.remaining_length == 0)
            .expect("the chunk was just filled");
        if !complete {
            return Err(ChunkMessageError::IncompleteChunk);
        }

        let payload = ctx
            .incomplete_chunk
            .take()
            .expect("the chunk was just filled")
            .payload;

        let message_body = match header.message_type_id.try_into()? {
            ChunkMessageType::ProtocolControl(message_type) => {
                RtmpChunkMessageBody::ProtocolControl(
                    protocol_control::ProtocolControlMessage::read_from(
                        &payload[..],
                        message_type,
                    )?,
                )
            }
            ChunkMessageType::UserControl => RtmpChunkMessageBody::UserControl(
                user_control::UserControlEvent::read_from(&mut &payload[..])?,
            ),
            ChunkMessageType::RtmpUserMessage(_) => RtmpChunkMessageBody::RtmpUserMessage(
                Box::new(RtmpUserMessageBody::parse(&header, payload, c2s)?),
            ),
        };

        Ok(Some(ChunkMessage {
            header,
            chunk_message_body: message_body,
        }))
    }

    /// Parses one chunk header without touching any state. `Ok(None)` means
    /// the buffer ran out.
    fn read_raw_header(
        &self,
        reader: &mut Cursor<&[u8]>,
    ) -> ChunkMessageResult<Option<RawChunkHeader>> {
        let basic_header = match Self::read_basic_header(reader)? {
            Some(header) => header,
            None => return Ok(None),
        };

        let fmt = basic_header.fmt;
        let csid = basic_header.chunk_stream_id;

        let mut message_length = None;
        let mut message_type_id = None;
        let mut message_stream_id = None;
        let time_field;

        match fmt {
            0 => {
                if reader.remaining() < 11 {
                    return Ok(None);
                }
                time_field = reader.read_u24::<BigEndian>()?;
                message_length = Some(reader.read_u24::<BigEndian>()?);
                message_type_id = Some(reader.read_u8()?);
                message_stream_id = Some(reader.read_u32::<LittleEndian>()?);
            }
            1 => {
                if reader.remaining() < 7 {
                    return Ok(None);
                }
                time_field = reader.read_u24::<BigEndian>()?;
                message_length = Some(reader.read_u24::<BigEndian>()?);
                message_type_id = Some(reader.read_u8()?);
            }
            2 => {
                if reader.remaining() < 3 {
                    return Ok(None);
                }
                time_field = reader.read_u24::<BigEndian>()?;
            }
            3 => {
                time_field = 0;
            }
            fmt => return Err(ChunkMessageError::UnexpectedFmt(fmt)),
        }

        // a continuation inherits the first chunk's extended timestamp
        // decision, a new header escapes through 0xFFFFFF
        let extended_expected = if fmt == 3 {
            match self.context.get(&csid) {
                Some(ctx) => ctx.extended_timestamp_enabled,
                None => return Err(ChunkMessageError::UnknownChunkStream { csid, fmt }),
            }
        } else {
            time_field >= MAX_TIMESTAMP
        };

        let extended_time = if extended_expected {
            if reader.remaining() < 4 {
                return Ok(None);
            }
            Some(reader.read_u32::<BigEndian>()?)
        } else {
            None
        };

        Ok(Some(RawChunkHeader {
            basic_header,
            time_field,
            extended_time,
            message_length,
            message_type_id,
            message_stream_id,
        }))
    }

    fn read_basic_header(
        reader: &mut Cursor<&[u8]>,
    ) -> ChunkMessageResult<Option<ChunkBasicHeader>> {
        if !reader.has_remaining() {
            return Ok(None);
        }

        let first_byte = reader.read_u8()?;
        let fmt = (first_byte >> 6) & 0b11;
        match first_byte & 0b00111111 {
            0 => {
                if !reader.has_remaining() {
                    return Ok(None);
                }
                let csid = reader.read_u8()? as Csid + 64;
                Ok(Some(ChunkBasicHeader::new(fmt, csid)?))
            }
            1 => {
                if reader.remaining() < 2 {
                    return Ok(None);
                }
                let csid = 64 + reader.read_u8()? as Csid + reader.read_u8()? as Csid * 256;
                Ok(Some(ChunkBasicHeader::new(fmt, csid)?))
            }
            csid => Ok(Some(ChunkBasicHeader::new(fmt, csid as Csid)?)),
        }
    }

    /// Commits a parsed header to the chunk-stream context and returns the
    /// message view. The clock only moves when a chunk *starts* a message:
    /// fmt 0 replaces it, fmt 1/2 add their delta, fmt 3 re-applies the
    /// stored delta. Continuation chunks never advance it.
    fn apply_raw_header(
        &mut self,
        raw: &RawChunkHeader,
    ) -> ChunkMessageResult<ChunkMessageCommonHeader> {
        let csid = raw.basic_header.chunk_stream_id;
        let fmt = raw.basic_header.fmt;

        if !self.context.contains_key(&csid) {
            if fmt != 0 && fmt != 1 {
                return Err(ChunkMessageError::UnknownChunkStream { csid, fmt });
            }
            self.context.insert(csid, ReadContext::default());
        }

        let ctx = self
            .context
            .get_mut(&csid)
            .expect("the context was just created");
        let continuing = ctx.incomplete_chunk.is_some();
        if continuing && fmt != 3 {
            tracing::warn!(
                "chunk stream {} got a fmt {} header inside a message, the protocol wants fmt 3 continuations",
                csid,
                fmt
            );
        }

        let effective_time = raw.extended_time.unwrap_or(raw.time_field);
        match fmt {
            0 => {
                ctx.message_length = raw.message_length.expect("fmt 0 carries a length");
                ctx.message_type_id = raw.message_type_id.expect("fmt 0 carries a type");
                ctx.message_stream_id = raw.message_stream_id.expect("fmt 0 carries a stream id");
                ctx.extended_timestamp_enabled = raw.time_field >= MAX_TIMESTAMP;
                ctx.timestamp_delta = 0;
                if !continuing {
                    ctx.timestamp = effective_time as u64;
                }
            }
            1 => {
                ctx.message_length = raw.message_length.expect("fmt 1 carries a length");
                ctx.message_type_id = raw.message_type_id.expect("fmt 1 carries a type");
                ctx.extended_timestamp_enabled = raw.time_field >= MAX_TIMESTAMP;
                ctx.timestamp_delta = effective_time;
                if !continuing {
                    ctx.timestamp += effective_time as u64;
                }
            }
            2 => {
                ctx.extended_timestamp_enabled = raw.time_field >= MAX_TIMESTAMP;
                ctx.timestamp_delta = effective_time;
                if !continuing {
                    ctx.timestamp += effective_time as u64;
                }
            }
            _ => {
                if !continuing {
                    let delta = raw.extended_time.unwrap_or(ctx.timestamp_delta);
                    ctx.timestamp_delta = delta;
                    ctx.timestamp += delta as u64;
                }
            }
        }

        Ok(ChunkMessageCommonHeader {
            basic_header: raw.basic_header.clone(),
            timestamp: ctx.timestamp as u32,
            message_length: ctx.message_length,
            message_type_id: ctx.message_type_id,
            message_stream_id: ctx.message_stream_id,
            extended_timestamp_enabled: ctx.extended_timestamp_enabled,
        })
    }
}
