use core::time;
use std::io::Cursor;

use tokio_util::bytes::{Buf, BytesMut};

use super::{
    C0S0Packet, C1S1Packet, C2S2Packet, HandshakeServerState, RTMP_VERSION,
    consts::{RTMP_HANDSHAKE_SIZE, RTMP_SERVER_KEY, RTMP_SERVER_VERSION, SHA256_DIGEST_SIZE},
    digest::{make_digest, make_message, validate_c1_digest},
    errors::HandshakeResult,
    reader::Reader,
};
use utils::traits::writer::WriteTo;

/// Buffer-driven server side of the C0/C1/C2 exchange. Feed it whatever bytes
/// have arrived; it consumes what it can and appends S0+S1+S2 to `output`
/// once C1 is in. A digest-carrying C1 gets the digested S1/S2; anything else
/// falls back to the plain echo handshake.
#[derive(Debug)]
pub struct HandshakeServer {
    state: HandshakeServerState,
    c1_bytes: Vec<u8>,
    c1_timestamp: u32,
}

impl Default for HandshakeServer {
    fn default() -> Self {
        Self::new()
    }
}

impl HandshakeServer {
    pub fn new() -> Self {
        Self {
            state: HandshakeServerState::Uninitialized,
            c1_bytes: Vec::with_capacity(RTMP_HANDSHAKE_SIZE),
            c1_timestamp: 0,
        }
    }

    pub fn state(&self) -> HandshakeServerState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == HandshakeServerState::Done
    }

    /// Drives the state machine as far as the buffered input allows. The
    /// cursor position tells the caller how much was consumed; bytes are
    /// never consumed partially out of a handshake packet.
    pub fn process(
        &mut self,
        reader: &mut Cursor<&[u8]>,
        output: &mut BytesMut,
    ) -> HandshakeResult<()> {
        loop {
            match self.state {
                HandshakeServerState::Uninitialized => {
                    if !reader.has_remaining() {
                        return Ok(());
                    }
                    let c0 = Reader::new(&mut *reader).read_c0s0()?;
                    tracing::debug!("read c0, version {:?}", c0.version);
                    self.state = HandshakeServerState::VersionReceived;
                }
                HandshakeServerState::VersionReceived => {
                    if reader.remaining() < RTMP_HANDSHAKE_SIZE {
                        return Ok(());
                    }
                    self.c1_bytes.resize(RTMP_HANDSHAKE_SIZE, 0);
                    let position = reader.position() as usize;
                    self.c1_bytes
                        .copy_from_slice(&reader.get_ref()[position..position + RTMP_HANDSHAKE_SIZE]);
                    reader.advance(RTMP_HANDSHAKE_SIZE);
                    self.c1_timestamp = u32::from_be_bytes(
                        self.c1_bytes[..4].try_into().expect("c1 has 4 time bytes"),
                    );
                    tracing::debug!("read c1, timestamp {}", self.c1_timestamp);

                    self.write_s0(output)?;
                    let mut c1_array = [0u8; RTMP_HANDSHAKE_SIZE];
                    c1_array.copy_from_slice(&self.c1_bytes);
                    match validate_c1_digest(&c1_array) {
                        Ok(c1_digest) => {
                            tracing::debug!("c1 digest validates, doing complex handshake");
                            self.write_complex_s1(output)?;
                            self.write_complex_s2(output, &c1_digest)?;
                        }
                        Err(err) => {
                            tracing::debug!(
                                "no usable c1 digest ({}), doing simple handshake",
                                err
                            );
                            self.write_simple_s1(output)?;
                            self.write_simple_s2(output)?;
                        }
                    }
                    self.state = HandshakeServerState::AckSent;
                }
                HandshakeServerState::AckSent => {
                    if reader.remaining() < RTMP_HANDSHAKE_SIZE {
                        return Ok(());
                    }
                    Reader::new(&mut *reader).read_c2s2()?;
                    tracing::debug!("read c2, handshake done");
                    self.state = HandshakeServerState::Done;
                }
                HandshakeServerState::Done => return Ok(()),
            }
        }
    }

    fn write_s0(&mut self, output: &mut BytesMut) -> HandshakeResult<()> {
        let mut bytes = Vec::with_capacity(1);
        C0S0Packet {
            version: RTMP_VERSION,
        }
        .write_to(&mut bytes)?;
        output.extend_from_slice(&bytes);
        Ok(())
    }

    fn make_s1_packet(&self, zeros: u32) -> HandshakeResult<Vec<u8>> {
        let mut random_bytes = [0u8; 1528];
        utils::random::random_fill(&mut random_bytes);
        let mut bytes = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
        C1S1Packet {
            timestamp: time::Duration::from_millis(
                utils::system::time::get_timestamp_ms().unwrap_or(0),
            ),
            zeros,
            random_bytes,
        }
        .write_to(&mut bytes)?;
        Ok(bytes)
    }

    fn write_simple_s1(&mut self, output: &mut BytesMut) -> HandshakeResult<()> {
        let bytes = self.make_s1_packet(0)?;
        output.extend_from_slice(&bytes);
        Ok(())
    }

    /// s2 echoes c1, the peer matches it against what it sent.
    fn write_simple_s2(&mut self, output: &mut BytesMut) -> HandshakeResult<()> {
        output.extend_from_slice(&self.c1_bytes);
        Ok(())
    }

    fn write_complex_s1(&mut self, output: &mut BytesMut) -> HandshakeResult<()> {
        // the version field tells digest-aware peers to expect one back
        let bytes = self.make_s1_packet(u32::from_be_bytes(RTMP_SERVER_VERSION))?;
        let mut s1_array = [0u8; RTMP_HANDSHAKE_SIZE];
        s1_array.copy_from_slice(&bytes);
        let message = make_message(&RTMP_SERVER_KEY[..36], &s1_array)?;
        output.extend_from_slice(&message);
        Ok(())
    }

    fn write_complex_s2(&mut self, output: &mut BytesMut, c1_digest: &[u8]) -> HandshakeResult<()> {
        let mut random_bytes = [0u8; RTMP_HANDSHAKE_SIZE];
        utils::random::random_fill(&mut random_bytes);
        let mut bytes = Vec::with_capacity(RTMP_HANDSHAKE_SIZE);
        C2S2Packet {
            timestamp: time::Duration::from_millis(
                utils::system::time::get_timestamp_ms().unwrap_or(0),
            ),
            timestamp2: time::Duration::from_millis(self.c1_timestamp as u64),
            random_echo: random_bytes[8..]
                .try_into()
                .expect("the random block is 1528 bytes"),
        }
        .write_to(&mut bytes)?;

        let key = make_digest(&RTMP_SERVER_KEY, c1_digest)?;
        let digest = make_digest(&key, &bytes[..RTMP_HANDSHAKE_SIZE - SHA256_DIGEST_SIZE])?;
        output.extend_from_slice(&bytes[..RTMP_HANDSHAKE_SIZE - SHA256_DIGEST_SIZE]);
        output.extend_from_slice(&digest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use tokio_util::bytes::BytesMut;

    use crate::handshake::{HandshakeServerState, consts::RTMP_HANDSHAKE_SIZE};

    use super::HandshakeServer;

    #[test]
    fn simple_handshake_with_zeroed_c1() {
        let mut input = vec![3u8];
        input.extend(vec![0u8; RTMP_HANDSHAKE_SIZE]); // C1
        input.extend(vec![0u8; RTMP_HANDSHAKE_SIZE]); // C2

        let mut server = HandshakeServer::new();
        let mut output = BytesMut::new();
        let mut cursor = Cursor::new(&input[..]);
        server.process(&mut cursor, &mut output).unwrap();

        assert!(server.is_done());
        assert_eq!(cursor.position() as usize, input.len());
        assert_eq!(output.len(), 1 + 2 * RTMP_HANDSHAKE_SIZE);
        assert_eq!(output[0], 3); // S0
        // S2 echoes C1 verbatim
        assert_eq!(
            &output[1 + RTMP_HANDSHAKE_SIZE..],
            &vec![0u8; RTMP_HANDSHAKE_SIZE][..]
        );
    }

    #[test]
    fn handshake_resumes_across_partial_input() {
        let mut input = vec![3u8];
        input.extend(vec![1u8; RTMP_HANDSHAKE_SIZE]);
        input.extend(vec![2u8; RTMP_HANDSHAKE_SIZE]);

        let mut server = HandshakeServer::new();
        let mut output = BytesMut::new();
        let mut pending = Vec::new();

        // dribble the input seven bytes at a time
        for piece in input.chunks(7) {
            pending.extend_from_slice(piece);
            let mut cursor = Cursor::new(&pending[..]);
            server.process(&mut cursor, &mut output).unwrap();
            let consumed = cursor.position() as usize;
            pending.drain(..consumed);
        }

        assert!(server.is_done());
        assert!(pending.is_empty());
        assert_eq!(output.len(), 1 + 2 * RTMP_HANDSHAKE_SIZE);
        assert_eq!(
            &output[1 + RTMP_HANDSHAKE_SIZE..],
            &vec![1u8; RTMP_HANDSHAKE_SIZE][..]
        );
    }

    #[test]
    fn bad_version_is_rejected() {
        let input = [9u8];
        let mut server = HandshakeServer::new();
        let mut output = BytesMut::new();
        let mut cursor = Cursor::new(&input[..]);
        assert!(server.process(&mut cursor, &mut output).is_err());
    }

    #[test]
    fn c0_alone_only_advances_one_state() {
        let input = [3u8];
        let mut server = HandshakeServer::new();
        let mut output = BytesMut::new();
        let mut cursor = Cursor::new(&input[..]);
        server.process(&mut cursor, &mut output).unwrap();
        assert_eq!(server.state(), HandshakeServerState::VersionReceived);
        assert!(output.is_empty());
    }
}
