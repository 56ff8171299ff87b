#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RtmpSessionConfig {
    /// Outbound chunk size announced after a successful connect.
    pub chunk_size: u32,
    pub window_ack_size: u32,
    pub peer_bandwidth: u32,
    pub buffer_length_ms: u32,
}

impl Default for RtmpSessionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 4096,
            window_ack_size: 2_500_000,
            peer_bandwidth: 2_500_000,
            buffer_length_ms: 30_000,
        }
    }
}
