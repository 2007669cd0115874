/// Capabilities / limits of a messenger implementation.
#[derive(Clone, Copy, Debug)]
pub struct MessagingCapabilities {
    /// Hard per-message limit of the platform, in characters.
    pub max_message_len: usize,
}

impl MessagingCapabilities {
    /// Chunk limit to use for this messenger given the configured limit.
    pub fn chunk_limit(&self, configured: usize) -> usize {
        configured.min(self.max_message_len).max(1)
    }
}
