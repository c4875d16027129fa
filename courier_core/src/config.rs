/// Sizing knobs for the core components.
///
/// Construct with `Default` and adjust what the deployment needs; the
/// surrounding daemon maps its configuration file onto this struct.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    pool_capacity: usize,
    malformed_sample_len: usize,
    malformed_sample_keep: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            pool_capacity: Self::DEFAULT_POOL_CAPACITY,
            malformed_sample_len: Self::DEFAULT_MALFORMED_SAMPLE_LEN,
            malformed_sample_keep: Self::DEFAULT_MALFORMED_SAMPLE_KEEP,
        }
    }
}

impl CoreConfig {
    /// Default byte capacity of the message payload pool.
    ///
    /// The pool bounds the daemon's buffering memory; once it is exhausted,
    /// new messages are discarded and the discards are reported.
    pub const DEFAULT_POOL_CAPACITY: usize = 64 * 1024 * 1024;

    /// Default number of leading bytes kept from each malformed datagram.
    pub const DEFAULT_MALFORMED_SAMPLE_LEN: usize = 128;

    /// Default number of recent malformed datagrams kept for inspection.
    pub const DEFAULT_MALFORMED_SAMPLE_KEEP: usize = 16;

    /// Returns the pool's byte capacity.
    pub fn pool_capacity(&self) -> usize {
        self.pool_capacity
    }
    /// Sets the pool's byte capacity.
    pub fn set_pool_capacity(&mut self, pool_capacity: usize) {
        self.pool_capacity = pool_capacity;
    }
    /// Builder-method for setting the pool's byte capacity.
    #[must_use]
    pub fn with_pool_capacity(mut self, pool_capacity: usize) -> Self {
        self.pool_capacity = pool_capacity;
        self
    }

    /// Returns the number of leading bytes kept from each malformed datagram.
    pub fn malformed_sample_len(&self) -> usize {
        self.malformed_sample_len
    }
    /// Sets the number of leading bytes kept from each malformed datagram.
    pub fn set_malformed_sample_len(&mut self, malformed_sample_len: usize) {
        self.malformed_sample_len = malformed_sample_len;
    }
    /// Builder-method for setting the malformed-datagram sample length.
    #[must_use]
    pub fn with_malformed_sample_len(mut self, malformed_sample_len: usize) -> Self {
        self.malformed_sample_len = malformed_sample_len;
        self
    }

    /// Returns the number of recent malformed datagrams kept.
    pub fn malformed_sample_keep(&self) -> usize {
        self.malformed_sample_keep
    }
    /// Sets the number of recent malformed datagrams kept.
    pub fn set_malformed_sample_keep(&mut self, malformed_sample_keep: usize) {
        self.malformed_sample_keep = malformed_sample_keep;
    }
    /// Builder-method for setting the number of malformed datagrams kept.
    #[must_use]
    pub fn with_malformed_sample_keep(mut self, malformed_sample_keep: usize) -> Self {
        self.malformed_sample_keep = malformed_sample_keep;
        self
    }
}
