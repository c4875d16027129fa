use crate::pool::Lease;

/// Lifecycle state of a message between creation and destruction.
///
/// A message is created in `New`, moves through `SendWait` (handed to the
/// outbound sender) and `AckWait` (written, awaiting broker acknowledgement),
/// and is destroyed after reaching `Processed`. The legal transitions are
/// enforced by the state tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MsgState {
    /// Freshly created, not yet admitted to a topic-indexed bucket.
    New,
    /// Handed to the outbound sender but not yet written to the broker.
    SendWait,
    /// Written to the broker but not yet acknowledged.
    AckWait,
    /// Terminal; the message is about to be destroyed.
    Processed,
}

/// How the daemon chooses the partition for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routing {
    /// The daemon picks any partition of the topic.
    AnyPartition,
    /// The partition is derived from a client-chosen key.
    PartitionKey(i32),
}

/// One application message on its way to the broker.
///
/// The payload bytes are owned by the message and accounted against the
/// shared pool through the contained lease. A message handle has exactly one
/// owner at any instant; hand-off between pipeline stages is by move.
#[derive(Debug)]
pub struct Msg {
    state: MsgState,
    routing: Routing,
    timestamp: i64,
    topic: Box<[u8]>,
    key: Box<[u8]>,
    value: Box<[u8]>,
    _lease: Lease,
}

impl Msg {
    pub(crate) fn new(
        routing: Routing,
        timestamp: i64,
        topic: Box<[u8]>,
        key: Box<[u8]>,
        value: Box<[u8]>,
        lease: Lease,
    ) -> Self {
        Self {
            state: MsgState::New,
            routing,
            timestamp,
            topic,
            key,
            value,
            _lease: lease,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> MsgState {
        self.state
    }

    // Only the state tracker moves messages between states.
    pub(crate) fn set_state(&mut self, state: MsgState) {
        self.state = state;
    }

    /// Partition routing requested by the client.
    pub fn routing(&self) -> Routing {
        self.routing
    }

    /// Client-supplied creation timestamp.
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Topic the message is addressed to.
    pub fn topic(&self) -> &[u8] {
        &self.topic
    }

    /// Message key; may be empty.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// Message value; may be empty.
    pub fn value(&self) -> &[u8] {
        &self.value
    }
}
