use crate::anomaly::AnomalyTracker;
use crate::config::CoreConfig;
use crate::input;
use crate::msg::Msg;
use crate::pool::Pool;
use crate::tracker::MsgStateTracker;
use crate::CourierResult;

/// The shared components of one daemon instance.
///
/// Built once at startup from a [`CoreConfig`] and handed by reference to
/// the input threads, the dispatch threads, and the status surface. Tests
/// instantiate as many independent cores as they like.
#[derive(Debug)]
pub struct Core {
    pool: Pool,
    anomaly_tracker: AnomalyTracker,
    state_tracker: MsgStateTracker,
}

impl Default for Core {
    fn default() -> Self {
        Self::new(&CoreConfig::default())
    }
}

impl Core {
    /// Builds the pool and both trackers from the given configuration.
    pub fn new(config: &CoreConfig) -> Self {
        Self {
            pool: Pool::new(config.pool_capacity()),
            anomaly_tracker: AnomalyTracker::new(
                config.malformed_sample_len(),
                config.malformed_sample_keep(),
            ),
            state_tracker: MsgStateTracker::new(),
        }
    }

    /// The message payload pool.
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// The anomaly tracker.
    pub fn anomaly_tracker(&self) -> &AnomalyTracker {
        &self.anomaly_tracker
    }

    /// The message state tracker.
    pub fn state_tracker(&self) -> &MsgStateTracker {
        &self.state_tracker
    }

    /// Decodes one received datagram against this core's components; see
    /// [`build_msg_from_datagram`](crate::build_msg_from_datagram).
    pub fn build_msg_from_datagram(&self, buf: &[u8]) -> CourierResult<Option<Msg>> {
        input::build_msg_from_datagram(buf, &self.pool, &self.anomaly_tracker, &self.state_tracker)
    }
}
