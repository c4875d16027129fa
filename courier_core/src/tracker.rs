use crate::msg::{Msg, MsgState};
use crate::util::log_rate_limiter;
use crate::CourierResult;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

const BUG_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Counters of outstanding messages for one topic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TopicStats {
    /// Messages handed to the sender but not yet written to the broker.
    pub send_wait_count: i64,
    /// Messages written but not yet acknowledged.
    pub ack_wait_count: i64,
}

/// One row of a stats snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct TopicStatsItem {
    /// Topic name (rendered lossily as UTF-8 when serialized).
    #[serde(serialize_with = "serialize_topic_lossy")]
    pub topic: Vec<u8>,
    /// Counters for this topic.
    pub stats: TopicStats,
}

fn serialize_topic_lossy<S: serde::Serializer>(
    topic: &[u8],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&String::from_utf8_lossy(topic))
}

#[derive(Debug, Default)]
struct TopicBucket {
    stats: TopicStats,
    // Set by prune() when the topic is no longer known; consulted after
    // every decrement so the bucket disappears once it drains.
    ok_to_delete: bool,
}

#[derive(Debug, Default)]
struct TrackerCore {
    topic_stats: HashMap<Vec<u8>, TopicBucket>,
    new_count: i64,
}

/// Net counter effect of a state entry, accumulated per homogeneous batch
/// before the tracker's lock is taken.
#[derive(Debug, Default, Clone, Copy)]
struct DeltaComputer {
    new_delta: i64,
    send_wait_delta: i64,
    ack_wait_delta: i64,
}

impl DeltaComputer {
    // Returns whether the transition is legal; illegal transitions
    // contribute no deltas and must not change the message state.
    fn count_entered(&mut self, prev_state: MsgState, target: MsgState) -> bool {
        match target {
            MsgState::SendWait => self.count_send_wait_entered(prev_state),
            MsgState::AckWait => self.count_ack_wait_entered(prev_state),
            MsgState::Processed => self.count_processed_entered(prev_state),
            MsgState::New => unreachable!("messages are created in 'New', never moved back"),
        }
    }

    fn count_send_wait_entered(&mut self, prev_state: MsgState) -> bool {
        match prev_state {
            MsgState::New => {
                self.new_delta -= 1;
                self.send_wait_delta += 1;
                true
            }
            MsgState::SendWait => true, // re-queueing is a no-op
            MsgState::AckWait => {
                // retry path: the dispatch layer resends unacknowledged messages
                self.ack_wait_delta -= 1;
                self.send_wait_delta += 1;
                true
            }
            MsgState::Processed => {
                log_bug(
                    "tracker::processed_to_send_wait",
                    "Bug: cannot leave terminal state 'Processed'",
                );
                false
            }
        }
    }

    fn count_ack_wait_entered(&mut self, prev_state: MsgState) -> bool {
        match prev_state {
            MsgState::New => {
                log_bug(
                    "tracker::new_to_ack_wait",
                    "Bug: cannot enter state 'AckWait' directly from state 'New'",
                );
                false
            }
            MsgState::SendWait => {
                self.send_wait_delta -= 1;
                self.ack_wait_delta += 1;
                true
            }
            MsgState::AckWait => {
                log_bug(
                    "tracker::ack_wait_reentry",
                    "Bug: cannot directly reenter state 'AckWait'",
                );
                false
            }
            MsgState::Processed => {
                log_bug(
                    "tracker::processed_to_ack_wait",
                    "Bug: cannot leave terminal state 'Processed'",
                );
                false
            }
        }
    }

    fn count_processed_entered(&mut self, prev_state: MsgState) -> bool {
        match prev_state {
            MsgState::New => {
                self.new_delta -= 1;
                true
            }
            MsgState::SendWait => {
                self.send_wait_delta -= 1;
                true
            }
            MsgState::AckWait => {
                self.ack_wait_delta -= 1;
                true
            }
            MsgState::Processed => {
                log_bug(
                    "tracker::processed_reentry",
                    "Bug: cannot reenter terminal state 'Processed'",
                );
                false
            }
        }
    }
}

fn log_bug(site: &'static str, message: &str) {
    if log_rate_limiter::should_log(site, BUG_LOG_INTERVAL) {
        error!("{message}");
    }
}

/// Accounting of message lifecycle states, keyed by topic.
///
/// One tracker serves the whole daemon: producer threads report message
/// creation, the dispatch threads report every later transition, and the
/// status surface reads consistent snapshots. Construct it once and share it
/// by reference; there is deliberately no process-wide instance.
///
/// A single mutex guards the topic map and the count of `New` messages.
/// Batch operations compute their net counter deltas before taking the lock,
/// so the critical section is proportional to the number of distinct topics
/// in the batch structure, not to the message count.
#[derive(Debug, Default)]
pub struct MsgStateTracker {
    inner: Mutex<TrackerCore>,
}

impl MsgStateTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a freshly created message entered `New`.
    ///
    /// No topic is involved: a message has no topic-indexed bucket until it
    /// leaves `New`.
    pub fn enter_new(&self) -> CourierResult<()> {
        let mut core = self.inner.lock()?;
        core.new_count += 1;
        Ok(())
    }

    /// Moves one message into `SendWait`.
    pub fn enter_send_wait(&self, msg: &mut Msg) -> CourierResult<()> {
        self.enter_single(msg, MsgState::SendWait)
    }

    /// Moves a batch of messages sharing one topic into `SendWait`.
    ///
    /// The first message's topic is authoritative; all others must match.
    pub fn enter_send_wait_batch(&self, batch: &mut [Msg]) -> CourierResult<()> {
        self.enter_batch(batch, MsgState::SendWait)
    }

    /// Moves a list of single-topic batches into `SendWait`.
    pub fn enter_send_wait_batches(&self, batches: &mut [Vec<Msg>]) -> CourierResult<()> {
        for batch in batches {
            self.enter_batch(batch, MsgState::SendWait)?;
        }
        Ok(())
    }

    /// Moves one message into `AckWait`.
    pub fn enter_ack_wait(&self, msg: &mut Msg) -> CourierResult<()> {
        self.enter_single(msg, MsgState::AckWait)
    }

    /// Moves a batch of messages sharing one topic into `AckWait`.
    ///
    /// The first message's topic is authoritative; all others must match.
    pub fn enter_ack_wait_batch(&self, batch: &mut [Msg]) -> CourierResult<()> {
        self.enter_batch(batch, MsgState::AckWait)
    }

    /// Moves a list of single-topic batches into `AckWait`.
    pub fn enter_ack_wait_batches(&self, batches: &mut [Vec<Msg>]) -> CourierResult<()> {
        for batch in batches {
            self.enter_batch(batch, MsgState::AckWait)?;
        }
        Ok(())
    }

    /// Moves one message into the terminal `Processed` state.
    pub fn enter_processed(&self, msg: &mut Msg) -> CourierResult<()> {
        self.enter_single(msg, MsgState::Processed)
    }

    /// Moves a batch of messages sharing one topic into `Processed`.
    ///
    /// The first message's topic is authoritative; all others must match.
    pub fn enter_processed_batch(&self, batch: &mut [Msg]) -> CourierResult<()> {
        self.enter_batch(batch, MsgState::Processed)
    }

    /// Moves a list of single-topic batches into `Processed`.
    pub fn enter_processed_batches(&self, batches: &mut [Vec<Msg>]) -> CourierResult<()> {
        for batch in batches {
            self.enter_batch(batch, MsgState::Processed)?;
        }
        Ok(())
    }

    /// Clears `result` and fills it with one entry per topic that has at
    /// least one non-zero counter; returns the number of messages still in
    /// `New`.
    ///
    /// The snapshot is taken under the lock and therefore consistent with
    /// some serial ordering of all transitions. Ordering across topics is
    /// unspecified.
    pub fn get_stats(&self, result: &mut Vec<TopicStatsItem>) -> CourierResult<i64> {
        result.clear();
        let core = self.inner.lock()?;
        for (topic, bucket) in &core.topic_stats {
            if bucket.stats.send_wait_count != 0 || bucket.stats.ack_wait_count != 0 {
                result.push(TopicStatsItem {
                    topic: topic.clone(),
                    stats: bucket.stats,
                });
            }
        }
        Ok(core.new_count)
    }

    /// Drops accounting for topics that no longer exist.
    ///
    /// Every bucket whose topic the predicate disowns is marked deletable;
    /// marked buckets with both counters at zero are erased immediately,
    /// the rest are erased by the next decrement that drains them. Buckets
    /// with outstanding counts are always retained so the counters stay
    /// consistent.
    pub fn prune<F>(&self, topic_exists_fn: F) -> CourierResult<()>
    where
        F: Fn(&[u8]) -> bool,
    {
        let mut core = self.inner.lock()?;
        core.topic_stats.retain(|topic, bucket| {
            bucket.ok_to_delete = !topic_exists_fn(topic);
            !(bucket.ok_to_delete
                && bucket.stats.send_wait_count == 0
                && bucket.stats.ack_wait_count == 0)
        });
        Ok(())
    }

    fn enter_single(&self, msg: &mut Msg, target: MsgState) -> CourierResult<()> {
        let mut comp = DeltaComputer::default();
        if comp.count_entered(msg.state(), target) {
            msg.set_state(target);
        }
        self.update_stats(msg.topic(), comp)
    }

    fn enter_batch(&self, batch: &mut [Msg], target: MsgState) -> CourierResult<()> {
        let Some((first, rest)) = batch.split_first_mut() else {
            return Ok(());
        };
        let mut comp = DeltaComputer::default();
        if comp.count_entered(first.state(), target) {
            first.set_state(target);
        }
        for msg in rest {
            debug_assert!(
                msg.topic() == first.topic(),
                "all messages of a batch must share one topic"
            );
            if comp.count_entered(msg.state(), target) {
                msg.set_state(target);
            }
        }
        self.update_stats(first.topic(), comp)
    }

    fn update_stats(&self, topic: &[u8], comp: DeltaComputer) -> CourierResult<()> {
        let DeltaComputer {
            new_delta,
            send_wait_delta,
            ack_wait_delta,
        } = comp;

        let mut core = self.inner.lock()?;
        if send_wait_delta != 0 || ack_wait_delta != 0 {
            // Look up first so the common case of an existing bucket does
            // not allocate an owned copy of the topic.
            if !core.topic_stats.contains_key(topic) {
                core.topic_stats
                    .insert(topic.to_vec(), TopicBucket::default());
            }
            let mut drained = false;
            if let Some(bucket) = core.topic_stats.get_mut(topic) {
                bucket.stats.send_wait_count += send_wait_delta;
                debug_assert!(bucket.stats.send_wait_count >= 0);
                bucket.stats.ack_wait_count += ack_wait_delta;
                debug_assert!(bucket.stats.ack_wait_count >= 0);
                drained = bucket.ok_to_delete
                    && bucket.stats.send_wait_count == 0
                    && bucket.stats.ack_wait_count == 0;
            }
            if drained {
                core.topic_stats.remove(topic);
            }
        }
        core.new_count += new_delta;
        debug_assert!(core.new_count >= 0);
        Ok(())
    }
}
