use crate::util::log_rate_limiter;
use crate::CourierResult;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

const DISCARD_LOG_INTERVAL: Duration = Duration::from_secs(30);

/// Collects operator-visible input anomalies.
///
/// Input threads record malformed datagrams and memory-pressure discards
/// here; the daemon's status surface reads them back as a snapshot. The
/// tracker is sink-only from the pipeline's perspective.
#[derive(Debug)]
pub struct AnomalyTracker {
    inner: Mutex<AnomalyCounts>,
    sample_len: usize,
    sample_keep: usize,
}

#[derive(Debug, Default)]
struct AnomalyCounts {
    malformed_count: u64,
    discard_no_mem_count: u64,
    discard_no_mem_by_topic: HashMap<Vec<u8>, u64>,
    recent_malformed: VecDeque<Vec<u8>>,
}

/// Consistent copy of all anomaly counters, taken under the tracker's lock.
#[derive(Debug, Clone, Serialize)]
pub struct AnomalySnapshot {
    /// Number of datagrams rejected by the decoder.
    pub malformed_count: u64,
    /// Number of messages discarded because the pool was exhausted.
    pub discard_no_mem_count: u64,
    /// Memory-pressure discards per topic (topics rendered lossily as UTF-8).
    pub discard_no_mem_by_topic: HashMap<String, u64>,
    /// Leading bytes of the most recently rejected datagrams, oldest first.
    pub recent_malformed: Vec<Vec<u8>>,
}

impl Default for AnomalyTracker {
    fn default() -> Self {
        Self::new(
            crate::CoreConfig::DEFAULT_MALFORMED_SAMPLE_LEN,
            crate::CoreConfig::DEFAULT_MALFORMED_SAMPLE_KEEP,
        )
    }
}

impl AnomalyTracker {
    /// Creates a tracker keeping up to `sample_keep` malformed-datagram
    /// samples of at most `sample_len` bytes each.
    pub fn new(sample_len: usize, sample_keep: usize) -> Self {
        Self {
            inner: Mutex::new(AnomalyCounts::default()),
            sample_len,
            sample_keep,
        }
    }

    /// Records a datagram the decoder rejected.
    ///
    /// A prefix of the offending bytes is kept for inspection.
    pub fn record_malformed(&self, bytes: &[u8]) -> CourierResult<()> {
        if log_rate_limiter::should_log("anomaly::malformed", DISCARD_LOG_INTERVAL) {
            warn!("Discarding malformed datagram of {} bytes", bytes.len());
        }
        let mut counts = self.inner.lock()?;
        counts.malformed_count += 1;
        let sample = bytes[..bytes.len().min(self.sample_len)].to_vec();
        counts.recent_malformed.push_back(sample);
        while counts.recent_malformed.len() > self.sample_keep {
            counts.recent_malformed.pop_front();
        }
        Ok(())
    }

    /// Records a message discarded because the pool denied its reservation.
    ///
    /// The original metadata is taken so operators can attribute the loss.
    pub fn record_discard_no_mem(
        &self,
        timestamp: i64,
        topic: &[u8],
        key: &[u8],
        value: &[u8],
    ) -> CourierResult<()> {
        if log_rate_limiter::should_log("anomaly::discard_no_mem", DISCARD_LOG_INTERVAL) {
            warn!(
                "Out of pool memory, discarding message for topic \"{}\" \
                 (timestamp {timestamp}, key {} bytes, value {} bytes)",
                String::from_utf8_lossy(topic),
                key.len(),
                value.len()
            );
        }
        let mut counts = self.inner.lock()?;
        counts.discard_no_mem_count += 1;
        match counts.discard_no_mem_by_topic.get_mut(topic) {
            Some(count) => *count += 1,
            None => {
                counts.discard_no_mem_by_topic.insert(topic.to_vec(), 1);
            }
        }
        Ok(())
    }

    /// Takes a consistent snapshot of all counters.
    pub fn snapshot(&self) -> CourierResult<AnomalySnapshot> {
        let counts = self.inner.lock()?;
        Ok(AnomalySnapshot {
            malformed_count: counts.malformed_count,
            discard_no_mem_count: counts.discard_no_mem_count,
            discard_no_mem_by_topic: counts
                .discard_no_mem_by_topic
                .iter()
                .map(|(topic, count)| (String::from_utf8_lossy(topic).into_owned(), *count))
                .collect(),
            recent_malformed: counts.recent_malformed.iter().cloned().collect(),
        })
    }
}
