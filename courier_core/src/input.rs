//! Entry points of the input path: turning received datagrams and decoded
//! payloads into pool-backed messages.

use crate::anomaly::AnomalyTracker;
use crate::msg::{Msg, Routing};
use crate::pool::Pool;
use crate::protocol::Submission;
use crate::tracker::MsgStateTracker;
use crate::{CourierError, CourierResult};

/// Tries to create a message the daemon may route to any partition.
///
/// Reserves pool memory for all three payloads at once. When the pool denies
/// the reservation, the discard is reported to the anomaly tracker with the
/// original metadata and `None` is returned; otherwise the message starts its
/// life in the `New` state, already counted by the state tracker.
pub fn try_create_any_partition_msg(
    timestamp: i64,
    topic: &[u8],
    key: &[u8],
    value: &[u8],
    pool: &Pool,
    anomaly_tracker: &AnomalyTracker,
    state_tracker: &MsgStateTracker,
) -> CourierResult<Option<Msg>> {
    try_create_msg(
        Routing::AnyPartition,
        timestamp,
        topic,
        key,
        value,
        pool,
        anomaly_tracker,
        state_tracker,
    )
}

/// Tries to create a message pinned to a partition derived from
/// `partition_key`; otherwise identical to
/// [`try_create_any_partition_msg`].
#[allow(clippy::too_many_arguments)]
pub fn try_create_partition_key_msg(
    partition_key: i32,
    timestamp: i64,
    topic: &[u8],
    key: &[u8],
    value: &[u8],
    pool: &Pool,
    anomaly_tracker: &AnomalyTracker,
    state_tracker: &MsgStateTracker,
) -> CourierResult<Option<Msg>> {
    try_create_msg(
        Routing::PartitionKey(partition_key),
        timestamp,
        topic,
        key,
        value,
        pool,
        anomaly_tracker,
        state_tracker,
    )
}

/// Decodes one received datagram and builds the message it carries.
///
/// Malformed datagrams are recorded on the anomaly tracker and dropped;
/// decodable ones continue into the factory matching their routing. `None`
/// means the datagram was consumed without producing a message.
pub fn build_msg_from_datagram(
    buf: &[u8],
    pool: &Pool,
    anomaly_tracker: &AnomalyTracker,
    state_tracker: &MsgStateTracker,
) -> CourierResult<Option<Msg>> {
    match Submission::parse(buf) {
        Ok(submission) => match submission.routing {
            Routing::AnyPartition => try_create_any_partition_msg(
                submission.timestamp,
                submission.topic,
                submission.key,
                submission.value,
                pool,
                anomaly_tracker,
                state_tracker,
            ),
            Routing::PartitionKey(partition_key) => try_create_partition_key_msg(
                partition_key,
                submission.timestamp,
                submission.topic,
                submission.key,
                submission.value,
                pool,
                anomaly_tracker,
                state_tracker,
            ),
        },
        Err(decode_error) => {
            debug!("Rejecting datagram: {decode_error}");
            anomaly_tracker.record_malformed(buf)?;
            Ok(None)
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn try_create_msg(
    routing: Routing,
    timestamp: i64,
    topic: &[u8],
    key: &[u8],
    value: &[u8],
    pool: &Pool,
    anomaly_tracker: &AnomalyTracker,
    state_tracker: &MsgStateTracker,
) -> CourierResult<Option<Msg>> {
    let payload_bytes = topic.len() + key.len() + value.len();
    let lease = match pool.reserve(payload_bytes) {
        Ok(lease) => lease,
        Err(CourierError::PoolExhausted { .. }) => {
            anomaly_tracker.record_discard_no_mem(timestamp, topic, key, value)?;
            return Ok(None);
        }
        Err(other) => return Err(other),
    };
    let msg = Msg::new(
        routing,
        timestamp,
        Box::from(topic),
        Box::from(key),
        Box::from(value),
        lease,
    );
    state_tracker.enter_new()?;
    Ok(Some(msg))
}
