mod test_utils;

use courier_core::protocol::Submission;
use courier_core::{
    try_create_any_partition_msg, try_create_partition_key_msg, Core, CoreConfig, CourierResult,
    MsgState, Routing,
};
use log::info;

// cargo test --test test_020_msg_factory -- --nocapture
#[test]
fn test_020_msg_factory() -> CourierResult<()> {
    let _log_handle = test_utils::init_logger();

    successful_creation()?;
    pool_exhaustion_is_reported()?;
    datagram_intake()?;
    malformed_datagram_is_reported()?;
    Ok(())
}

fn successful_creation() -> CourierResult<()> {
    info!("creating a message reserves pool memory and enters 'New'");
    let core = Core::new(&CoreConfig::default().with_pool_capacity(1024));

    let msg = try_create_any_partition_msg(
        17,
        b"metrics.cpu",
        b"host-17",
        b"73.5",
        core.pool(),
        core.anomaly_tracker(),
        core.state_tracker(),
    )?
    .expect("pool has room");

    assert_eq!(msg.state(), MsgState::New);
    assert_eq!(msg.routing(), Routing::AnyPartition);
    assert_eq!(msg.timestamp(), 17);
    assert_eq!(msg.topic(), b"metrics.cpu");
    assert_eq!(msg.key(), b"host-17");
    assert_eq!(msg.value(), b"73.5");
    assert_eq!(core.pool().in_use(), 11 + 7 + 4);

    let mut items = Vec::new();
    let new_count = core.state_tracker().get_stats(&mut items)?;
    assert_eq!(new_count, 1);
    assert!(items.is_empty());

    // destroying the message returns its pool bytes
    drop(msg);
    assert_eq!(core.pool().in_use(), 0);
    Ok(())
}

fn pool_exhaustion_is_reported() -> CourierResult<()> {
    info!("a denied reservation becomes a discard event, not a message");
    let core = Core::new(&CoreConfig::default().with_pool_capacity(8));

    let msg = try_create_any_partition_msg(
        5,
        b"big",
        b"",
        b"value larger than the pool",
        core.pool(),
        core.anomaly_tracker(),
        core.state_tracker(),
    )?;
    assert!(msg.is_none());

    let snapshot = core.anomaly_tracker().snapshot()?;
    assert_eq!(snapshot.discard_no_mem_count, 1);
    assert_eq!(snapshot.discard_no_mem_by_topic["big"], 1);

    // nothing was created, so nothing was counted
    let mut items = Vec::new();
    assert_eq!(core.state_tracker().get_stats(&mut items)?, 0);
    assert_eq!(core.pool().in_use(), 0);
    Ok(())
}

fn datagram_intake() -> CourierResult<()> {
    info!("a decodable datagram turns into a message with matching fields");
    let core = Core::default();

    let submission = Submission {
        routing: Routing::PartitionKey(3),
        timestamp: 99,
        topic: b"events",
        key: b"k1",
        value: b"v1",
    };
    let mut buf = Vec::new();
    submission.emit(&mut buf)?;

    let msg = core.build_msg_from_datagram(&buf)?.expect("valid datagram");
    assert_eq!(msg.routing(), Routing::PartitionKey(3));
    assert_eq!(msg.timestamp(), 99);
    assert_eq!(msg.topic(), b"events");
    assert_eq!(msg.key(), b"k1");
    assert_eq!(msg.value(), b"v1");

    let mut items = Vec::new();
    assert_eq!(core.state_tracker().get_stats(&mut items)?, 1);
    Ok(())
}

fn malformed_datagram_is_reported() -> CourierResult<()> {
    info!("an undecodable datagram is dropped and recorded");
    let core = Core::default();

    let msg = core.build_msg_from_datagram(&[0xba, 0xad])?;
    assert!(msg.is_none());

    let snapshot = core.anomaly_tracker().snapshot()?;
    assert_eq!(snapshot.malformed_count, 1);
    assert_eq!(snapshot.recent_malformed, vec![vec![0xba, 0xad]]);

    // the partition-key factory shares the discard contract
    let small = Core::new(&CoreConfig::default().with_pool_capacity(1));
    let msg = try_create_partition_key_msg(
        7,
        1,
        b"t",
        b"",
        b"xx",
        small.pool(),
        small.anomaly_tracker(),
        small.state_tracker(),
    )?;
    assert!(msg.is_none());
    assert_eq!(small.anomaly_tracker().snapshot()?.discard_no_mem_count, 1);
    Ok(())
}
