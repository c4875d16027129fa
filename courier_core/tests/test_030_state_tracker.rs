mod test_utils;

use courier_core::{
    try_create_any_partition_msg, Core, CoreConfig, CourierResult, Msg, MsgState, TopicStatsItem,
};
use log::info;

// cargo test --test test_030_state_tracker -- --nocapture
#[test]
fn test_030_state_tracker() -> CourierResult<()> {
    let _log_handle = test_utils::init_logger();

    full_lifecycle()?;
    illegal_transition_leaves_counters_alone()?;
    prune_with_outstanding_counts()?;
    live_message_invariant()?;
    Ok(())
}

fn create(core: &Core, topic: &[u8]) -> CourierResult<Msg> {
    Ok(try_create_any_partition_msg(
        0,
        topic,
        b"",
        b"payload",
        core.pool(),
        core.anomaly_tracker(),
        core.state_tracker(),
    )?
    .expect("pool has room"))
}

fn stats(core: &Core) -> CourierResult<(Vec<TopicStatsItem>, i64)> {
    let mut items = Vec::new();
    let new_count = core.state_tracker().get_stats(&mut items)?;
    items.sort_by(|x, y| x.topic.cmp(&y.topic));
    Ok((items, new_count))
}

fn full_lifecycle() -> CourierResult<()> {
    info!("one message through New, SendWait, AckWait, Processed");
    let core = Core::default();
    let tracker = core.state_tracker();
    let mut msg = create(&core, b"x")?;

    let (items, new_count) = stats(&core)?;
    assert!(items.is_empty());
    assert_eq!(new_count, 1);

    tracker.enter_send_wait(&mut msg)?;
    let (items, new_count) = stats(&core)?;
    assert_eq!(new_count, 0);
    assert_eq!(items[0].stats.send_wait_count, 1);

    tracker.enter_ack_wait(&mut msg)?;
    let (items, _) = stats(&core)?;
    assert_eq!(items[0].stats.send_wait_count, 0);
    assert_eq!(items[0].stats.ack_wait_count, 1);

    tracker.enter_processed(&mut msg)?;
    assert_eq!(msg.state(), MsgState::Processed);
    let (items, new_count) = stats(&core)?;
    assert!(items.is_empty());
    assert_eq!(new_count, 0);
    Ok(())
}

fn illegal_transition_leaves_counters_alone() -> CourierResult<()> {
    info!("New -> AckWait is a bug and must not move any counter");
    let core = Core::default();
    let tracker = core.state_tracker();
    let mut msg = create(&core, b"x")?;

    tracker.enter_ack_wait(&mut msg)?;
    assert_eq!(msg.state(), MsgState::New);
    let (items, new_count) = stats(&core)?;
    assert!(items.is_empty());
    assert_eq!(new_count, 1);

    // the legal path still works afterwards
    tracker.enter_send_wait(&mut msg)?;
    let (items, new_count) = stats(&core)?;
    assert_eq!(new_count, 0);
    assert_eq!(items[0].stats.send_wait_count, 1);
    Ok(())
}

fn prune_with_outstanding_counts() -> CourierResult<()> {
    info!("prune removes drained topics at once, busy topics on drain");
    let core = Core::default();
    let tracker = core.state_tracker();

    let mut a1 = create(&core, b"a")?;
    let mut a2 = create(&core, b"a")?;
    tracker.enter_send_wait(&mut a1)?;
    tracker.enter_send_wait(&mut a2)?;

    // force topic "b" into the map, then drain it
    let mut b1 = create(&core, b"b")?;
    tracker.enter_send_wait(&mut b1)?;
    tracker.enter_processed(&mut b1)?;

    tracker.prune(|_| false)?;

    let (items, _) = stats(&core)?;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].topic, b"a".to_vec());
    assert_eq!(items[0].stats.send_wait_count, 2);

    // pruning again with the same predicate changes nothing
    tracker.prune(|_| false)?;
    let (items, _) = stats(&core)?;
    assert_eq!(items.len(), 1);

    // processing the outstanding messages erases "a" without another prune
    tracker.enter_processed(&mut a1)?;
    tracker.enter_processed(&mut a2)?;
    let (items, new_count) = stats(&core)?;
    assert!(items.is_empty());
    assert_eq!(new_count, 0);
    Ok(())
}

fn live_message_invariant() -> CourierResult<()> {
    info!("new_count plus all bucket counters equals the live messages");
    let core = Core::default();
    let tracker = core.state_tracker();

    let mut msgs: Vec<Msg> = Vec::new();
    for topic in [b"alpha".as_slice(), b"beta", b"gamma"] {
        for _ in 0..4 {
            msgs.push(create(&core, topic)?);
        }
    }
    let mut live = msgs.len() as i64;

    let counted = |core: &Core| -> CourierResult<i64> {
        let (items, new_count) = stats(core)?;
        Ok(new_count
            + items
                .iter()
                .map(|item| item.stats.send_wait_count + item.stats.ack_wait_count)
                .sum::<i64>())
    };
    assert_eq!(counted(&core)?, live);

    // walk the messages through different depths of the pipeline
    for (n, msg) in msgs.iter_mut().enumerate() {
        tracker.enter_send_wait(msg)?;
        if n % 2 == 0 {
            tracker.enter_ack_wait(msg)?;
        }
        if n % 3 == 0 {
            tracker.enter_processed(msg)?;
            live -= 1;
        }
        assert_eq!(counted(&core)?, live);
    }

    for msg in &mut msgs {
        if msg.state() != MsgState::Processed {
            tracker.enter_processed(msg)?;
            live -= 1;
        }
    }
    assert_eq!(live, 0);
    assert_eq!(counted(&core)?, 0);
    Ok(())
}
