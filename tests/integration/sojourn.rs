use codel_aqm::{
    CoDel, Error, FifoQueue, FifoQueueConfig, ManualClock, Packet, PacketQueue, StdPacket,
    Timestamp,
};

use crate::{Link, FREQUENCY, PACKET_SIZE};

#[test_log::test]
fn test_sojourn_is_dequeue_minus_enqueue() {
    let mut link = Link::new(100);
    let enqueued = link.now();
    link.send(PACKET_SIZE);
    link.clock.advance(37);
    let (packet, _) = link.receive();
    assert_eq!(
        packet.unwrap().enqueue_time(),
        Some(Timestamp::from_ticks(enqueued))
    );
    assert_eq!(link.codel.vars().last_sojourn, 37);
}

#[test_log::test]
fn test_sojourn_across_clock_wrap() {
    let clock = ManualClock::starting_at(Timestamp::from_ticks(u64::MAX - 10), FREQUENCY);
    let mut codel = CoDel::create(5, 100, false, clock.clone()).unwrap();
    let mut queue = FifoQueue::new(FifoQueueConfig::new(10));
    codel
        .enqueue(&mut queue, StdPacket::with_length(PACKET_SIZE))
        .unwrap();
    let now = clock.advance(30);
    assert_eq!(now.as_ticks(), 19);
    assert!(codel.dequeue(&mut queue).is_some());
    assert_eq!(codel.vars().last_sojourn, 30);
}

#[test_log::test]
fn test_overlimit_leaves_control_state_alone() {
    let mut link = Link::new(3);
    for _ in 0..3 {
        link.send(PACKET_SIZE);
    }
    link.clock.advance(50);
    let vars = link.codel.vars().clone();
    let result = link
        .codel
        .enqueue(&mut link.queue, StdPacket::with_length(PACKET_SIZE));
    assert!(matches!(result, Err(Error::Overlimit { length: 3, limit: 3 })));
    assert_eq!(link.codel.vars(), &vars);
    assert_eq!(link.queue.length(), 3);
    let stats = link.codel.stats();
    assert_eq!(stats.overlimit.packets, 1);
    assert_eq!(stats.overlimit.bytes, PACKET_SIZE as u64);
    assert_eq!(stats.dropped.packets, 0);
}
