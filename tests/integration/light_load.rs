use codel_aqm::PacketQueue;
use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Link, PACKET_SIZE};

#[test_log::test]
fn test_idle_link_never_drops() {
    let mut link = Link::new(1000);
    for _ in 0..1000 {
        link.clock.advance(1);
        link.send(PACKET_SIZE);
        let (packet, dropped) = link.receive();
        assert!(packet.is_some());
        assert_eq!(dropped, 0);
    }
    let stats = link.codel.stats();
    assert_eq!(stats.xmit.packets, 1000);
    assert_eq!(stats.dropped.packets, 0);
    assert!(!link.codel.vars().dropping);
}

#[test_log::test]
fn test_delay_below_target_never_drops() {
    // Four packets in flight, one per tick: every packet waits 4ms.
    let mut link = Link::new(1000);
    for _ in 0..4 {
        link.send(PACKET_SIZE);
        link.clock.advance(1);
    }
    for _ in 0..2000 {
        link.send(PACKET_SIZE);
        let (packet, dropped) = link.receive();
        assert!(packet.is_some());
        assert_eq!(dropped, 0);
        assert_eq!(link.codel.vars().last_sojourn, 4);
        link.clock.advance(1);
    }
    assert_eq!(link.queue.length(), 4);
    assert_eq!(link.codel.stats().dropped.packets, 0);
    assert_eq!(link.codel.vars().first_above_time, None);
}

#[test_log::test]
fn test_bursty_arrivals_below_interval() {
    // Bursts of up to 8 packets per tick, drained at 8 per tick: queueing
    // delay never builds for a whole interval.
    let mut rng = StdRng::seed_from_u64(42);
    let mut link = Link::new(1000);
    for _ in 0..5000 {
        for _ in 0..rng.gen_range(0..=8) {
            link.send(rng.gen_range(64..=PACKET_SIZE));
        }
        for _ in 0..8 {
            let (_, dropped) = link.receive();
            assert_eq!(dropped, 0);
        }
        link.clock.advance(1);
    }
    assert_eq!(link.codel.stats().dropped.packets, 0);
    assert!(link.queue.is_empty());
}
