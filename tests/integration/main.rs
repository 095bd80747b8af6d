use std::time::Duration;

use codel_aqm::{
    Clock, CoDel, CoDelConfig, FifoQueue, FifoQueueConfig, ManualClock, PacketQueue, StdPacket,
    Timestamp,
};

mod light_load;
mod registry;
mod sojourn;

/// One tick per millisecond.
pub const FREQUENCY: u64 = 1000;
/// Far enough from zero that the first episode starts cold.
pub const T0: u64 = 10_000;
pub const PACKET_SIZE: usize = 1500;

pub struct Link {
    pub clock: ManualClock,
    pub codel: CoDel<ManualClock>,
    pub queue: FifoQueue<StdPacket>,
}

impl Link {
    /// 5ms target, 100ms interval.
    pub fn new(limit: usize) -> Self {
        let clock = ManualClock::starting_at(Timestamp::from_ticks(T0), FREQUENCY);
        let config = CoDelConfig::new(
            Duration::from_millis(5),
            Duration::from_millis(100),
            false,
            limit,
        );
        let codel = CoDel::new(&config, clock.clone()).unwrap();
        Self {
            clock,
            codel,
            queue: FifoQueue::new(FifoQueueConfig::new(limit)),
        }
    }

    pub fn now(&self) -> u64 {
        self.clock.now().as_ticks()
    }

    pub fn send(&mut self, length: usize) {
        self.codel
            .enqueue(&mut self.queue, StdPacket::with_length(length))
            .unwrap();
    }

    /// Dequeues once and reports how many packets were dropped on the way.
    pub fn receive(&mut self) -> (Option<StdPacket>, u64) {
        let before = self.codel.stats().dropped.packets;
        let packet = self.codel.dequeue(&mut self.queue);
        (packet, self.codel.stats().dropped.packets - before)
    }

    /// Moves to the next tick, sends two packets and receives one, so the
    /// standing queue and its delay keep growing.
    pub fn overloaded_tick(&mut self) -> u64 {
        self.clock.advance(1);
        self.send(PACKET_SIZE);
        self.send(PACKET_SIZE);
        let (packet, dropped) = self.receive();
        assert!(packet.is_some());
        dropped
    }

    /// Throws the backlog away behind the controller's back, then lets it see
    /// the empty queue.
    pub fn drain(&mut self) {
        while self.queue.pop().is_some() {}
        assert!(self.receive().0.is_none());
        assert!(!self.codel.vars().dropping);
        assert_eq!(self.codel.vars().first_above_time, None);
    }
}
