use std::collections::VecDeque;
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::packet::Packet;

/// Maximum number of packets a queue holds unless configured otherwise.
pub const DEFAULT_QUEUE_LIMIT: usize = 1000;

/// The bounded FIFO a [`CoDel`](crate::codel::CoDel) controller manages.
///
/// The queue owns the packets; the controller only decides which of the
/// popped packets are discarded.
pub trait PacketQueue<P>: Send
where
    P: Packet,
{
    /// Appends the packet if there is room, otherwise hands it back.
    fn push(&mut self, packet: P) -> Result<(), P>;

    // If the queue is empty, return `None`
    fn pop(&mut self) -> Option<P>;

    fn peek(&self) -> Option<&P>;

    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    fn length(&self) -> usize;

    /// Total bytes currently queued.
    fn bytes(&self) -> usize;

    /// Capacity in packets.
    fn limit(&self) -> usize;

    fn set_limit(&mut self, limit: usize);

    fn has_room(&self) -> bool {
        self.length() < self.limit()
    }
}

#[cfg_attr(feature = "serde", derive(Deserialize, Serialize), serde(default))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoQueueConfig {
    pub packet_limit: usize,
}

impl Default for FifoQueueConfig {
    fn default() -> Self {
        Self {
            packet_limit: DEFAULT_QUEUE_LIMIT,
        }
    }
}

impl FifoQueueConfig {
    pub fn new(packet_limit: usize) -> Self {
        Self { packet_limit }
    }
}

impl<P> From<FifoQueueConfig> for FifoQueue<P> {
    fn from(config: FifoQueueConfig) -> Self {
        FifoQueue::new(config)
    }
}

#[derive(Debug)]
pub struct FifoQueue<P> {
    queue: VecDeque<P>,
    packet_limit: usize,
    now_bytes: usize,
}

impl<P> FifoQueue<P> {
    pub fn new(config: FifoQueueConfig) -> Self {
        debug!(?config, "New FifoQueue");
        Self {
            queue: VecDeque::with_capacity(config.packet_limit.min(DEFAULT_QUEUE_LIMIT)),
            packet_limit: config.packet_limit,
            now_bytes: 0,
        }
    }
}

impl<P> Default for FifoQueue<P> {
    fn default() -> Self {
        Self::new(FifoQueueConfig::default())
    }
}

impl<P> PacketQueue<P> for FifoQueue<P>
where
    P: Packet,
{
    fn push(&mut self, packet: P) -> Result<(), P> {
        if self.queue.len() < self.packet_limit {
            self.now_bytes += packet.length();
            self.queue.push_back(packet);
            Ok(())
        } else {
            trace!(
                queue_len = self.queue.len(),
                now_bytes = self.now_bytes,
                "Reject packet(len: {}) since queue is full",
                packet.length()
            );
            Err(packet)
        }
    }

    fn pop(&mut self) -> Option<P> {
        let packet = self.queue.pop_front()?;
        self.now_bytes -= packet.length();
        Some(packet)
    }

    fn peek(&self) -> Option<&P> {
        self.queue.front()
    }

    fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn length(&self) -> usize {
        self.queue.len()
    }

    fn bytes(&self) -> usize {
        self.now_bytes
    }

    fn limit(&self) -> usize {
        self.packet_limit
    }

    fn set_limit(&mut self, limit: usize) {
        self.packet_limit = limit;
    }
}
