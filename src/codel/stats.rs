use std::fmt;

use bytesize::ByteSize;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Initial value of the max-packet watermark, in bytes.
pub const MIN_MAX_PACKET: u32 = 256;

#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PacketCounter {
    pub packets: u64,
    pub bytes: u64,
}

impl PacketCounter {
    #[inline]
    pub fn add(&mut self, length: usize) {
        self.packets += 1;
        self.bytes += length as u64;
    }
}

impl fmt::Display for PacketCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pkts ({})", self.packets, ByteSize::b(self.bytes))
    }
}

#[cfg_attr(feature = "serde", derive(Deserialize, Serialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoDelStats {
    /// Packets handed to the transmit path.
    pub xmit: PacketCounter,
    /// Packets discarded by the drop schedule.
    pub dropped: PacketCounter,
    /// Packets rejected at enqueue because the queue was full.
    pub overlimit: PacketCounter,
    /// Largest packet seen at dequeue.
    pub largest_packet: u32,
    /// Watermark for the small-queue exception, never below [`MIN_MAX_PACKET`].
    pub max_packet: u32,
    /// ECN marks. Marking is not implemented, so this stays zero.
    pub marked_packets: u32,
    /// Dequeued packets that carried no enqueue-time tag.
    pub untagged: u64,
}

impl Default for CoDelStats {
    fn default() -> Self {
        Self {
            xmit: PacketCounter::default(),
            dropped: PacketCounter::default(),
            overlimit: PacketCounter::default(),
            largest_packet: 0,
            max_packet: MIN_MAX_PACKET,
            marked_packets: 0,
            untagged: 0,
        }
    }
}

impl CoDelStats {
    pub(crate) fn observe_packet(&mut self, length: usize) {
        let length = u32::try_from(length).unwrap_or(u32::MAX);
        self.largest_packet = self.largest_packet.max(length);
        self.max_packet = self.max_packet.max(length);
    }
}

impl fmt::Display for CoDelStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "     CoDel xmit:{} (maxpacket:{} marked:{})",
            self.xmit.packets, self.max_packet, self.marked_packets
        )?;
        write!(
            f,
            "     dropped:{} overlimit:{} untagged:{}",
            self.dropped, self.overlimit, self.untagged
        )
    }
}
