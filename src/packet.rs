use std::fmt::Debug;

use crate::time::Timestamp;

pub trait Packet: Debug + 'static + Send {
    /// Length of the packet in bytes, as accounted by the queue.
    fn length(&self) -> usize;

    fn as_slice(&self) -> &[u8];

    /// The enqueue-time tag, or `None` if the packet was never stamped.
    fn enqueue_time(&self) -> Option<Timestamp>;
    fn set_enqueue_time(&mut self, timestamp: Timestamp);

    // Packet description
    fn desc(&self) -> String {
        format!("[{} bytes]", self.length())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StdPacket {
    buf: Vec<u8>,
    enqueue_time: Option<Timestamp>,
}

impl StdPacket {
    pub fn from_raw_buffer(buf: &[u8]) -> Self {
        Self {
            buf: buf.to_vec(),
            enqueue_time: None,
        }
    }

    /// A zero-filled packet of `length` bytes.
    pub fn with_length(length: usize) -> Self {
        Self {
            buf: vec![0; length],
            enqueue_time: None,
        }
    }

    /// Builds a packet that looks as if it had been enqueued at `timestamp`.
    pub fn with_timestamp(buf: &[u8], timestamp: Timestamp) -> Self {
        Self {
            buf: buf.to_vec(),
            enqueue_time: Some(timestamp),
        }
    }
}

impl Packet for StdPacket {
    fn length(&self) -> usize {
        self.buf.len()
    }

    fn as_slice(&self) -> &[u8] {
        self.buf.as_slice()
    }

    fn enqueue_time(&self) -> Option<Timestamp> {
        self.enqueue_time
    }

    fn set_enqueue_time(&mut self, timestamp: Timestamp) {
        self.enqueue_time = Some(timestamp);
    }
}
