//! CoDel active queue management for packet queues.
//!
//! [`codel::CoDel`] is the per-queue controller: stamp packets on enqueue,
//! decide on dequeue which of them to discard so that standing queue delay
//! stays near a target. [`registry::CoDelRegistry`] attaches one controller
//! and its bounded queue to each named interface.

pub mod codel;
pub mod config;
pub mod error;
pub mod packet;
pub mod queue;
pub mod registry;
pub mod time;
pub mod utils;

pub use codel::{CoDel, CoDelParams, CoDelStats, CoDelVars};
pub use config::{CoDelConfig, CoDelDefaults, RegistryConfig};
pub use error::{Error, Result};
pub use packet::{Packet, StdPacket};
pub use queue::{FifoQueue, FifoQueueConfig, PacketQueue};
pub use registry::{CoDelRegistry, InterfaceStats};
pub use time::{Clock, ManualClock, MonotonicClock, Timestamp};
