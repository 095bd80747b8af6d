//! Tick based time used by the controller.
//!
//! Every comparison between two [`Timestamp`]s is done on the signed
//! difference of the raw tick counters, so a counter that wraps around keeps
//! ordering correctly as long as the two readings are less than half the
//! counter range apart.
use std::{
    cmp::Ordering,
    fmt,
    ops::Add,
    sync::{
        atomic::{AtomicU64, Ordering as AtomicOrdering},
        Arc,
    },
    time::Duration,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

const NANOS_PER_SEC: u128 = 1_000_000_000;

#[cfg_attr(feature = "serde", derive(Deserialize, Serialize), serde(transparent))]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Timestamp = Timestamp(0);

    pub const fn from_ticks(ticks: u64) -> Self {
        Self(ticks)
    }

    pub const fn as_ticks(&self) -> u64 {
        self.0
    }

    /// Signed number of ticks from `earlier` to `self`.
    #[inline(always)]
    pub fn ticks_since(&self, earlier: Timestamp) -> i64 {
        self.0.wrapping_sub(earlier.0) as i64
    }

    #[inline(always)]
    pub fn is_before(&self, other: Timestamp) -> bool {
        self.ticks_since(other) < 0
    }
}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.ticks_since(*other).cmp(&0))
    }
}

impl Add<u64> for Timestamp {
    type Output = Timestamp;

    fn add(self, ticks: u64) -> Self::Output {
        Timestamp(self.0.wrapping_add(ticks))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}t", self.0)
    }
}

/// A monotonic source of [`Timestamp`]s.
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Timestamp;

    /// Ticks per second.
    fn frequency(&self) -> u64;

    /// Converts a duration into clock ticks, saturating at `u64::MAX`.
    fn ticks_from_duration(&self, duration: Duration) -> u64 {
        let ticks = duration.as_nanos() * self.frequency() as u128 / NANOS_PER_SEC;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }

    fn duration_from_ticks(&self, ticks: u64) -> Duration {
        let frequency = self.frequency().max(1) as u128;
        let nanos = ticks as u128 * NANOS_PER_SEC / frequency;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }
}

/// Nanosecond clock measured from the moment it was created.
///
/// It is driven by [`tokio::time::Instant`], so a paused tokio runtime also
/// pauses this clock.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    base: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let elapsed = self.base.elapsed().as_nanos();
        Timestamp(elapsed as u64)
    }

    fn frequency(&self) -> u64 {
        NANOS_PER_SEC as u64
    }
}

/// A clock that only moves when told to. Clones share the same counter.
#[derive(Debug, Clone)]
pub struct ManualClock {
    ticks: Arc<AtomicU64>,
    frequency: u64,
}

impl ManualClock {
    pub fn new(frequency: u64) -> Self {
        Self::starting_at(Timestamp::ZERO, frequency)
    }

    pub fn starting_at(start: Timestamp, frequency: u64) -> Self {
        Self {
            ticks: Arc::new(AtomicU64::new(start.as_ticks())),
            frequency,
        }
    }

    pub fn set(&self, timestamp: Timestamp) {
        self.ticks.store(timestamp.as_ticks(), AtomicOrdering::Release);
    }

    pub fn advance(&self, ticks: u64) -> Timestamp {
        let previous = self.ticks.fetch_add(ticks, AtomicOrdering::AcqRel);
        Timestamp(previous.wrapping_add(ticks))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.ticks.load(AtomicOrdering::Acquire))
    }

    fn frequency(&self) -> u64 {
        self.frequency
    }
}
