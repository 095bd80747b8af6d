//! CoDel (Controlled Delay) active queue management.
//!
//! The controller sits on the dequeue side of a bounded FIFO. Every dequeue
//! measures how long the head packet waited (its sojourn time). Once sojourn
//! has stayed above `target` for a whole `interval`, the controller enters the
//! dropping state and discards packets on a schedule whose rate grows with
//! the square root of the number of drops, until sojourn falls back below
//! `target`.
//!
//! CoDel Implementation Reference:
//! https://github.com/torvalds/linux/blob/v6.6/include/net/codel.h
//! https://github.com/torvalds/linux/blob/v6.6/include/net/codel_impl.h

use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::{
    config::{CoDelConfig, CoDelDefaults},
    error::{Error, Result},
    packet::Packet,
    queue::PacketQueue,
    time::{Clock, Timestamp},
    utils::rate_limit::RateLimiter,
};

pub mod control;
pub mod stats;

pub use control::{control_law, newton_step, REC_INV_SQRT_MAX};
pub use stats::{CoDelStats, PacketCounter};

/// A dropping episode that starts within this many intervals of the previous
/// one resumes from the previous drop rate.
const RESUME_INTERVALS: u64 = 16;

/// Parameters of one controller, in clock ticks. Both are strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoDelParams {
    pub target: u64,
    pub interval: u64,
    pub ecn: bool,
}

impl CoDelParams {
    /// Zero `target` or `interval` are replaced by `defaults`.
    pub fn new<C: Clock>(
        target: u64,
        interval: u64,
        ecn: bool,
        defaults: &CoDelDefaults,
        clock: &C,
    ) -> Result<Self> {
        let target = match target {
            0 => clock.ticks_from_duration(defaults.target),
            ticks => ticks,
        };
        let interval = match interval {
            0 => clock.ticks_from_duration(defaults.interval),
            ticks => ticks,
        };
        if target == 0 || interval == 0 {
            return Err(Error::ConfigError(format!(
                "target ({target}) and interval ({interval}) must be at least one clock tick"
            )));
        }
        if target > i64::MAX as u64 || interval > i64::MAX as u64 / RESUME_INTERVALS {
            return Err(Error::ConfigError(format!(
                "target ({target}) or interval ({interval}) exceeds the clock range"
            )));
        }
        Ok(Self {
            target,
            interval,
            ecn,
        })
    }

    pub fn from_config<C: Clock>(
        config: &CoDelConfig,
        defaults: &CoDelDefaults,
        clock: &C,
    ) -> Result<Self> {
        let to_ticks = |name: &str, duration: Duration| -> Result<u64> {
            let ticks = clock.ticks_from_duration(duration);
            if ticks == 0 && !duration.is_zero() {
                return Err(Error::ConfigError(format!(
                    "{name} {duration:?} is shorter than one clock tick"
                )));
            }
            Ok(ticks)
        };
        Self::new(
            to_ticks("target", config.target)?,
            to_ticks("interval", config.interval)?,
            config.ecn.unwrap_or(defaults.ecn),
            defaults,
            clock,
        )
    }
}

/// Mutable control state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoDelVars {
    /// Drops since the dropping state was last entered. Allowed to wrap.
    pub count: u32,
    /// `count` when the dropping state was last entered.
    pub last_count: u32,
    pub dropping: bool,
    /// 1/sqrt(count) as a 16 bit mantissa of a Q0.32 number.
    pub rec_inv_sqrt: u16,
    /// When sojourn has been above target for a full interval, if armed.
    pub first_above_time: Option<Timestamp>,
    /// Time of the next drop, or of the last drop after leaving dropping.
    pub drop_next: Timestamp,
    /// Sojourn time of the last evaluated packet, in ticks.
    pub last_sojourn: u64,
}

impl Default for CoDelVars {
    fn default() -> Self {
        Self {
            count: 0,
            last_count: 0,
            dropping: false,
            rec_inv_sqrt: REC_INV_SQRT_MAX,
            first_above_time: None,
            drop_next: Timestamp::ZERO,
            last_sojourn: 0,
        }
    }
}

/// The CoDel controller of one queue.
///
/// It never owns the queue: callers pass it in on every call, and must
/// serialize calls for the same queue. Dropping the controller leaves any
/// queued packets with the queue's owner.
#[derive(Debug)]
pub struct CoDel<C> {
    params: CoDelParams,
    vars: CoDelVars,
    stats: CoDelStats,
    clock: C,
    untagged_log: RateLimiter,
}

impl<C> CoDel<C>
where
    C: Clock,
{
    /// Builds a controller with the built-in [`CoDelDefaults`].
    pub fn new(config: &CoDelConfig, clock: C) -> Result<Self> {
        Self::with_defaults(config, &CoDelDefaults::default(), clock)
    }

    pub fn with_defaults(config: &CoDelConfig, defaults: &CoDelDefaults, clock: C) -> Result<Self> {
        let params = CoDelParams::from_config(config, defaults, &clock)?;
        Ok(Self::from_params(params, clock))
    }

    /// `target` and `interval` are in clock ticks; zero selects the default.
    pub fn create(target: u64, interval: u64, ecn: bool, clock: C) -> Result<Self> {
        let params = CoDelParams::new(target, interval, ecn, &CoDelDefaults::default(), &clock)?;
        Ok(Self::from_params(params, clock))
    }

    pub fn from_params(params: CoDelParams, clock: C) -> Self {
        debug!(?params, "New CoDel");
        let untagged_log = RateLimiter::new(clock.frequency(), 1);
        Self {
            params,
            vars: CoDelVars::default(),
            stats: CoDelStats::default(),
            clock,
            untagged_log,
        }
    }

    pub fn params(&self) -> &CoDelParams {
        &self.params
    }

    pub fn vars(&self) -> &CoDelVars {
        &self.vars
    }

    /// A snapshot of the counters.
    pub fn stats(&self) -> CoDelStats {
        self.stats
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Stamps the packet with the current time and appends it to the queue.
    ///
    /// A full queue rejects the packet, which is counted as an overlimit drop
    /// and discarded. The control state is left untouched.
    pub fn enqueue<P, Q>(&mut self, queue: &mut Q, mut packet: P) -> Result<()>
    where
        P: Packet,
        Q: PacketQueue<P>,
    {
        if !queue.has_room() {
            return Err(self.reject(queue, packet));
        }
        packet.set_enqueue_time(self.clock.now());
        match queue.push(packet) {
            Ok(()) => Ok(()),
            Err(packet) => Err(self.reject(queue, packet)),
        }
    }

    fn reject<P, Q>(&mut self, queue: &Q, packet: P) -> Error
    where
        P: Packet,
        Q: PacketQueue<P>,
    {
        self.stats.overlimit.add(packet.length());
        trace!(
            queue_len = queue.length(),
            queue_bytes = queue.bytes(),
            "Drop packet(len: {}) when enqueue since queue is full",
            packet.length()
        );
        Error::Overlimit {
            length: queue.length(),
            limit: queue.limit(),
        }
    }

    /// The head of the queue, without running the drop logic.
    pub fn poll<'a, P, Q>(&self, queue: &'a Q) -> Option<&'a P>
    where
        P: Packet,
        Q: PacketQueue<P>,
    {
        queue.peek()
    }

    /// Decides whether `packet`, just popped from a queue now holding
    /// `queue_bytes` bytes, should be dropped. `None` means the queue ran dry.
    pub fn should_drop<P>(
        &mut self,
        packet: Option<&P>,
        queue_bytes: usize,
        now: Timestamp,
    ) -> bool
    where
        P: Packet,
    {
        let Some(packet) = packet else {
            self.vars.first_above_time = None;
            return false;
        };
        let Some(enqueue_time) = packet.enqueue_time() else {
            self.stats.untagged += 1;
            if self.untagged_log.check(now) {
                warn!(
                    packet = %packet.desc(),
                    untagged = self.stats.untagged,
                    "Dequeued packet carries no enqueue timestamp"
                );
            }
            self.vars.first_above_time = None;
            return false;
        };

        let sojourn = now.ticks_since(enqueue_time);
        self.vars.last_sojourn = sojourn.max(0) as u64;
        self.stats.observe_packet(packet.length());

        if sojourn < self.params.target as i64 || queue_bytes <= self.stats.max_packet as usize {
            // went below, stay below for at least interval
            self.vars.first_above_time = None;
            return false;
        }
        match self.vars.first_above_time {
            None => {
                // just went above, only drop if we stay above for interval
                self.vars.first_above_time = Some(now + self.params.interval);
                false
            }
            Some(first_above_time) => now >= first_above_time,
        }
    }

    /// Pops the next packet to transmit, discarding the packets the drop
    /// schedule asks for on the way. Several packets may be dropped in one
    /// call when a backlog has made more than one drop due.
    pub fn dequeue<P, Q>(&mut self, queue: &mut Q) -> Option<P>
    where
        P: Packet,
        Q: PacketQueue<P>,
    {
        let mut packet = queue.pop();
        if packet.is_none() {
            if self.vars.dropping {
                trace!("Exit dropping state since queue is empty");
            }
            self.vars.dropping = false;
            self.vars.first_above_time = None;
            return None;
        }

        let now = self.clock.now();
        let drop = self.should_drop(packet.as_ref(), queue.bytes(), now);
        trace!(
            drop,
            sojourn = self.vars.last_sojourn,
            count = self.vars.count,
            last_count = self.vars.last_count,
            dropping = self.vars.dropping,
            ?now,
            first_above_time = ?self.vars.first_above_time,
            drop_next = ?self.vars.drop_next,
            after_queue_len = queue.length(),
            after_queue_bytes = queue.bytes(),
            "dequeueing a new packet"
        );

        if self.vars.dropping {
            if !drop {
                self.vars.dropping = false;
                trace!("Exit dropping state since sojourn time is below target");
            } else if now >= self.vars.drop_next {
                while self.vars.dropping && now >= self.vars.drop_next {
                    // count may wrap, nothing divides by it
                    self.vars.count = self.vars.count.wrapping_add(1);
                    self.vars.rec_inv_sqrt = newton_step(self.vars.rec_inv_sqrt, self.vars.count);
                    if let Some(dropped) = packet.take() {
                        self.drop_packet(dropped, queue, "since now >= drop_next");
                    }
                    packet = queue.pop();
                    if self.should_drop(packet.as_ref(), queue.bytes(), now) {
                        self.vars.drop_next = control_law(
                            self.vars.drop_next,
                            self.params.interval,
                            self.vars.rec_inv_sqrt,
                        );
                        trace!(drop_next = ?self.vars.drop_next, count = self.vars.count);
                    } else {
                        self.vars.dropping = false;
                        trace!(count = self.vars.count, "Exit dropping state");
                    }
                }
            }
        } else if drop {
            if let Some(dropped) = packet.take() {
                self.drop_packet(dropped, queue, "as the first");
            }
            packet = queue.pop();
            self.should_drop(packet.as_ref(), queue.bytes(), now);

            self.vars.dropping = true;
            // If we went above target soon after leaving the last dropping
            // state, the drop rate that controlled the queue then is a good
            // starting point now.
            let resume_window = (RESUME_INTERVALS * self.params.interval) as i64;
            if now.ticks_since(self.vars.drop_next) < resume_window {
                self.vars.count = self.vars.count.wrapping_sub(self.vars.last_count) | 1;
                self.vars.rec_inv_sqrt = newton_step(self.vars.rec_inv_sqrt, self.vars.count);
            } else {
                self.vars.count = 1;
                self.vars.rec_inv_sqrt = REC_INV_SQRT_MAX;
            }
            self.vars.last_count = self.vars.count;
            self.vars.drop_next = control_law(now, self.params.interval, self.vars.rec_inv_sqrt);
            trace!(
                count = self.vars.count,
                drop_next = ?self.vars.drop_next,
                "Enter dropping state"
            );
        }

        if let Some(packet) = packet.as_ref() {
            self.stats.xmit.add(packet.length());
        }
        packet
    }

    fn drop_packet<P, Q>(&mut self, packet: P, queue: &Q, reason: &str)
    where
        P: Packet,
        Q: PacketQueue<P>,
    {
        self.stats.dropped.add(packet.length());
        trace!(
            sojourn = self.vars.last_sojourn,
            count = self.vars.count,
            after_queue_len = queue.length(),
            after_queue_bytes = queue.bytes(),
            "Drop packet(len: {}) {}",
            packet.length(),
            reason
        );
    }
}
