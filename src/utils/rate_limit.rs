use crate::time::Timestamp;

/// Lets at most `max_events` through per `period` ticks.
///
/// Used to keep per-packet diagnostics from flooding the log.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    period: u64,
    max_events: u32,
    window_start: Option<Timestamp>,
    events: u32,
}

impl RateLimiter {
    pub fn new(period: u64, max_events: u32) -> Self {
        Self {
            period,
            max_events,
            window_start: None,
            events: 0,
        }
    }

    /// Records an event at `now`, returning whether it may be reported.
    pub fn check(&mut self, now: Timestamp) -> bool {
        let expired = match self.window_start {
            Some(start) => now.ticks_since(start) >= self.period as i64 || now.is_before(start),
            None => true,
        };
        if expired {
            self.window_start = Some(now);
            self.events = 0;
        }
        if self.events < self.max_events {
            self.events += 1;
            true
        } else {
            false
        }
    }
}
