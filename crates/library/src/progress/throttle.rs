use std::time::Duration;
use tokio::time::Instant;

/// Rate limit for progress reporting: fires every `every` ticks, or once
/// `interval` has passed since it last fired, whichever comes first.
#[derive(Debug, Clone)]
pub struct Throttle {
    every: u64,
    interval: Duration,
    ticks: u64,
    last: Instant,
}

impl Throttle {
    pub fn new(every: u64, interval: Duration) -> Self {
        Self {
            every: every.max(1),
            interval,
            ticks: 0,
            last: Instant::now(),
        }
    }

    /// Count one unit of work. Returns `true` if it's time to report.
    pub fn tick(&mut self) -> bool {
        self.ticks += 1;
        if self.ticks >= self.every || self.last.elapsed() >= self.interval {
            self.reset();
            return true;
        }
        false
    }

    /// Start counting afresh, e.g. after reporting for another reason.
    pub fn reset(&mut self) {
        self.ticks = 0;
        self.last = Instant::now();
    }
}
