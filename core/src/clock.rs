use web_time::Instant;

use crate::*;

/// Millisecond time source consulted for effect expiry.
pub trait Clock {
    fn now_ms(&self) -> Millis;
}

/// Monotonic wall clock, measured from when it was created.
#[derive(Copy, Clone, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        self.origin
            .elapsed()
            .as_millis()
            .try_into()
            .unwrap_or(Millis::MAX)
    }
}

/// Clock that only moves when told to.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ManualClock {
    now: Millis,
}

impl ManualClock {
    pub const fn at(now: Millis) -> Self {
        Self { now }
    }

    pub fn advance(&mut self, ms: Millis) {
        self.now = self.now.saturating_add(ms);
    }

    pub fn set(&mut self, now: Millis) {
        self.now = now;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        self.now
    }
}
