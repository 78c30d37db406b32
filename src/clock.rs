// MazeTimer - Millisecond Clock
//
// Every timestamp in the timing core is a `u32` millisecond count that wraps
// after ~49.7 days, exactly like the Arduino `millis()` counter the rig was
// first built on.  Durations must always be computed with `elapsed_ms`
// (wrapping subtraction); comparing two absolute marks is wrong across the
// wrap boundary.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// Source of a free-running, wrapping millisecond timestamp.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_ms(&self) -> u32 {
        (**self).now_ms()
    }
}

/// Milliseconds elapsed from `since` to `now`, correct across the u32 wrap.
#[inline]
pub fn elapsed_ms(now: u32, since: u32) -> u32 {
    now.wrapping_sub(since)
}

// ---------------------------------------------------------------------------
// System clock (monotonic, truncated to u32)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    epoch: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u32 {
        // Truncation is the wrap.
        self.epoch.elapsed().as_millis() as u32
    }
}

// ---------------------------------------------------------------------------
// Manual clock (tests and trace replay)
// ---------------------------------------------------------------------------

/// Settable clock.  Clones share the same time, so one handle can drive every
/// component built from the others.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<u32>>,
}

impl ManualClock {
    pub fn new(start_ms: u32) -> Self {
        Self {
            now: Rc::new(Cell::new(start_ms)),
        }
    }

    pub fn set(&self, ms: u32) {
        self.now.set(ms);
    }

    /// Move the clock forward, wrapping at `u32::MAX`.
    pub fn advance(&self, ms: u32) {
        self.now.set(self.now.get().wrapping_add(ms));
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
