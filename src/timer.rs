// MazeTimer - Timeout
//
// One-shot millisecond timeout for loop cadences (level reports and the
// like).  An idle timeout counts as expired.

use crate::clock::{elapsed_ms, Clock};

pub struct Timeout<C> {
    clock: C,
    running: bool,
    start_ms: u32,
}

impl<C: Clock> Timeout<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            running: false,
            start_ms: 0,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
        self.start_ms = self.clock.now_ms();
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    #[inline]
    pub fn running(&self) -> bool {
        self.running
    }

    /// True once `timeout_ms` has passed since `start()`; stops the timeout
    /// when it fires.
    pub fn expired(&mut self, timeout_ms: u32) -> bool {
        if !self.running {
            return true;
        }
        let expired = elapsed_ms(self.clock.now_ms(), self.start_ms) >= timeout_ms;
        if expired {
            self.stop();
        }
        expired
    }
}
