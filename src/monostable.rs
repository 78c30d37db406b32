// MazeTimer - Monostable
//
// Retriggerable one-shot counted in polling ticks.  After the output drops the
// counter keeps decaying for another `duration` ticks; only once it reaches
// that floor will `start()` re-arm.  Chatter on the trigger can therefore never
// stretch a pulse indefinitely.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonoStable {
    duration: i32,
    remaining: i32,
}

impl MonoStable {
    /// A monostable holding its output for `duration` ticks.  Starts fully
    /// decayed, so the first `start()` arms immediately.
    pub fn new(duration: u16) -> Self {
        let duration = i32::from(duration);
        Self {
            duration,
            remaining: -duration,
        }
    }

    /// Arm the pulse.  Ignored until the previous pulse has fully decayed.
    pub fn start(&mut self) {
        if self.remaining <= -self.duration {
            self.remaining = self.duration;
        }
    }

    /// Advance one tick.
    pub fn update(&mut self) {
        if self.remaining > -self.duration {
            self.remaining -= 1;
        }
    }

    #[inline]
    pub fn state(&self) -> bool {
        self.remaining > 0
    }

    /// True when the next `start()` will arm.
    #[inline]
    pub fn ready(&self) -> bool {
        self.remaining <= -self.duration
    }

    pub fn remaining(&self) -> i32 {
        self.remaining
    }

    pub fn duration(&self) -> u16 {
        self.duration as u16
    }

    /// Change the pulse length for subsequent arms.
    pub fn set_duration(&mut self, duration: u16) {
        self.duration = i32::from(duration);
    }
}
