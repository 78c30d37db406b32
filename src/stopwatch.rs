// MazeTimer - Stopwatch
//
// Run timing with lap and split support.  Marks are raw clock readings;
// every duration is `elapsed_ms(later, earlier)` so a run that straddles the
// 32-bit millisecond wrap still measures correctly.

use crate::clock::{elapsed_ms, Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Reset,
    Running,
    Stopped,
}

pub struct Stopwatch<C> {
    clock: C,
    state: State,
    /// Start of the current run.  Only `start`, `restart` and `reset` move it.
    start_ms: u32,
    /// Reference point for the next lap.
    lap_mark_ms: u32,
    /// Last observed time while running; frozen once stopped.
    stop_ms: u32,
    time: u32,
    lap_time: u32,
    split_time: u32,
}

impl<C: Clock> Stopwatch<C> {
    pub fn new(clock: C) -> Self {
        let now = clock.now_ms();
        Self {
            clock,
            state: State::Reset,
            start_ms: now,
            lap_mark_ms: now,
            stop_ms: now,
            time: 0,
            lap_time: 0,
            split_time: 0,
        }
    }

    /// Begin timing.  Does nothing if already running.
    pub fn start(&mut self) {
        if self.state != State::Running {
            self.rezero();
            self.state = State::Running;
        }
    }

    /// Freeze the elapsed time.  Does nothing unless running.
    pub fn stop(&mut self) {
        if self.state == State::Running {
            self.stop_ms = self.clock.now_ms();
            self.time = elapsed_ms(self.stop_ms, self.start_ms);
            self.state = State::Stopped;
        }
    }

    /// Start a fresh run from zero, whatever the current state.
    pub fn restart(&mut self) {
        self.rezero();
        self.state = State::Running;
    }

    pub fn reset(&mut self) {
        self.rezero();
        self.state = State::Reset;
    }

    /// Elapsed run time in milliseconds.
    pub fn time(&mut self) -> u32 {
        if self.state == State::Running {
            self.stop_ms = self.clock.now_ms();
        }
        self.time = elapsed_ms(self.stop_ms, self.start_ms);
        self.time
    }

    /// Time since the previous lap (or the run start), then begin a new lap.
    /// Returns the last lap when not running.
    pub fn lap(&mut self) -> u32 {
        if self.state == State::Running {
            self.stop_ms = self.clock.now_ms();
            self.lap_time = elapsed_ms(self.stop_ms, self.lap_mark_ms);
            self.lap_mark_ms = self.stop_ms;
        }
        self.lap_time
    }

    /// Cumulative time since the run start.  Returns the last split when not
    /// running.
    pub fn split(&mut self) -> u32 {
        if self.state == State::Running {
            self.stop_ms = self.clock.now_ms();
            self.split_time = elapsed_ms(self.stop_ms, self.start_ms);
        }
        self.split_time
    }

    #[inline]
    pub fn running(&self) -> bool {
        self.state == State::Running
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    fn rezero(&mut self) {
        let now = self.clock.now_ms();
        self.start_ms = now;
        self.lap_mark_ms = now;
        self.stop_ms = now;
        self.time = 0;
        self.lap_time = 0;
        self.split_time = 0;
    }
}
