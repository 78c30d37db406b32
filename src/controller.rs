// MazeTimer - Run Controller
//
// Owns every sensor, button and stopwatch of the rig and is ticked once per
// polling interval by the timing task.  Each tick samples the three gates and
// four buttons, walks the run state machine, and queues the resulting host
// messages for the serial task.  Nothing here blocks.
//
// Gate triggers are pulses (see `GateChannel`): a rising edge means "a mouse
// just entered the beam", the falling edge comes one hold window later.

use std::sync::mpsc::Sender;

use crate::clock::Clock;
use crate::config::Calibration;
use crate::events::{ButtonEvent, ButtonId, Gate, RunState};
use crate::gate::GateChannel;
use crate::hal::AnalogRead;
use crate::input::{Button, LevelSource, Polarity};
use crate::protocol::{HostCommand, Message};
use crate::stopwatch::Stopwatch;
use crate::timer::Timeout;

/// One analog input per gate.
pub struct GateInputs<A> {
    pub start: A,
    pub finish: A,
    pub cell: A,
}

/// The four operator buttons, all wired with the same polarity.
pub struct ButtonInputs<S> {
    pub arm: S,
    pub start: S,
    pub goal: S,
    pub reset: S,
    pub polarity: Polarity,
}

pub struct Controller<A, S, C> {
    gates: [(Gate, GateChannel<A>); 3],
    /// Threshold potentiometers, reported alongside the gate levels.
    pots: Option<GateInputs<A>>,
    buttons: [(ButtonId, Button<S, C>); 4],
    run: Stopwatch<C>,
    course: Stopwatch<C>,
    report: Timeout<C>,
    report_interval_ms: u32,
    state: RunState,
    tx: Sender<Message>,
}

impl<A, S, C> Controller<A, S, C>
where
    A: AnalogRead,
    S: LevelSource,
    C: Clock + Clone,
{
    pub fn new(
        gates: GateInputs<A>,
        pots: Option<GateInputs<A>>,
        buttons: ButtonInputs<S>,
        clock: C,
        cal: &Calibration,
        tx: Sender<Message>,
    ) -> Self {
        let gate = |input| GateChannel::new(input, &cal.gate);
        let polarity = buttons.polarity;
        let button =
            |source| Button::with_calibration(source, polarity, clock.clone(), &cal.button);

        Self {
            gates: [
                (Gate::Start, gate(gates.start)),
                (Gate::Finish, gate(gates.finish)),
                (Gate::Cell, gate(gates.cell)),
            ],
            pots,
            buttons: [
                (ButtonId::Arm, button(buttons.arm)),
                (ButtonId::Start, button(buttons.start)),
                (ButtonId::Goal, button(buttons.goal)),
                (ButtonId::Reset, button(buttons.reset)),
            ],
            run: Stopwatch::new(clock.clone()),
            course: Stopwatch::new(clock.clone()),
            report: Timeout::new(clock),
            report_interval_ms: cal.timing.level_report_interval_ms,
            state: RunState::default(),
            tx,
        }
    }

    /// Send the current state so a freshly connected host is in sync.
    pub fn announce(&mut self) {
        self.emit(Message::state(self.state));
    }

    /// One polling tick.
    pub fn tick(&mut self) {
        let mut edges = [None; 3];
        for (slot, (gate, channel)) in edges.iter_mut().zip(self.gates.iter_mut()) {
            *slot = channel.update().map(|active| (*gate, active));
        }
        let mut gestures = [None; 4];
        for (slot, (id, button)) in gestures.iter_mut().zip(self.buttons.iter_mut()) {
            *slot = button.update().map(|event| (*id, event));
        }

        if self.state == RunState::NewMouse {
            self.enter(RunState::Searching);
        }

        for (gate, active) in edges.into_iter().flatten() {
            log::debug!("{} gate trigger {}", gate.display_name(), u8::from(active));
            self.emit(Message::trigger(gate, active));
            self.on_gate(gate, active);
        }
        for (id, event) in gestures.into_iter().flatten() {
            log::debug!("button {:?}: {:?}", id, event);
            self.on_button(id, event);
        }

        if self.state == RunState::Calibrate && self.report.expired(self.report_interval_ms) {
            self.report_levels();
            self.report.start();
        }
    }

    pub fn handle_command(&mut self, cmd: HostCommand) {
        match cmd {
            HostCommand::NewMouse => self.new_mouse(),
        }
    }

    #[inline]
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Current (or last completed) run time.
    pub fn run_time(&mut self) -> u32 {
        self.run.time()
    }

    /// Time the current mouse has been active in the maze.
    pub fn course_time(&mut self) -> u32 {
        self.course.time()
    }

    pub fn gate(&self, gate: Gate) -> &GateChannel<A> {
        &self.gates[gate_index(gate)].1
    }

    pub fn gate_mut(&mut self, gate: Gate) -> &mut GateChannel<A> {
        &mut self.gates[gate_index(gate)].1
    }

    pub fn button_mut(&mut self, id: ButtonId) -> &mut Button<S, C> {
        &mut self.buttons[button_index(id)].1
    }

    // -----------------------------------------------------------------------
    // State machine
    // -----------------------------------------------------------------------

    fn on_gate(&mut self, gate: Gate, active: bool) {
        use RunState::*;
        match (self.state, gate, active) {
            (Searching | RunComplete, Gate::Cell, true) => self.enter(MouseInStartCell),
            (MouseInStartCell | RunComplete, Gate::Start, true) => self.begin_run(),
            (RunStarted, Gate::Start, false) => self.enter(RunInProgress),
            (RunStarted | RunInProgress, Gate::Finish, true) => self.finish_run(),
            _ => {}
        }
    }

    fn on_button(&mut self, id: ButtonId, event: ButtonEvent) {
        use RunState::*;
        match (id, event, self.state) {
            (ButtonId::Arm, ButtonEvent::LongPress, Calibrate) => self.enter(Searching),
            (ButtonId::Arm, ButtonEvent::LongPress, _) => {
                self.abort_run();
                self.enter(Calibrate);
            }
            (ButtonId::Arm, ButtonEvent::Click, Searching) => self.enter(MouseInStartCell),
            (ButtonId::Start, ButtonEvent::Click, MouseInStartCell | RunComplete) => {
                self.begin_run()
            }
            (ButtonId::Goal, ButtonEvent::Click, RunStarted | RunInProgress) => {
                self.finish_run()
            }
            (
                ButtonId::Reset,
                ButtonEvent::Click,
                MouseInStartCell | RunStarted | RunInProgress | RunComplete,
            ) => {
                self.abort_run();
                self.enter(Searching);
            }
            (ButtonId::Reset, ButtonEvent::LongPress, _) => self.new_mouse(),
            _ => {}
        }
    }

    fn begin_run(&mut self) {
        if !self.course.running() {
            self.course.restart();
            self.emit(Message::course_time(0));
        }
        self.run.restart();
        self.emit(Message::split_time(0));
        self.enter(RunState::RunStarted);
    }

    fn finish_run(&mut self) {
        self.run.stop();
        let time = self.run.time();
        log::info!("run complete: {} ms", time);
        self.emit(Message::run_time(time));
        self.enter(RunState::RunComplete);
    }

    /// Drop the current run and zero the host's split counter.
    fn abort_run(&mut self) {
        if self.run.running() {
            log::info!("run aborted at {} ms", self.run.time());
        }
        self.run.reset();
        self.emit(Message::split_time(0));
    }

    fn new_mouse(&mut self) {
        log::info!("new mouse selected");
        self.run.reset();
        self.course.reset();
        self.emit(Message::course_time(0));
        self.emit(Message::split_time(0));
        self.enter(RunState::NewMouse);
    }

    fn enter(&mut self, state: RunState) {
        if state == self.state {
            return;
        }
        log::info!("state: {} -> {}", self.state.display_name(), state.display_name());
        self.state = state;
        self.emit(Message::state(state));
        if state == RunState::Calibrate {
            self.report.stop();
            self.log_gate_diagnostics();
        }
    }

    fn log_gate_diagnostics(&self) {
        for (gate, channel) in &self.gates {
            let sensor = channel.sensor();
            log::info!(
                "{} gate: baseline {:.1}, threshold {:.1}, settles in {} ticks",
                gate.display_name(),
                sensor.baseline(),
                sensor.threshold(),
                sensor.settling_ticks()
            );
        }
    }

    fn report_levels(&mut self) {
        let levels = self
            .gates
            .each_ref()
            .map(|(gate, channel)| Message::level(*gate, channel.sensor().level()));
        for msg in levels {
            self.emit(msg);
        }
        if let Some(pots) = self.pots.as_mut() {
            let readings = [
                (Gate::Start, pots.start.read_raw()),
                (Gate::Finish, pots.finish.read_raw()),
                (Gate::Cell, pots.cell.read_raw()),
            ];
            for (gate, raw) in readings {
                self.emit(Message::pot(gate, raw));
            }
        }
    }

    fn emit(&mut self, msg: Message) {
        if self.tx.send(msg).is_err() {
            log::warn!("message queue closed, dropping {msg}");
        }
    }
}

fn gate_index(gate: Gate) -> usize {
    match gate {
        Gate::Start => 0,
        Gate::Finish => 1,
        Gate::Cell => 2,
    }
}

fn button_index(id: ButtonId) -> usize {
    match id {
        ButtonId::Arm => 0,
        ButtonId::Start => 1,
        ButtonId::Goal => 2,
        ButtonId::Reset => 3,
    }
}
