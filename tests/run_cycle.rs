// End-to-end run through the timing controller: simulated gates and buttons
// on a manual clock, frames rendered exactly as the serial task writes them.

use std::sync::mpsc::{self, Receiver};

use mazetimer::clock::ManualClock;
use mazetimer::config::Calibration;
use mazetimer::controller::{ButtonInputs, Controller, GateInputs};
use mazetimer::events::{Gate, RunState};
use mazetimer::hal::{NoDelay, SimulatedPin};
use mazetimer::input::{DigitalSense, Polarity};
use mazetimer::protocol::{FrameParser, HostCommand, Message, MessageWriter};
use mazetimer::tasks::timing::apply_commands;

const AMBIENT: u16 = 620;
const BLOCKED: u16 = 180;

struct Rig {
    clock: ManualClock,
    start: SimulatedPin,
    finish: SimulatedPin,
    cell: SimulatedPin,
    reset: SimulatedPin,
    ctrl: Controller<SimulatedPin, DigitalSense<SimulatedPin>, ManualClock>,
    msg_rx: Receiver<Message>,
    wire: MessageWriter<Vec<u8>, NoDelay>,
}

impl Rig {
    fn new() -> Self {
        let clock = ManualClock::new(7_000);
        let start = SimulatedPin::new(AMBIENT);
        let finish = SimulatedPin::new(AMBIENT);
        let cell = SimulatedPin::new(AMBIENT);
        let button = || {
            let pin = SimulatedPin::default();
            pin.set_level(true);
            pin
        };
        let reset = button();
        let (msg_tx, msg_rx) = mpsc::channel();

        let cal = Calibration::from_toml_str("[gate]\nhold_ticks = 50\n").unwrap();
        let ctrl = Controller::new(
            GateInputs {
                start: start.clone(),
                finish: finish.clone(),
                cell: cell.clone(),
            },
            None,
            ButtonInputs {
                arm: DigitalSense(button()),
                start: DigitalSense(button()),
                goal: DigitalSense(button()),
                reset: DigitalSense(reset.clone()),
                polarity: Polarity::ActiveLow,
            },
            clock.clone(),
            &cal,
            msg_tx,
        );

        let mut rig = Self {
            clock,
            start,
            finish,
            cell,
            reset,
            ctrl,
            msg_rx,
            wire: MessageWriter::new(Vec::new(), NoDelay, cal.timing.run_time_repeat_delay_ms),
        };
        rig.run_ms(500);
        rig
    }

    fn run_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.clock.advance(1);
            self.ctrl.tick();
            for msg in self.msg_rx.try_iter() {
                self.wire.send(&msg).unwrap();
            }
        }
    }

    fn block(&mut self, gate: Gate, ms: u32) {
        let pin = match gate {
            Gate::Start => self.start.clone(),
            Gate::Finish => self.finish.clone(),
            Gate::Cell => self.cell.clone(),
        };
        pin.set_raw(BLOCKED);
        self.run_ms(ms);
        pin.set_raw(AMBIENT);
        self.run_ms(200);
    }

    fn frames(&self) -> Vec<(u32, u32)> {
        let mut parser = FrameParser::new();
        self.wire
            .get_ref()
            .iter()
            .filter_map(|b| parser.push(*b))
            .map(|f| (f.code, f.value))
            .collect()
    }
}

#[test]
fn mouse_run_from_start_cell_to_goal() {
    let mut rig = Rig::new();

    rig.block(Gate::Cell, 30);
    assert_eq!(rig.ctrl.state(), RunState::MouseInStartCell);

    rig.block(Gate::Start, 15);
    assert_eq!(rig.ctrl.state(), RunState::RunInProgress);

    rig.run_ms(12_000);
    rig.block(Gate::Finish, 15);
    assert_eq!(rig.ctrl.state(), RunState::RunComplete);

    let expected_run = 15 + 200 + 12_000;
    assert_eq!(rig.ctrl.run_time(), expected_run);

    let frames = rig.frames();
    assert_eq!(
        frames,
        vec![
            (73, 1),
            (4, 2),
            (73, 0),
            (71, 1),
            (30, 0),
            (12, 0),
            (4, 3),
            (71, 0),
            (4, 4),
            (72, 1),
            (13, expected_run),
            (13, expected_run),
            (4, 5),
            (72, 0),
        ]
    );
}

#[test]
fn second_run_reuses_the_course_clock() {
    let mut rig = Rig::new();
    rig.block(Gate::Cell, 30);
    rig.block(Gate::Start, 15);
    rig.block(Gate::Finish, 15);
    rig.block(Gate::Cell, 30);
    assert_eq!(rig.ctrl.state(), RunState::MouseInStartCell);
    rig.block(Gate::Start, 15);
    rig.run_ms(3_000);
    rig.block(Gate::Finish, 15);

    let frames = rig.frames();
    let course: Vec<_> = frames.iter().filter(|f| f.0 == 30).collect();
    assert_eq!(course, vec![&(30, 0)]);
    let runs: Vec<_> = frames.iter().filter(|f| f.0 == 13).map(|f| f.1).collect();
    assert_eq!(runs, vec![215, 215, 3_215, 3_215]);
    assert!(rig.ctrl.course_time() > 3_215);
}

#[test]
fn host_new_mouse_restarts_the_course() {
    let mut rig = Rig::new();
    rig.block(Gate::Cell, 30);
    rig.block(Gate::Start, 15);

    let (cmd_tx, cmd_rx) = mpsc::channel();
    cmd_tx.send(HostCommand::try_from(FrameParser::new().push_all(b"<98,0>")).unwrap()).unwrap();
    assert!(apply_commands(&mut rig.ctrl, &cmd_rx));
    rig.run_ms(1);

    assert_eq!(rig.ctrl.state(), RunState::Searching);
    assert_eq!(rig.ctrl.course_time(), 0);
    let frames = rig.frames();
    assert_eq!(&frames[frames.len() - 4..], &[(30, 0), (12, 0), (4, 6), (4, 1)]);
}

#[test]
fn reset_button_abandons_the_run() {
    let mut rig = Rig::new();
    rig.block(Gate::Cell, 30);
    rig.block(Gate::Start, 15);

    rig.reset.set_level(false);
    rig.run_ms(40);
    rig.reset.set_level(true);
    rig.run_ms(1);
    assert_eq!(rig.ctrl.state(), RunState::Searching);

    // The finish gate no longer stops anything.
    rig.block(Gate::Finish, 15);
    assert!(rig.frames().iter().all(|f| f.0 != 13));
}

trait PushAll {
    fn push_all(&mut self, bytes: &[u8]) -> mazetimer::protocol::Frame;
}

impl PushAll for FrameParser {
    fn push_all(&mut self, bytes: &[u8]) -> mazetimer::protocol::Frame {
        bytes
            .iter()
            .filter_map(|b| self.push(*b))
            .last()
            .expect("no complete frame")
    }
}
