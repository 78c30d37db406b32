// MazeTimer - Trace Replay
//
// Drives the controller from a recorded CSV trace instead of live pins, one
// row per polling tick:
//
//     ms,start,finish,cell,arm,start_btn,goal,reset
//
// Gate columns are raw ADC counts, button columns are 1 while the button is
// held.  Blank lines, `#` comments and a header row starting with `ms` are
// skipped.  Frames go to the writer exactly as they would on the serial port.

use std::io::{BufRead, Write};
use std::sync::mpsc::{self, Receiver};

use anyhow::{bail, Context};

use crate::clock::ManualClock;
use crate::config::Calibration;
use crate::controller::{ButtonInputs, Controller, GateInputs};
use crate::events::RunState;
use crate::hal::{NoDelay, SimulatedPin, SIM_ADC_MAX};
use crate::input::{DigitalSense, Polarity};
use crate::protocol::{HostCommand, Message, MessageWriter};

const COLUMNS: usize = 8;

/// One row of a trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceSample {
    pub ms: u32,
    /// Start, finish, cell.
    pub gates: [u16; 3],
    /// Arm, start, goal, reset.
    pub buttons: [bool; 4],
}

impl TraceSample {
    /// Parse a trace line.  `Ok(None)` for lines that carry no sample.
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("ms") {
            return Ok(None);
        }

        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        if fields.len() != COLUMNS {
            bail!("expected {COLUMNS} columns, found {}", fields.len());
        }

        let ms = fields[0].parse().with_context(|| format!("bad timestamp {:?}", fields[0]))?;
        let mut gates = [0u16; 3];
        for (slot, field) in gates.iter_mut().zip(&fields[1..4]) {
            *slot = field.parse().with_context(|| format!("bad gate reading {field:?}"))?;
        }
        let mut buttons = [false; 4];
        for (slot, field) in buttons.iter_mut().zip(&fields[4..]) {
            *slot = match *field {
                "0" => false,
                "1" => true,
                other => bail!("bad button level {other:?}"),
            };
        }
        Ok(Some(Self { ms, gates, buttons }))
    }
}

type SimController = Controller<SimulatedPin, DigitalSense<SimulatedPin>, ManualClock>;

pub struct Replayer<W: Write> {
    clock: ManualClock,
    gates: [SimulatedPin; 3],
    buttons: [SimulatedPin; 4],
    ctrl: SimController,
    msg_rx: Receiver<Message>,
    writer: MessageWriter<W, NoDelay>,
}

impl<W: Write> Replayer<W> {
    pub fn new(cal: &Calibration, out: W) -> Self {
        let clock = ManualClock::new(0);
        let gates: [SimulatedPin; 3] = Default::default();
        // Buttons idle HIGH behind their pull-ups.
        let buttons = [(); 4].map(|_| SimulatedPin::new(SIM_ADC_MAX));
        let (msg_tx, msg_rx) = mpsc::channel();

        let ctrl = Controller::new(
            GateInputs {
                start: gates[0].clone(),
                finish: gates[1].clone(),
                cell: gates[2].clone(),
            },
            None,
            ButtonInputs {
                arm: DigitalSense(buttons[0].clone()),
                start: DigitalSense(buttons[1].clone()),
                goal: DigitalSense(buttons[2].clone()),
                reset: DigitalSense(buttons[3].clone()),
                polarity: Polarity::ActiveLow,
            },
            clock.clone(),
            cal,
            msg_tx,
        );

        Self {
            clock,
            gates,
            buttons,
            ctrl,
            msg_rx,
            writer: MessageWriter::new(out, NoDelay, cal.timing.run_time_repeat_delay_ms),
        }
    }

    /// Apply one sample and tick the controller once.
    pub fn feed(&mut self, sample: &TraceSample) -> anyhow::Result<()> {
        self.clock.set(sample.ms);
        for (pin, raw) in self.gates.iter().zip(sample.gates) {
            pin.set_raw(raw);
        }
        for (pin, held) in self.buttons.iter().zip(sample.buttons) {
            pin.set_level(!held);
        }
        self.ctrl.tick();
        self.flush()
    }

    pub fn command(&mut self, cmd: HostCommand) -> anyhow::Result<()> {
        self.ctrl.handle_command(cmd);
        self.flush()
    }

    /// Replay a whole trace.  Returns the number of samples fed.
    pub fn run<R: BufRead>(&mut self, reader: R) -> anyhow::Result<usize> {
        self.ctrl.announce();
        self.flush()?;

        let mut samples = 0;
        for (n, line) in reader.lines().enumerate() {
            let line = line.context("reading trace")?;
            let parsed =
                TraceSample::parse(&line).with_context(|| format!("trace line {}", n + 1))?;
            let Some(sample) = parsed else {
                continue;
            };
            self.feed(&sample)?;
            samples += 1;
        }
        log::info!("replayed {} samples, final state: {}", samples, self.state().display_name());
        Ok(samples)
    }

    pub fn state(&self) -> RunState {
        self.ctrl.state()
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn flush(&mut self) -> anyhow::Result<()> {
        for msg in self.msg_rx.try_iter() {
            self.writer.send(&msg)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn parses_a_sample_row() {
        let sample = TraceSample::parse(" 1200, 500,498,120, 0,1,0,0 ").unwrap().unwrap();
        assert_eq!(
            sample,
            TraceSample {
                ms: 1200,
                gates: [500, 498, 120],
                buttons: [false, true, false, false],
            }
        );
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("# recorded on the club maze")]
    #[case("ms,start,finish,cell,arm,start_btn,goal,reset")]
    fn skips_non_sample_lines(#[case] line: &str) {
        assert_eq!(TraceSample::parse(line).unwrap(), None);
    }

    #[rstest]
    #[case("1,2,3")]
    #[case("x,500,500,500,0,0,0,0")]
    #[case("1,500,-4,500,0,0,0,0")]
    #[case("1,500,500,500,0,2,0,0")]
    fn rejects_malformed_rows(#[case] line: &str) {
        assert!(TraceSample::parse(line).is_err());
    }

    #[test]
    fn reports_the_failing_line() {
        let mut replayer = Replayer::new(&Calibration::default(), Vec::new());
        let err = replayer.run("ms,a\n0,500,500,500,0,0,0,0\nbad\n".as_bytes()).unwrap_err();
        assert!(format!("{err:#}").contains("trace line 3"), "{err:#}");
    }

    #[test]
    fn button_trace_produces_a_run() {
        let mut trace = String::from("# manual run\n");
        trace.push_str("ms,start,finish,cell,arm,start_btn,goal,reset\n");
        let mut row = |ms: u32, arm: u8, start: u8, goal: u8| {
            trace.push_str(&format!("{ms},500,500,500,{arm},{start},{goal},0\n"));
        };
        for ms in 1..=300 {
            row(ms, 0, 0, 0);
        }
        for ms in 301..=1_500 {
            // Arm click, start click, then goal click one second later.
            let arm = u8::from((301..351).contains(&ms));
            let start = u8::from((401..451).contains(&ms));
            let goal = u8::from((1_401..1_451).contains(&ms));
            row(ms, arm, start, goal);
        }

        let mut replayer = Replayer::new(&Calibration::default(), Vec::new());
        assert_eq!(replayer.run(trace.as_bytes()).unwrap(), 1_500);
        assert_eq!(replayer.state(), RunState::RunComplete);

        let out = String::from_utf8(replayer.into_inner()).unwrap();
        assert_eq!(
            out,
            "<4,1>\r\n<4,2>\r\n<30,0>\r\n<12,0>\r\n<4,3>\r\n<13,1000>\r\n<13,1000>\r\n<4,5>\r\n"
        );
    }

    #[test]
    fn host_command_goes_through_the_controller() {
        let mut replayer = Replayer::new(&Calibration::default(), Vec::new());
        replayer.command(HostCommand::NewMouse).unwrap();
        assert_eq!(replayer.state(), RunState::NewMouse);
        let out = String::from_utf8(replayer.into_inner()).unwrap();
        assert_eq!(out, "<30,0>\r\n<12,0>\r\n<4,6>\r\n");
    }
}
