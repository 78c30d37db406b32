// MazeTimer - Firmware Entry Point
//
// On the ESP32-C3:
//   1. Bring up logging and validate the calibration.
//   2. Configure the gate ADC channels and the button GPIOs.
//   3. Spawn the serial (frames out) and host-link (commands in) tasks.
//   4. Run the timing loop on the main thread; it never returns.
//
// On any other target the binary replays a recorded CSV trace through the
// same controller and prints the frames the rig would have sent.

#[cfg(target_os = "espidf")]
mod drivers;

#[cfg(target_os = "espidf")]
fn main() -> anyhow::Result<()> {
    firmware::run()
}

#[cfg(not(target_os = "espidf"))]
fn main() -> anyhow::Result<()> {
    host::run()
}

// ---------------------------------------------------------------------------
// Firmware
// ---------------------------------------------------------------------------
#[cfg(target_os = "espidf")]
mod firmware {
    use std::io;
    use std::sync::mpsc;
    use std::thread;

    use esp_idf_hal::gpio::{AnyIOPin, IOPin, Pin};
    use esp_idf_hal::prelude::*;

    use mazetimer::clock::Clock;
    use mazetimer::config::*;
    use mazetimer::controller::{ButtonInputs, Controller, GateInputs};
    use mazetimer::hal::ThreadDelay;
    use mazetimer::input::{DigitalSense, Polarity};
    use mazetimer::protocol::MessageWriter;
    use mazetimer::tasks;

    use crate::drivers::adc::OneshotAdc;
    use crate::drivers::gpio::GpioInput;

    /// Milliseconds since boot from the ESP timer (wraps at ~49 days).
    #[derive(Debug, Clone, Copy)]
    struct BootClock;

    impl Clock for BootClock {
        fn now_ms(&self) -> u32 {
            unsafe { (esp_idf_sys::esp_timer_get_time() / 1000) as u32 }
        }
    }

    pub fn run() -> anyhow::Result<()> {
        // Link esp-idf-sys runtime patches and initialise logging.
        esp_idf_svc::sys::link_patches();
        esp_idf_svc::log::EspLogger::initialize_default();
        log::info!("MazeTimer firmware starting");

        let cal = Calibration::default();
        cal.validate()?;

        // ---- Peripherals --------------------------------------------------
        let peripherals = Peripherals::take()?;

        let adc = OneshotAdc::new()?;
        let gates = GateInputs {
            start: adc.channel(ADC_CHANNEL_GATE_START)?,
            finish: adc.channel(ADC_CHANNEL_GATE_FINISH)?,
            cell: adc.channel(ADC_CHANNEL_GATE_CELL)?,
        };

        let pins = peripherals.pins;
        let buttons = ButtonInputs {
            arm: button_input(pins.gpio5.downgrade(), PIN_BUTTON_ARM)?,
            start: button_input(pins.gpio6.downgrade(), PIN_BUTTON_START)?,
            goal: button_input(pins.gpio7.downgrade(), PIN_BUTTON_GOAL)?,
            reset: button_input(pins.gpio10.downgrade(), PIN_BUTTON_RESET)?,
            polarity: Polarity::ActiveLow,
        };
        log::info!(
            "Buttons on GPIO{}/{}/{}/{}, gates on ADC1 channels {}/{}/{}",
            PIN_BUTTON_ARM,
            PIN_BUTTON_START,
            PIN_BUTTON_GOAL,
            PIN_BUTTON_RESET,
            ADC_CHANNEL_GATE_START,
            ADC_CHANNEL_GATE_FINISH,
            ADC_CHANNEL_GATE_CELL
        );

        // ---- Channels -----------------------------------------------------
        let (msg_tx, msg_rx) = mpsc::channel();
        let (cmd_tx, cmd_rx) = mpsc::channel();

        // ---- Spawn tasks (map to FreeRTOS tasks via std::thread) ----------
        let repeat_delay_ms = cal.timing.run_time_repeat_delay_ms;
        thread::Builder::new()
            .name("serial".into())
            .stack_size(STACK_SERIAL)
            .spawn(move || {
                let writer = MessageWriter::new(io::stdout(), ThreadDelay, repeat_delay_ms);
                tasks::serial::serial_task(msg_rx, writer);
            })?;

        thread::Builder::new()
            .name("host-link".into())
            .stack_size(STACK_HOST_LINK)
            .spawn(move || {
                tasks::serial::host_link_task(io::stdin(), cmd_tx);
            })?;

        // The controller holds button callbacks, so it stays on this thread.
        let ctrl = Controller::new(gates, None, buttons, BootClock, &cal, msg_tx);
        tasks::timing::timing_task(ctrl, cmd_rx, cal.timing.tick_interval_ms)
    }

    /// Pull-up button input.  `pin` must be the GPIO the pin map in `config`
    /// names for that button.
    fn button_input(pin: AnyIOPin, expected: i32) -> anyhow::Result<DigitalSense<GpioInput>> {
        if pin.pin() != expected {
            anyhow::bail!("button on GPIO{} but config names GPIO{}", pin.pin(), expected);
        }
        Ok(DigitalSense(GpioInput::pull_up(pin)?))
    }
}

// ---------------------------------------------------------------------------
// Host trace replay
// ---------------------------------------------------------------------------
#[cfg(not(target_os = "espidf"))]
mod host {
    use std::fs;
    use std::io::{self, BufRead, BufReader, Write};
    use std::path::PathBuf;

    use anyhow::{bail, Context};
    use log::{LevelFilter, Log, Metadata, Record};

    use mazetimer::config::Calibration;
    use mazetimer::replay::Replayer;

    const USAGE: &str = "usage: mazetimer [--config <calibration.toml>] [<trace.csv> | -]";

    struct StderrLogger;

    impl Log for StderrLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if self.enabled(record.metadata()) {
                eprintln!("[{:<5}] {}", record.level(), record.args());
            }
        }

        fn flush(&self) {}
    }

    static LOGGER: StderrLogger = StderrLogger;

    fn init_logging() {
        let level = std::env::var("MAZETIMER_LOG")
            .ok()
            .and_then(|v| v.parse::<LevelFilter>().ok())
            .unwrap_or(LevelFilter::Info);
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(level);
        }
    }

    struct Options {
        config: Option<PathBuf>,
        trace: Option<PathBuf>,
    }

    fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Option<Options>> {
        let mut opts = Options {
            config: None,
            trace: None,
        };
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => return Ok(None),
                "--config" => {
                    let path = args.next().context("--config needs a path")?;
                    opts.config = Some(PathBuf::from(path));
                }
                "-" => opts.trace = None,
                other if other.starts_with('-') => bail!("unknown option {other}\n{USAGE}"),
                other => {
                    if opts.trace.is_some() {
                        bail!("more than one trace given\n{USAGE}");
                    }
                    opts.trace = Some(PathBuf::from(other));
                }
            }
        }
        Ok(Some(opts))
    }

    pub fn run() -> anyhow::Result<()> {
        init_logging();

        let Some(opts) = parse_args(std::env::args().skip(1))? else {
            println!("{USAGE}");
            return Ok(());
        };

        let cal = match &opts.config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Calibration::from_toml_str(&text)
                    .with_context(|| format!("loading {}", path.display()))?
            }
            None => Calibration::default(),
        };

        let input: Box<dyn BufRead> = match &opts.trace {
            Some(path) => {
                let file = fs::File::open(path)
                    .with_context(|| format!("opening {}", path.display()))?;
                Box::new(BufReader::new(file))
            }
            None => Box::new(io::stdin().lock()),
        };

        log::debug!("calibration: {:?}", cal);

        let mut replayer = Replayer::new(&cal, io::stdout().lock());
        replayer.run(input)?;
        replayer.into_inner().flush()?;
        Ok(())
    }
}
