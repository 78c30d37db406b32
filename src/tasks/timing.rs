// MazeTimer - Timing Task
//
// Fixed-rate polling loop.  Every tick it applies pending host commands and
// advances the controller, which samples the gates and buttons and queues
// messages for the serial task.  Runs on the main thread: the controller owns
// button callbacks and is not `Send`.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::controller::Controller;
use crate::hal::AnalogRead;
use crate::input::LevelSource;
use crate::protocol::HostCommand;

pub fn timing_task<A, S, C>(
    mut ctrl: Controller<A, S, C>,
    cmd_rx: Receiver<HostCommand>,
    tick_interval_ms: u32,
) -> !
where
    A: AnalogRead,
    S: LevelSource,
    C: Clock + Clone,
{
    log::info!("Timing task started ({} ms tick)", tick_interval_ms);

    let interval = Duration::from_millis(u64::from(tick_interval_ms));
    let mut link_open = true;
    ctrl.announce();

    loop {
        let tick_start = Instant::now();

        if link_open && !apply_commands(&mut ctrl, &cmd_rx) {
            log::warn!("Host link closed, no further host commands");
            link_open = false;
        }
        ctrl.tick();

        let elapsed = tick_start.elapsed();
        if elapsed < interval {
            thread::sleep(interval - elapsed);
        }
    }
}

/// Apply every queued host command without blocking.  Returns `false` once
/// the sending side has gone away.
pub fn apply_commands<A, S, C>(
    ctrl: &mut Controller<A, S, C>,
    cmd_rx: &Receiver<HostCommand>,
) -> bool
where
    A: AnalogRead,
    S: LevelSource,
    C: Clock + Clone,
{
    loop {
        match cmd_rx.try_recv() {
            Ok(cmd) => {
                log::debug!("host command: {:?}", cmd);
                ctrl.handle_command(cmd);
            }
            Err(TryRecvError::Empty) => return true,
            Err(TryRecvError::Disconnected) => return false,
        }
    }
}
