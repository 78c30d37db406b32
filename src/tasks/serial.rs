// MazeTimer - Serial Tasks
//
// `serial_task` drains the message queue onto the serial port.
// `host_link_task` decodes frames arriving from the host and forwards the
// recognised commands to the timing task.

use std::io::{ErrorKind, Read, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::config::HOST_LINK_POLL_MS;
use crate::hal::Delay;
use crate::protocol::{FrameParser, HostCommand, Message, MessageWriter};

pub fn serial_task<W: Write, D: Delay>(msg_rx: Receiver<Message>, mut writer: MessageWriter<W, D>) {
    log::info!("Serial task started");

    for msg in msg_rx {
        if let Err(e) = writer.send(&msg) {
            log::warn!("Serial write failed: {:#}", e);
        }
    }

    log::info!("Message channel closed, exiting serial task");
}

pub fn host_link_task<R: Read>(mut reader: R, cmd_tx: Sender<HostCommand>) {
    log::info!("Host link task started");

    let mut parser = FrameParser::new();
    let mut buf = [0u8; 64];
    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            // The ESP-IDF console reports "no data yet" this way.
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                thread::sleep(Duration::from_millis(HOST_LINK_POLL_MS));
                continue;
            }
            Err(e) => {
                log::error!("Host link read failed: {}", e);
                return;
            }
        };

        for frame in buf[..n].iter().filter_map(|b| parser.push(*b)) {
            match HostCommand::try_from(frame) {
                Ok(cmd) => {
                    log::info!("Host command: {:?}", cmd);
                    if cmd_tx.send(cmd).is_err() {
                        log::warn!("Command channel closed, exiting host link task");
                        return;
                    }
                }
                Err(e) => {
                    log::warn!("Ignoring host frame <{},{}>: {:#}", frame.code, frame.value, e)
                }
            }
        }
    }

    log::info!("Host link reached end of input");
}
