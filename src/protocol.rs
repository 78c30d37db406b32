// MazeTimer - Host Message Protocol
//
// ASCII frames on the serial link, one per line:
//
//     <type,value>\r\n
//
// `type` is a decimal code from the registry below and `value` an unsigned
// decimal (milliseconds, raw ADC counts, or 0/1).  No acknowledgement and no
// checksum: the host sees frames in emission order and nothing else.  The
// run-time frame is the one result the host must not miss, so it is always
// written twice with a short gap.

use std::fmt;
use std::io::Write;

use anyhow::{bail, Context};

use crate::events::{Gate, RunState};
use crate::hal::Delay;

/// Frame delimiters.
pub const FRAME_START: u8 = b'<';
pub const FRAME_SEPARATOR: u8 = b',';
pub const FRAME_END: u8 = b'>';
pub const LINE_TERMINATOR: &str = "\r\n";

/// Copies of a run-time frame put on the wire.
pub const RUN_TIME_COPIES: usize = 2;

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ToHost,
    FromHost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    CurrentState,
    SplitTime,
    RunTime,
    CourseTime,
    StartTrigger,
    FinishTrigger,
    CellTrigger,
    StartGateLevel,
    StartGatePot,
    FinishGateLevel,
    FinishGatePot,
    CellLevel,
    CellPot,
    NewMouse,
    SetMode,
}

impl MessageType {
    pub fn code(self) -> u8 {
        match self {
            Self::CurrentState => 4,
            Self::SplitTime => 12,
            Self::RunTime => 13,
            Self::CourseTime => 30,
            Self::StartTrigger => 71,
            Self::FinishTrigger => 72,
            Self::CellTrigger => 73,
            Self::StartGateLevel => 81,
            Self::StartGatePot => 82,
            Self::FinishGateLevel => 83,
            Self::FinishGatePot => 84,
            Self::CellLevel => 85,
            Self::CellPot => 86,
            Self::NewMouse => 98,
            Self::SetMode => 99,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            4 => Self::CurrentState,
            12 => Self::SplitTime,
            13 => Self::RunTime,
            30 => Self::CourseTime,
            71 => Self::StartTrigger,
            72 => Self::FinishTrigger,
            73 => Self::CellTrigger,
            81 => Self::StartGateLevel,
            82 => Self::StartGatePot,
            83 => Self::FinishGateLevel,
            84 => Self::FinishGatePot,
            85 => Self::CellLevel,
            86 => Self::CellPot,
            98 => Self::NewMouse,
            99 => Self::SetMode,
            _ => return None,
        })
    }

    pub fn direction(self) -> Direction {
        match self {
            Self::NewMouse | Self::SetMode => Direction::FromHost,
            _ => Direction::ToHost,
        }
    }

    /// How many times the frame is written.
    pub fn copies(self) -> usize {
        match self {
            Self::RunTime => RUN_TIME_COPIES,
            _ => 1,
        }
    }

    pub fn trigger(gate: Gate) -> Self {
        match gate {
            Gate::Start => Self::StartTrigger,
            Gate::Finish => Self::FinishTrigger,
            Gate::Cell => Self::CellTrigger,
        }
    }

    pub fn level(gate: Gate) -> Self {
        match gate {
            Gate::Start => Self::StartGateLevel,
            Gate::Finish => Self::FinishGateLevel,
            Gate::Cell => Self::CellLevel,
        }
    }

    pub fn pot(gate: Gate) -> Self {
        match gate {
            Gate::Start => Self::StartGatePot,
            Gate::Finish => Self::FinishGatePot,
            Gate::Cell => Self::CellPot,
        }
    }
}

// ---------------------------------------------------------------------------
// Outgoing messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    kind: MessageType,
    value: u32,
}

impl Message {
    pub fn new(kind: MessageType, value: u32) -> Self {
        Self { kind, value }
    }

    pub fn state(state: RunState) -> Self {
        Self::new(MessageType::CurrentState, state.code())
    }

    pub fn split_time(ms: u32) -> Self {
        Self::new(MessageType::SplitTime, ms)
    }

    pub fn run_time(ms: u32) -> Self {
        Self::new(MessageType::RunTime, ms)
    }

    pub fn course_time(ms: u32) -> Self {
        Self::new(MessageType::CourseTime, ms)
    }

    pub fn trigger(gate: Gate, active: bool) -> Self {
        Self::new(MessageType::trigger(gate), u32::from(active))
    }

    pub fn level(gate: Gate, raw: u16) -> Self {
        Self::new(MessageType::level(gate), u32::from(raw))
    }

    pub fn pot(gate: Gate, raw: u16) -> Self {
        Self::new(MessageType::pot(gate), u32::from(raw))
    }

    #[inline]
    pub fn kind(&self) -> MessageType {
        self.kind
    }

    #[inline]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// One frame including the line terminator.
    pub fn write_frame<W: Write + ?Sized>(&self, out: &mut W) -> std::io::Result<()> {
        write!(out, "{self}{LINE_TERMINATOR}")
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{},{}>", self.kind.code(), self.value)
    }
}

/// Puts messages on the wire, repeating run-time frames.
pub struct MessageWriter<W, D> {
    out: W,
    delay: D,
    repeat_delay_ms: u32,
}

impl<W: Write, D: Delay> MessageWriter<W, D> {
    pub fn new(out: W, delay: D, repeat_delay_ms: u32) -> Self {
        Self {
            out,
            delay,
            repeat_delay_ms,
        }
    }

    pub fn send(&mut self, msg: &Message) -> anyhow::Result<()> {
        for copy in 0..msg.kind().copies() {
            if copy > 0 {
                self.delay.delay_ms(self.repeat_delay_ms);
            }
            msg.write_frame(&mut self.out)
                .with_context(|| format!("writing frame {msg}"))?;
            self.out.flush().context("flushing serial output")?;
        }
        Ok(())
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

// ---------------------------------------------------------------------------
// Incoming frames
// ---------------------------------------------------------------------------

/// A decoded `<code,value>` pair, not yet checked against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub code: u32,
    pub value: u32,
}

/// Commands the host may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostCommand {
    /// A different mouse was selected in the host application.
    NewMouse,
}

impl TryFrom<Frame> for HostCommand {
    type Error = anyhow::Error;

    fn try_from(frame: Frame) -> anyhow::Result<Self> {
        let Some(kind) = MessageType::from_code(frame.code) else {
            bail!("unknown message type {}", frame.code);
        };
        if kind.direction() == Direction::ToHost {
            bail!("{kind:?} ({}) is not a host command", frame.code);
        }
        match kind {
            MessageType::NewMouse => Ok(Self::NewMouse),
            _ => bail!("{kind:?} ({}) is not supported", frame.code),
        }
    }
}

enum ParseState {
    WaitStart,
    Code { code: u32, digits: u8 },
    Value { code: u32, value: u32, digits: u8 },
}

/// Longest decimal field accepted (fits u32).
const MAX_DIGITS: u8 = 10;

/// Byte-at-a-time frame decoder.  Anything that does not form a frame is
/// dropped and the parser waits for the next `<`.
pub struct FrameParser {
    state: ParseState,
}

impl FrameParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::WaitStart,
        }
    }

    /// Process a single incoming byte.  Returns `Some(Frame)` when a frame
    /// completes.
    pub fn push(&mut self, byte: u8) -> Option<Frame> {
        if byte == FRAME_START {
            if !matches!(self.state, ParseState::WaitStart) {
                log::warn!("host frame restarted before completion");
            }
            self.state = ParseState::Code { code: 0, digits: 0 };
            return None;
        }

        match self.state {
            ParseState::WaitStart => {}
            ParseState::Code { code, digits } => match byte {
                b'0'..=b'9' => match accumulate(code, digits, byte) {
                    Some(code) => {
                        self.state = ParseState::Code {
                            code,
                            digits: digits + 1,
                        }
                    }
                    None => self.resync("type field overflow"),
                },
                FRAME_SEPARATOR if digits > 0 => {
                    self.state = ParseState::Value {
                        code,
                        value: 0,
                        digits: 0,
                    }
                }
                _ => self.resync("malformed type field"),
            },
            ParseState::Value {
                code,
                value,
                digits,
            } => match byte {
                b'0'..=b'9' => match accumulate(value, digits, byte) {
                    Some(value) => {
                        self.state = ParseState::Value {
                            code,
                            value,
                            digits: digits + 1,
                        }
                    }
                    None => self.resync("value field overflow"),
                },
                FRAME_END if digits > 0 => {
                    self.state = ParseState::WaitStart;
                    return Some(Frame { code, value });
                }
                _ => self.resync("malformed value field"),
            },
        }
        None
    }

    fn resync(&mut self, reason: &str) {
        log::warn!("dropping host frame: {reason}");
        self.state = ParseState::WaitStart;
    }
}

impl Default for FrameParser {
    fn default() -> Self {
        Self::new()
    }
}

fn accumulate(acc: u32, digits: u8, byte: u8) -> Option<u32> {
    if digits >= MAX_DIGITS {
        return None;
    }
    acc.checked_mul(10)?.checked_add(u32::from(byte - b'0'))
}
