// MazeTimer - System Events & Data Types

// ---------------------------------------------------------------------------
// Gates
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gate {
    /// Start gate, crossed when the mouse leaves the start cell.
    Start,
    /// Finish gate at the maze centre.
    Finish,
    /// "Mouse in start cell" detector.
    Cell,
}

impl Gate {
    pub const ALL: [Gate; 3] = [Gate::Start, Gate::Finish, Gate::Cell];

    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Finish => "finish",
            Self::Cell => "cell",
        }
    }
}

// ---------------------------------------------------------------------------
// Buttons
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    Arm,
    Start,
    Goal,
    Reset,
}

impl ButtonId {
    pub const ALL: [ButtonId; 4] = [
        ButtonId::Arm,
        ButtonId::Start,
        ButtonId::Goal,
        ButtonId::Reset,
    ];
}

/// Gesture recognised by a [`crate::input::Button`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEvent {
    /// Button went down.
    Press,
    /// Released quickly after a press.
    Click,
    /// Held past the long-press time (fires once per press).
    LongPress,
}

// ---------------------------------------------------------------------------
// Run state (reported to the host as message type 4)
// ---------------------------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Calibrate,
    Searching,
    MouseInStartCell,
    RunStarted,
    RunInProgress,
    RunComplete,
    NewMouse,
}

impl RunState {
    /// Wire value of the state.
    pub fn code(&self) -> u32 {
        match self {
            Self::Calibrate => 0,
            Self::Searching => 1,
            Self::MouseInStartCell => 2,
            Self::RunStarted => 3,
            Self::RunInProgress => 4,
            Self::RunComplete => 5,
            Self::NewMouse => 6,
        }
    }

    /// Human-readable label for logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Calibrate => "calibrate gates",
            Self::Searching => "looking for mouse",
            Self::MouseInStartCell => "mouse in start cell",
            Self::RunStarted => "run started",
            Self::RunInProgress => "run in progress",
            Self::RunComplete => "run complete",
            Self::NewMouse => "new mouse",
        }
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::Searching
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_state_codes_match_host_registry() {
        let states = [
            RunState::Calibrate,
            RunState::Searching,
            RunState::MouseInStartCell,
            RunState::RunStarted,
            RunState::RunInProgress,
            RunState::RunComplete,
            RunState::NewMouse,
        ];
        for (code, state) in states.iter().enumerate() {
            assert_eq!(state.code(), code as u32, "{}", state.display_name());
        }
    }
}
