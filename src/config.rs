// MazeTimer - Hardware & Calibration Configuration
// Target: Seeed Studio Xiao ESP32-C3 (RISC-V)

use anyhow::{bail, Context};
use serde::Deserialize;

// ---------------------------------------------------------------------------
// GPIO Pin Definitions (Xiao ESP32-C3 pinout)
// ---------------------------------------------------------------------------
pub const PIN_BUTTON_ARM: i32 = 5;   // D3   : Arm button (INPUT_PULLUP, active LOW)
pub const PIN_BUTTON_START: i32 = 6; // D4   : Start button
pub const PIN_BUTTON_GOAL: i32 = 7;  // D5   : Goal button
pub const PIN_BUTTON_RESET: i32 = 10; // D10 : Reset button

// ---------------------------------------------------------------------------
// ADC (oneshot, ADC1)
// ---------------------------------------------------------------------------
pub const ADC_CHANNEL_GATE_START: u32 = 2;  // D0/A0 (GPIO2): start gate phototransistor
pub const ADC_CHANNEL_GATE_FINISH: u32 = 3; // D1/A1 (GPIO3): finish gate phototransistor
pub const ADC_CHANNEL_GATE_CELL: u32 = 4;   // D2/A2 (GPIO4): start-cell phototransistor
pub const ADC_FULL_SCALE: u16 = 4095;       // 12-bit
pub const ADC_MIDPOINT: u16 = ADC_FULL_SCALE / 2 + 1;

// ---------------------------------------------------------------------------
// Task Stack Sizes (bytes)
// ---------------------------------------------------------------------------
pub const STACK_SERIAL: usize = 4096;
pub const STACK_HOST_LINK: usize = 4096;

// ---------------------------------------------------------------------------
// Timing (milliseconds)
// ---------------------------------------------------------------------------
pub const TICK_INTERVAL_MS: u32 = 1;              // 1 kHz sensor/button poll
pub const LEVEL_REPORT_INTERVAL_MS: u32 = 100;    // calibration readings cadence
pub const RUN_TIME_REPEAT_DELAY_MS: u32 = 20;     // gap between the two run-time frames
pub const BUTTON_CLICK_MS: u32 = 300;             // longest press that still clicks
pub const BUTTON_LONG_PRESS_MS: u32 = 1500;
pub const HOST_LINK_POLL_MS: u64 = 10;            // idle console read back-off

// ---------------------------------------------------------------------------
// Gate detector defaults
// ---------------------------------------------------------------------------
pub const GATE_FAST_ALPHA: f32 = 0.2;   // ~21 samples to 99%
pub const GATE_SLOW_ALPHA: f32 = 0.02;  // ~228 samples to 99%
pub const GATE_THRESHOLD: f32 = 16.0;   // ADC counts below baseline
pub const GATE_HOLD_TICKS: u16 = 250;   // trigger pulse length

// ---------------------------------------------------------------------------
// Runtime calibration
// ---------------------------------------------------------------------------

/// Photo-gate tuning.  All fields are plain numbers so a config loader can
/// fill them in directly.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GateCalibration {
    pub fast_alpha: f32,
    pub slow_alpha: f32,
    pub threshold: f32,
    pub hold_ticks: u16,
}

impl Default for GateCalibration {
    fn default() -> Self {
        Self {
            fast_alpha: GATE_FAST_ALPHA,
            slow_alpha: GATE_SLOW_ALPHA,
            threshold: GATE_THRESHOLD,
            hold_ticks: GATE_HOLD_TICKS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ButtonCalibration {
    pub click_ms: u32,
    pub long_press_ms: u32,
    pub stable_polls: u8,
    /// ADC reading separating LOW from HIGH on analog-sensed buttons.
    pub analog_midpoint: u16,
}

impl Default for ButtonCalibration {
    fn default() -> Self {
        Self {
            click_ms: BUTTON_CLICK_MS,
            long_press_ms: BUTTON_LONG_PRESS_MS,
            stable_polls: 1,
            analog_midpoint: ADC_MIDPOINT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Calibration {
    pub gate: GateCalibration,
    pub button: ButtonCalibration,
    pub timing: LoopTiming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoopTiming {
    pub tick_interval_ms: u32,
    pub level_report_interval_ms: u32,
    pub run_time_repeat_delay_ms: u32,
}

impl Default for LoopTiming {
    fn default() -> Self {
        Self {
            tick_interval_ms: TICK_INTERVAL_MS,
            level_report_interval_ms: LEVEL_REPORT_INTERVAL_MS,
            run_time_repeat_delay_ms: RUN_TIME_REPEAT_DELAY_MS,
        }
    }
}

impl Calibration {
    /// Parse a TOML calibration file.  Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let cal: Self = toml::from_str(text).context("invalid calibration TOML")?;
        cal.validate()?;
        Ok(cal)
    }

    /// Range-check every tunable.  Out-of-range values are a configuration
    /// error; nothing downstream re-checks them.
    pub fn validate(&self) -> anyhow::Result<()> {
        let gate = &self.gate;
        for (name, alpha) in [("fast_alpha", gate.fast_alpha), ("slow_alpha", gate.slow_alpha)] {
            if !(alpha > 0.0 && alpha <= 1.0) {
                bail!("gate.{name} must be in (0, 1], got {alpha}");
            }
        }
        if gate.slow_alpha >= gate.fast_alpha {
            bail!(
                "gate.slow_alpha ({}) must be smaller than gate.fast_alpha ({})",
                gate.slow_alpha,
                gate.fast_alpha
            );
        }
        if !(gate.threshold > 0.0) {
            bail!("gate.threshold must be positive, got {}", gate.threshold);
        }
        if gate.hold_ticks == 0 {
            bail!("gate.hold_ticks must be at least 1");
        }

        let button = &self.button;
        if button.stable_polls == 0 {
            bail!("button.stable_polls must be at least 1");
        }
        if button.long_press_ms <= button.click_ms {
            bail!(
                "button.long_press_ms ({}) must exceed button.click_ms ({})",
                button.long_press_ms,
                button.click_ms
            );
        }

        if self.timing.tick_interval_ms == 0 {
            bail!("timing.tick_interval_ms must be at least 1");
        }
        Ok(())
    }
}
