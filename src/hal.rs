// MazeTimer - Pin & Delay Abstractions
//
// The timing core only ever needs "read a level", "read an ADC count" and
// "wait a few milliseconds".  Device drivers implement these on ESP-IDF; the
// simulated pin and delays below cover tests and trace replay on the host.

use std::cell::Cell;
use std::rc::Rc;
use std::thread;
use std::time::Duration;

/// Digital input: `true` when the pin reads HIGH.
pub trait DigitalRead {
    fn read_level(&mut self) -> bool;
}

/// Analog input: raw ADC count.
pub trait AnalogRead {
    fn read_raw(&mut self) -> u16;
}

impl<T: DigitalRead + ?Sized> DigitalRead for Box<T> {
    fn read_level(&mut self) -> bool {
        (**self).read_level()
    }
}

impl<T: AnalogRead + ?Sized> AnalogRead for Box<T> {
    fn read_raw(&mut self) -> u16 {
        (**self).read_raw()
    }
}

/// Blocking millisecond delay.
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
}

/// Delay backed by `std::thread::sleep` (FreeRTOS task delay on ESP-IDF).
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadDelay;

impl Delay for ThreadDelay {
    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }
}

/// Delay that returns immediately (replay output, tests).
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelay;

impl Delay for NoDelay {
    fn delay_ms(&mut self, _ms: u32) {}
}

// ---------------------------------------------------------------------------
// Simulated pin
// ---------------------------------------------------------------------------

/// Full ADC scale of the simulated pin (10-bit, like the Nano-based rig).
pub const SIM_ADC_MAX: u16 = 1023;

/// Shared-value input pin.  One clone is handed to a sensor or button, the
/// other is kept by the test or replay driver to set the level.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPin {
    raw: Rc<Cell<u16>>,
}

impl SimulatedPin {
    pub fn new(raw: u16) -> Self {
        Self {
            raw: Rc::new(Cell::new(raw)),
        }
    }

    /// Set an analog reading.
    pub fn set_raw(&self, raw: u16) {
        self.raw.set(raw);
    }

    /// Drive the pin to a logic level (full scale / ground).
    pub fn set_level(&self, high: bool) {
        self.raw.set(if high { SIM_ADC_MAX } else { 0 });
    }
}

impl AnalogRead for SimulatedPin {
    fn read_raw(&mut self) -> u16 {
        self.raw.get()
    }
}

impl DigitalRead for SimulatedPin {
    fn read_level(&mut self) -> bool {
        self.raw.get() > SIM_ADC_MAX / 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_pin_clones_share_level() {
        let driver = SimulatedPin::new(0);
        let mut pin = driver.clone();
        assert!(!pin.read_level());
        driver.set_level(true);
        assert!(pin.read_level());
        assert_eq!(pin.read_raw(), SIM_ADC_MAX);
        driver.set_raw(300);
        assert!(!pin.read_level());
        assert_eq!(pin.read_raw(), 300);
    }

    #[test]
    fn boxed_inputs_forward() {
        let driver = SimulatedPin::new(700);
        let mut boxed: Box<dyn AnalogRead> = Box::new(driver.clone());
        assert_eq!(boxed.read_raw(), 700);
        let mut level: Box<dyn DigitalRead> = Box::new(driver);
        assert!(level.read_level());
    }
}
