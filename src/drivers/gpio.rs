// MazeTimer - Button GPIO Driver

use esp_idf_hal::gpio::{AnyIOPin, Input, PinDriver, Pull};
use mazetimer::hal::DigitalRead;

/// Input pin with the internal pull-up enabled (buttons switch to ground).
pub struct GpioInput {
    pin: PinDriver<'static, AnyIOPin, Input>,
}

impl GpioInput {
    pub fn pull_up(pin: AnyIOPin) -> anyhow::Result<Self> {
        let mut pin = PinDriver::input(pin)?;
        pin.set_pull(Pull::Up)?;
        Ok(Self { pin })
    }
}

impl DigitalRead for GpioInput {
    fn read_level(&mut self) -> bool {
        self.pin.is_high()
    }
}
