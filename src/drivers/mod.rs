pub mod adc;
pub mod gpio;
