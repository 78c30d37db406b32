// MazeTimer - Button Input
//
// Operator buttons (arm / start / goal / reset).  Polled once per timing-loop
// tick; turns a raw pin level into press, click and long-press gestures.
//
// Some of the rig's button pins are analog-only inputs, so a button can sense
// its pin either digitally or by comparing an ADC reading against the
// mid-scale point.

use crate::clock::{elapsed_ms, Clock};
use crate::config::{ButtonCalibration, BUTTON_CLICK_MS, BUTTON_LONG_PRESS_MS};
use crate::events::ButtonEvent;
use crate::hal::{AnalogRead, DigitalRead};

// ---------------------------------------------------------------------------
// Level sources
// ---------------------------------------------------------------------------

/// How a button pin is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Digital,
    Analog,
}

/// Which electrical level means "pressed".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

/// A pin reduced to a logic level.
pub trait LevelSource {
    /// `true` when the pin is at a HIGH level.
    fn read_high(&mut self) -> bool;
    fn sense(&self) -> Sense;
}

impl<T: LevelSource + ?Sized> LevelSource for Box<T> {
    fn read_high(&mut self) -> bool {
        (**self).read_high()
    }

    fn sense(&self) -> Sense {
        (**self).sense()
    }
}

/// Pin read as a digital input.
pub struct DigitalSense<P>(pub P);

impl<P: DigitalRead> LevelSource for DigitalSense<P> {
    fn read_high(&mut self) -> bool {
        self.0.read_level()
    }

    fn sense(&self) -> Sense {
        Sense::Digital
    }
}

/// Pin read through the ADC; readings below `midpoint` count as LOW.
pub struct AnalogSense<P> {
    pin: P,
    midpoint: u16,
}

impl<P: AnalogRead> AnalogSense<P> {
    pub fn new(pin: P, midpoint: u16) -> Self {
        Self { pin, midpoint }
    }
}

impl<P: AnalogRead> LevelSource for AnalogSense<P> {
    fn read_high(&mut self) -> bool {
        self.pin.read_raw() >= self.midpoint
    }

    fn sense(&self) -> Sense {
        Sense::Analog
    }
}

// ---------------------------------------------------------------------------
// Basic button: debounced logical state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Inactive,
    Active,
}

/// Debounced state change reported by [`BasicButton::update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Edge {
    Pressed,
    Released,
}

pub struct BasicButton<S> {
    source: S,
    polarity: Polarity,
    state: State,
    /// Consecutive samples that must disagree with `state` before it flips.
    stable_polls: u8,
    disagree: u8,
}

impl<S: LevelSource> BasicButton<S> {
    pub fn new(source: S, polarity: Polarity) -> Self {
        Self {
            source,
            polarity,
            state: State::Inactive,
            stable_polls: 1,
            disagree: 0,
        }
    }

    pub fn with_stable_polls(mut self, polls: u8) -> Self {
        self.stable_polls = polls.max(1);
        self
    }

    /// Raw, undebounced "is the button held right now".
    pub fn is_active(&mut self) -> bool {
        let high = self.source.read_high();
        match self.polarity {
            Polarity::ActiveHigh => high,
            Polarity::ActiveLow => !high,
        }
    }

    /// Sample once; returns an edge when the debounced state flips.
    pub fn update(&mut self) -> Option<Edge> {
        let sampled = if self.is_active() {
            State::Active
        } else {
            State::Inactive
        };

        if sampled == self.state {
            self.disagree = 0;
            return None;
        }

        self.disagree += 1;
        if self.disagree < self.stable_polls {
            return None;
        }

        self.disagree = 0;
        self.state = sampled;
        Some(match sampled {
            State::Active => Edge::Pressed,
            State::Inactive => Edge::Released,
        })
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.state == State::Active
    }

    #[inline]
    pub fn state(&self) -> State {
        self.state
    }

    pub fn sense(&self) -> Sense {
        self.source.sense()
    }

    pub fn polarity(&self) -> Polarity {
        self.polarity
    }
}

// ---------------------------------------------------------------------------
// Gesture button
// ---------------------------------------------------------------------------

pub type Handler = Box<dyn FnMut()>;

fn no_op() -> Handler {
    Box::new(|| {})
}

/// Button with press / click / long-press detection and callbacks.
///
/// A click is a release within `click_ms` of the press; a long press fires
/// once per press after the button has been held longer than
/// `long_press_ms`.  A press that produced a long press never also clicks.
pub struct Button<S, C> {
    inner: BasicButton<S>,
    clock: C,
    press_start_ms: Option<u32>,
    hold_event_fired: bool,
    click_ms: u32,
    long_press_ms: u32,
    on_press: Handler,
    on_click: Handler,
    on_long_press: Handler,
}

impl<S: LevelSource, C: Clock> Button<S, C> {
    pub fn new(source: S, polarity: Polarity, clock: C) -> Self {
        Self {
            inner: BasicButton::new(source, polarity),
            clock,
            press_start_ms: None,
            hold_event_fired: true,
            click_ms: BUTTON_CLICK_MS,
            long_press_ms: BUTTON_LONG_PRESS_MS,
            on_press: no_op(),
            on_click: no_op(),
            on_long_press: no_op(),
        }
    }

    pub fn with_calibration(
        source: S,
        polarity: Polarity,
        clock: C,
        cal: &ButtonCalibration,
    ) -> Self {
        let mut button = Self::new(source, polarity, clock);
        button.inner = button.inner.with_stable_polls(cal.stable_polls);
        button.click_ms = cal.click_ms;
        button.long_press_ms = cal.long_press_ms;
        button
    }

    /// Poll the pin once.  Fires at most one callback and returns the same
    /// event.
    pub fn update(&mut self) -> Option<ButtonEvent> {
        let now = self.clock.now_ms();
        let event = match self.inner.update() {
            Some(Edge::Pressed) => {
                self.press_start_ms = Some(now);
                self.hold_event_fired = false;
                Some(ButtonEvent::Press)
            }
            Some(Edge::Released) => {
                let clicked = self
                    .press_start_ms
                    .take()
                    .map(|start| elapsed_ms(now, start) < self.click_ms)
                    .unwrap_or(false);
                (clicked && !self.hold_event_fired).then_some(ButtonEvent::Click)
            }
            None => match self.press_start_ms {
                Some(start)
                    if !self.hold_event_fired
                        && elapsed_ms(now, start) > self.long_press_ms =>
                {
                    self.hold_event_fired = true;
                    Some(ButtonEvent::LongPress)
                }
                _ => None,
            },
        };

        match event {
            Some(ButtonEvent::Press) => (self.on_press)(),
            Some(ButtonEvent::Click) => (self.on_click)(),
            Some(ButtonEvent::LongPress) => (self.on_long_press)(),
            None => {}
        }
        event
    }

    #[inline]
    pub fn is_pressed(&self) -> bool {
        self.inner.is_pressed()
    }

    /// Hold time for the long press.  Read on every poll, so it also applies
    /// to a press already in progress.
    pub fn set_long_press_time(&mut self, ms: u32) {
        self.long_press_ms = ms;
    }

    pub fn long_press_time(&self) -> u32 {
        self.long_press_ms
    }

    pub fn on_press(&mut self, handler: impl FnMut() + 'static) {
        self.on_press = Box::new(handler);
    }

    pub fn on_click(&mut self, handler: impl FnMut() + 'static) {
        self.on_click = Box::new(handler);
    }

    pub fn on_long_press(&mut self, handler: impl FnMut() + 'static) {
        self.on_long_press = Box::new(handler);
    }

    pub fn sense(&self) -> Sense {
        self.inner.sense()
    }
}

impl<P: DigitalRead, C: Clock> Button<DigitalSense<P>, C> {
    pub fn digital(pin: P, polarity: Polarity, clock: C) -> Self {
        Self::new(DigitalSense(pin), polarity, clock)
    }
}

impl<P: AnalogRead, C: Clock> Button<AnalogSense<P>, C> {
    pub fn analog(pin: P, midpoint: u16, polarity: Polarity, clock: C) -> Self {
        Self::new(AnalogSense::new(pin, midpoint), polarity, clock)
    }

    /// Analog-sensed button with timings and midpoint from the calibration.
    pub fn analog_with_calibration(
        pin: P,
        polarity: Polarity,
        clock: C,
        cal: &ButtonCalibration,
    ) -> Self {
        let source = AnalogSense::new(pin, cal.analog_midpoint);
        Self::with_calibration(source, polarity, clock, cal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::hal::SimulatedPin;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<ButtonEvent>>>;

    type TestButton = Button<DigitalSense<SimulatedPin>, ManualClock>;

    fn button() -> (SimulatedPin, ManualClock, TestButton, Log) {
        let pin = SimulatedPin::new(0);
        pin.set_level(true); // pull-up, released
        let clock = ManualClock::new(1_000);
        let mut b = Button::digital(pin.clone(), Polarity::ActiveLow, clock.clone());
        let log: Log = Rc::default();
        let l = log.clone();
        b.on_press(move || l.borrow_mut().push(ButtonEvent::Press));
        let l = log.clone();
        b.on_click(move || l.borrow_mut().push(ButtonEvent::Click));
        let l = log.clone();
        b.on_long_press(move || l.borrow_mut().push(ButtonEvent::LongPress));
        (pin, clock, b, log)
    }

    /// Poll every millisecond for `ms` milliseconds.
    fn hold(clock: &ManualClock, b: &mut TestButton, ms: u32) {
        for _ in 0..ms {
            clock.advance(1);
            b.update();
        }
    }

    #[test]
    fn short_tap_is_press_then_click() {
        let (pin, clock, mut b, log) = button();
        b.update();
        pin.set_level(false);
        assert_eq!(b.update(), Some(ButtonEvent::Press));
        assert!(b.is_pressed());
        hold(&clock, &mut b, 50);
        pin.set_level(true);
        assert_eq!(b.update(), Some(ButtonEvent::Click));
        assert!(!b.is_pressed());
        assert_eq!(*log.borrow(), vec![ButtonEvent::Press, ButtonEvent::Click]);
    }

    #[test]
    fn long_hold_fires_long_press_exactly_once() {
        let (pin, clock, mut b, log) = button();
        pin.set_level(false);
        b.update();
        hold(&clock, &mut b, 5_000);
        pin.set_level(true);
        clock.advance(1);
        assert_eq!(b.update(), None);
        assert_eq!(*log.borrow(), vec![ButtonEvent::Press, ButtonEvent::LongPress]);
    }

    #[test]
    fn long_press_waits_for_threshold() {
        let (pin, clock, mut b, _log) = button();
        pin.set_level(false);
        b.update();
        clock.advance(1_500);
        assert_eq!(b.update(), None);
        clock.advance(1);
        assert_eq!(b.update(), Some(ButtonEvent::LongPress));
    }

    #[test]
    fn medium_press_is_neither_click_nor_long_press() {
        let (pin, clock, mut b, log) = button();
        pin.set_level(false);
        b.update();
        hold(&clock, &mut b, 800);
        pin.set_level(true);
        b.update();
        assert_eq!(*log.borrow(), vec![ButtonEvent::Press]);
    }

    #[test]
    fn click_and_long_press_stay_exclusive_with_short_hold_time() {
        let (pin, clock, mut b, log) = button();
        b.set_long_press_time(100);
        pin.set_level(false);
        b.update();
        hold(&clock, &mut b, 200);
        pin.set_level(true);
        b.update();
        assert_eq!(*log.borrow(), vec![ButtonEvent::Press, ButtonEvent::LongPress]);
    }

    #[test]
    fn long_press_time_change_applies_to_current_press() {
        let (pin, clock, mut b, _log) = button();
        pin.set_level(false);
        b.update();
        clock.advance(600);
        assert_eq!(b.update(), None);
        b.set_long_press_time(500);
        clock.advance(1);
        assert_eq!(b.update(), Some(ButtonEvent::LongPress));
    }

    #[test]
    fn second_press_can_long_press_again() {
        let (pin, clock, mut b, log) = button();
        for _ in 0..2 {
            pin.set_level(false);
            b.update();
            hold(&clock, &mut b, 2_000);
            pin.set_level(true);
            b.update();
        }
        let long_presses = log
            .borrow()
            .iter()
            .filter(|e| **e == ButtonEvent::LongPress)
            .count();
        assert_eq!(long_presses, 2);
    }

    #[test]
    fn unregistered_handlers_are_no_ops() {
        let pin = SimulatedPin::new(0);
        let clock = ManualClock::new(0);
        let mut b = Button::digital(pin.clone(), Polarity::ActiveHigh, clock.clone());
        pin.set_level(true);
        assert_eq!(b.update(), Some(ButtonEvent::Press));
        clock.advance(10);
        pin.set_level(false);
        assert_eq!(b.update(), Some(ButtonEvent::Click));
    }

    #[test]
    fn click_measured_across_clock_wrap() {
        let pin = SimulatedPin::new(1023);
        let clock = ManualClock::new(u32::MAX - 20);
        let mut b = Button::digital(pin.clone(), Polarity::ActiveLow, clock.clone());
        pin.set_level(false);
        assert_eq!(b.update(), Some(ButtonEvent::Press));
        clock.advance(120);
        pin.set_level(true);
        assert_eq!(b.update(), Some(ButtonEvent::Click));
    }

    #[test]
    fn analog_sense_uses_midpoint_and_polarity() {
        let pin = SimulatedPin::new(900);
        let clock = ManualClock::new(0);
        let mut b = Button::analog(pin.clone(), 512, Polarity::ActiveLow, clock);
        assert_eq!(b.sense(), Sense::Analog);
        assert_eq!(b.update(), None);
        pin.set_raw(511);
        assert_eq!(b.update(), Some(ButtonEvent::Press));
        pin.set_raw(512);
        assert_eq!(b.update(), Some(ButtonEvent::Click));
    }

    #[test]
    fn calibrated_analog_button_follows_midpoint_override() {
        let toml = "[button]\nanalog_midpoint = 300\n";
        let cal = crate::config::Calibration::from_toml_str(toml).unwrap().button;
        let pin = SimulatedPin::new(900);
        let clock = ManualClock::new(0);
        let mut b = Button::analog_with_calibration(pin.clone(), Polarity::ActiveLow, clock, &cal);
        assert_eq!(b.update(), None);
        // Below the default mid-scale but still above the calibrated midpoint.
        pin.set_raw(400);
        assert_eq!(b.update(), None);
        pin.set_raw(299);
        assert_eq!(b.update(), Some(ButtonEvent::Press));
        pin.set_raw(300);
        assert_eq!(b.update(), Some(ButtonEvent::Click));
    }

    #[test]
    fn basic_button_requires_stable_polls() {
        let pin = SimulatedPin::new(0);
        let mut b =
            BasicButton::new(DigitalSense(pin.clone()), Polarity::ActiveHigh).with_stable_polls(3);
        pin.set_level(true);
        assert_eq!(b.update(), None);
        pin.set_level(false);
        assert_eq!(b.update(), None);
        pin.set_level(true);
        assert_eq!(b.update(), None);
        assert_eq!(b.update(), None);
        assert_eq!(b.update(), Some(Edge::Pressed));
        assert!(b.is_pressed());
        assert_eq!(b.sense(), Sense::Digital);
    }
}
