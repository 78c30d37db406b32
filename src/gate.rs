// MazeTimer - Photo-Gate Sensor
//
// Each gate is a phototransistor looking at an IR emitter across the maze
// boundary.  The raw reading drifts with ambient light, so a fixed level
// threshold is useless.  Instead two exponential filters run over the same
// signal: a fast one that follows a mouse-shaped dip and a slow one that
// follows the ambient baseline.  When the fast value falls more than
// `threshold` below the slow value the gate has been interrupted.

use crate::config::GateCalibration;
use crate::filters::ExpFilter;
use crate::hal::AnalogRead;
use crate::monostable::MonoStable;

// ---------------------------------------------------------------------------
// Latch
// ---------------------------------------------------------------------------

/// Edge-triggered, set-once flag.  Stays set until the consumer acknowledges
/// it, so an event raised between two reads is never lost.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Latch {
    set: bool,
}

impl Latch {
    /// Set the latch if `condition` holds.  Returns `true` only on the call
    /// that moved it from clear to set.
    pub fn observe(&mut self, condition: bool) -> bool {
        let rising = condition && !self.set;
        self.set |= condition;
        rising
    }

    #[inline]
    pub fn is_set(&self) -> bool {
        self.set
    }

    /// Clear the latch, returning whether it was set.
    pub fn acknowledge(&mut self) -> bool {
        std::mem::take(&mut self.set)
    }
}

// ---------------------------------------------------------------------------
// Gate sensor
// ---------------------------------------------------------------------------

pub struct GateSensor<A> {
    input: A,
    fast: ExpFilter,
    slow: ExpFilter,
    threshold: f32,
    level: u16,
    diff: f32,
    latch: Latch,
}

impl<A: AnalogRead> GateSensor<A> {
    /// Gate with the default calibration (fast 0.2, slow 0.02, threshold 16).
    pub fn new(input: A) -> Self {
        Self::with_calibration(input, &GateCalibration::default())
    }

    pub fn with_calibration(input: A, cal: &GateCalibration) -> Self {
        Self {
            input,
            fast: ExpFilter::new(cal.fast_alpha),
            slow: ExpFilter::new(cal.slow_alpha),
            threshold: cal.threshold,
            level: 0,
            diff: 0.0,
            latch: Latch::default(),
        }
    }

    /// Replace both filters (their running values restart from zero).
    pub fn with_filters(mut self, fast_alpha: f32, slow_alpha: f32) -> Self {
        self.fast = ExpFilter::new(fast_alpha);
        self.slow = ExpFilter::new(slow_alpha);
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Sample the input once and run the detector.
    pub fn update(&mut self) {
        let raw = self.input.read_raw();
        self.level = raw;
        self.feed(f32::from(raw));
    }

    /// Run the detector on an externally acquired sample.
    pub fn feed(&mut self, sample: f32) {
        let fast = self.fast.update(sample);
        let slow = self.slow.update(sample);
        self.diff = fast - slow;
        self.latch.observe(self.diff < -self.threshold);
    }

    /// True once a crossing has been seen since the last `reset()`.
    #[inline]
    pub fn interrupted(&self) -> bool {
        self.latch.is_set()
    }

    /// Acknowledge the crossing so the gate can fire again.
    pub fn reset(&mut self) -> bool {
        self.latch.acknowledge()
    }

    /// Fast-filtered signal, for calibration displays.
    pub fn input(&self) -> f32 {
        self.fast.value()
    }

    /// Slow-filtered ambient baseline.
    pub fn baseline(&self) -> f32 {
        self.slow.value()
    }

    /// Last raw ADC reading taken by `update()`.
    pub fn level(&self) -> u16 {
        self.level
    }

    pub fn diff(&self) -> f32 {
        self.diff
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Ticks the baseline filter needs to follow 99% of an ambient step.
    pub fn settling_ticks(&self) -> u32 {
        self.slow.settling_samples(0.99)
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }
}

// ---------------------------------------------------------------------------
// Gate channel: sensor + trigger pulse
// ---------------------------------------------------------------------------

/// A gate sensor whose crossings are stretched into a clean trigger pulse.
///
/// Each crossing is acknowledged on the tick it is seen and arms a
/// [`MonoStable`]; the pulse holdoff swallows the repeated crossings a single
/// mouse produces while it sits in the beam.
pub struct GateChannel<A> {
    sensor: GateSensor<A>,
    pulse: MonoStable,
    triggered: bool,
}

impl<A: AnalogRead> GateChannel<A> {
    pub fn new(input: A, cal: &GateCalibration) -> Self {
        Self {
            sensor: GateSensor::with_calibration(input, cal),
            pulse: MonoStable::new(cal.hold_ticks),
            triggered: false,
        }
    }

    /// Advance one tick.  Returns the new trigger level when it changes.
    pub fn update(&mut self) -> Option<bool> {
        self.pulse.update();
        self.sensor.update();
        // Crossings inside the hold window or its decay tail are absorbed.
        if self.sensor.reset() && self.pulse.ready() {
            self.pulse.start();
        }

        let triggered = self.pulse.state();
        if triggered == self.triggered {
            return None;
        }
        self.triggered = triggered;
        Some(triggered)
    }

    #[inline]
    pub fn triggered(&self) -> bool {
        self.triggered
    }

    pub fn sensor(&self) -> &GateSensor<A> {
        &self.sensor
    }

    pub fn sensor_mut(&mut self) -> &mut GateSensor<A> {
        &mut self.sensor
    }
}
