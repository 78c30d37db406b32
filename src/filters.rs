// MazeTimer - Exponential Filter
//
// Single-pole low-pass filter: value += alpha * (sample - value).

/// Exponentially weighted running average.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExpFilter {
    alpha: f32,
    value: f32,
}

impl ExpFilter {
    /// Create a filter starting at zero.
    ///
    /// # Panics
    /// If `alpha` is not in `(0, 1]`.  Calibration values are range-checked by
    /// [`crate::config::Calibration::validate`] before any filter is built.
    pub fn new(alpha: f32) -> Self {
        Self::with_value(alpha, 0.0)
    }

    /// Create a filter seeded with an initial value.
    pub fn with_value(alpha: f32, value: f32) -> Self {
        assert!(
            alpha > 0.0 && alpha <= 1.0,
            "filter alpha must be in (0, 1], got {alpha}"
        );
        Self { alpha, value }
    }

    /// Fold in a new sample and return the smoothed value.
    #[inline]
    pub fn update(&mut self, sample: f32) -> f32 {
        self.value += self.alpha * (sample - self.value);
        self.value
    }

    #[inline]
    pub fn value(&self) -> f32 {
        self.value
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Number of samples a step input needs before the filter has covered
    /// `fraction` of the step (0.99 -> "n samples to 99%").
    pub fn settling_samples(&self, fraction: f32) -> u32 {
        if self.alpha >= 1.0 || fraction <= 0.0 {
            return 1;
        }
        let remaining = (1.0 - fraction.min(0.999_999)).ln();
        (remaining / (1.0 - self.alpha).ln()).ceil() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn output_stays_between_previous_value_and_sample() {
        let mut f = ExpFilter::with_value(0.3, 200.0);
        let samples = [500.0, 100.0, 100.0, 812.0, -40.0, 0.0, 1023.0, 512.0];
        for s in samples {
            let prev = f.value();
            let out = f.update(s);
            let (lo, hi) = if prev <= s { (prev, s) } else { (s, prev) };
            assert!(out >= lo && out <= hi, "{out} not in [{lo}, {hi}]");
        }
    }

    #[rstest]
    #[case(0.2)]
    #[case(0.02)]
    #[case(0.5)]
    fn converges_within_settling_bound(#[case] alpha: f32) {
        let mut f = ExpFilter::new(alpha);
        let n = f.settling_samples(0.99);
        for _ in 0..n {
            f.update(500.0);
        }
        assert!(f.value() >= 494.0, "alpha {alpha}: {}", f.value());
    }

    #[rstest]
    #[case(0.2, 21)]
    #[case(0.02, 228)]
    #[case(1.0, 1)]
    fn settling_samples_to_99_percent(#[case] alpha: f32, #[case] expected: u32) {
        assert_eq!(ExpFilter::new(alpha).settling_samples(0.99), expected);
    }

    #[test]
    fn unit_alpha_tracks_input_exactly() {
        let mut f = ExpFilter::new(1.0);
        assert_eq!(f.update(42.0), 42.0);
        assert_eq!(f.update(7.0), 7.0);
    }

    #[test]
    fn value_does_not_mutate() {
        let mut f = ExpFilter::new(0.5);
        f.update(10.0);
        assert_eq!(f.value(), 5.0);
        assert_eq!(f.value(), 5.0);
    }

    #[rstest]
    #[case(0.0)]
    #[case(-0.1)]
    #[case(1.5)]
    #[should_panic(expected = "filter alpha")]
    fn rejects_alpha_outside_unit_interval(#[case] alpha: f32) {
        let _ = ExpFilter::new(alpha);
    }
}
