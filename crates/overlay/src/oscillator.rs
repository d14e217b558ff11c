use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// `(1 - cos(πx)) / 2`: 0 at x = 0, 1 at x = 1, flat at both ends.
pub fn ease_in_out_sine(x: f64) -> f64 {
    (1.0 - (PI * x).cos()) * 0.5
}

/// Eased oscillation between `min` and `max`.
///
/// The phase is mirrored so the value rises over the first half period and
/// falls over the second: `min` at `t = 0`, `max` at `t = period / 2`, and no
/// jump at period boundaries.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Oscillation {
    pub period_ms: f64,
    pub min: f64,
    pub max: f64,
}

impl Oscillation {
    pub const fn new(period_ms: f64, min: f64, max: f64) -> Self {
        Self { period_ms, min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.period_ms.is_finite()
            && self.period_ms > 0.0
            && self.min.is_finite()
            && self.max.is_finite()
            && self.min <= self.max
    }

    /// Value `elapsed_ms` after the oscillation started.
    pub fn value_at(&self, elapsed_ms: f64) -> f64 {
        if !self.is_valid() || !elapsed_ms.is_finite() {
            return self.min;
        }
        let phase = elapsed_ms.rem_euclid(self.period_ms) / self.period_ms;
        let x = if phase <= 0.5 { phase * 2.0 } else { (1.0 - phase) * 2.0 };
        self.min + (self.max - self.min) * ease_in_out_sine(x)
    }
}
