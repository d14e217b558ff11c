/// Wall-clock timestamp in milliseconds, as reported by the host
/// (`performance.now()` in the browser).
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd, Default)]
pub struct Time(pub f64);

impl Time {
    pub const ZERO: Time = Time(0.0);

    pub fn from_millis(ms: f64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> f64 {
        self.0
    }

    /// Milliseconds elapsed since `earlier`, clamped at zero so a host clock
    /// that steps backwards never yields a negative phase.
    pub fn elapsed_since(self, earlier: Time) -> f64 {
        (self.0 - earlier.0).max(0.0)
    }

    pub fn add_millis(self, ms: f64) -> Self {
        Self(self.0 + ms)
    }
}

#[cfg(test)]
mod tests {
    use super::Time;

    #[test]
    fn elapsed_is_never_negative() {
        let t0 = Time::from_millis(100.0);
        assert_eq!(Time::from_millis(250.0).elapsed_since(t0), 150.0);
        assert_eq!(Time::from_millis(50.0).elapsed_since(t0), 0.0);
    }
}
