use foundation::time::Time;

/// Metadata handed to a per-frame callback.
///
/// `time` is the host's wall-clock timestamp for the frame. Animation phase is
/// derived from it rather than from `index`, so dropped frames do not slow the
/// animation down.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Frame {
    /// 0-based count of frames dispatched by the scheduler.
    pub index: u64,
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }

    pub fn next(self, dt_ms: f64) -> Self {
        Self::new(self.index + 1, self.time.add_millis(dt_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn next_advances_index_and_time() {
        let f0 = Frame::new(0, Time::from_millis(1000.0));
        let f1 = f0.next(16.0);
        assert_eq!(f1.index, 1);
        assert_eq!(f1.time, Time::from_millis(1016.0));
    }
}
