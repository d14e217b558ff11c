use serde::{Deserialize, Serialize};

/// Fixed-delay retry with a hard attempt cap.
///
/// Used for waiting on host readiness signals that cannot be awaited
/// directly. Once `max_attempts` checks have failed the caller must treat the
/// dependency as unavailable instead of rescheduling again.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub delay_ms: f64,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay_ms: 250.0,
            max_attempts: 12,
        }
    }
}

/// What to do after a failed check.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum RetryDecision {
    /// Check again after `delay_ms`; `attempt` is the 1-based number of the
    /// next check.
    RetryAfter { delay_ms: f64, attempt: u32 },
    GiveUp { attempts: u32 },
}

impl RetryPolicy {
    pub fn new(delay_ms: f64, max_attempts: u32) -> Self {
        Self {
            delay_ms,
            max_attempts,
        }
    }

    /// Decision after check number `attempt` (1-based) failed.
    pub fn after_failure(&self, attempt: u32) -> RetryDecision {
        if attempt >= self.max_attempts {
            return RetryDecision::GiveUp { attempts: attempt };
        }
        RetryDecision::RetryAfter {
            delay_ms: self.delay_ms.max(0.0),
            attempt: attempt + 1,
        }
    }

    /// Upper bound on the time spent waiting before giving up.
    pub fn max_wait_ms(&self) -> f64 {
        self.delay_ms.max(0.0) * f64::from(self.max_attempts.saturating_sub(1))
    }
}
