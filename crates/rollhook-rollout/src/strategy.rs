//! Rollout timing and cleanup policy.

use std::time::Duration;

/// Cadence and bounds of a rolling replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolloutTiming {
    /// Pause between successive scale steps.
    pub update_period: Duration,
    /// How often to re-check the acceptance predicate.
    pub interval: Duration,
    /// Bound on the whole roll, from creation of the new controller.
    pub timeout: Duration,
}

impl Default for RolloutTiming {
    fn default() -> Self {
        Self {
            update_period: Duration::from_secs(3),
            interval: Duration::from_secs(3),
            timeout: Duration::from_secs(5 * 60),
        }
    }
}

impl RolloutTiming {
    pub fn from_secs(update_period: u64, interval: u64, timeout: u64) -> Self {
        Self {
            update_period: Duration::from_secs(update_period),
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        }
    }
}

/// What to do with the two controllers after a successful roll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CleanupPolicy {
    /// Delete the old controller and give the new one its name.
    #[default]
    Rename,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timing() {
        let t = RolloutTiming::default();
        assert_eq!(t.update_period, Duration::from_secs(3));
        assert_eq!(t.interval, Duration::from_secs(3));
        assert_eq!(t.timeout, Duration::from_secs(300));
        assert_eq!(RolloutTiming::from_secs(3, 3, 300), t);
    }
}
