//! Reconnect delay policy

use std::time::Duration;

/// Default wait between repeated reconnect attempts
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Fixed-delay retry policy
///
/// The first retry after a healthy stream fails is immediate; every further
/// consecutive failure waits the same fixed delay. There is no cap on the
/// number of attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Wait before the next attempt
    ///
    /// # Arguments
    /// * `consecutive_failures` - failures since the last received payload,
    ///   including the one that just happened
    pub fn delay_for(&self, consecutive_failures: u32) -> Duration {
        if consecutive_failures <= 1 {
            Duration::ZERO
        } else {
            self.delay
        }
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_retry_is_immediate() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::ZERO);
        assert_eq!(policy.delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_later_retries_use_fixed_delay() {
        let policy = ReconnectPolicy::new(Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(50), Duration::from_secs(2));
    }
}
