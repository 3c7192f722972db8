use std::time::Duration;

/// Waits before each scan attempt after a content load. Deferred math and
/// markup rendering usually settles within the first two.
pub const DEFAULT_SCAN_DELAYS_MS: [u64; 5] = [100, 300, 500, 1_000, 2_000];

/// Waits before re-resolving a node that was missing at activation time.
pub const DEFAULT_ACTIVATION_DELAYS_MS: [u64; 2] = [100, 250];

/// Bounded retry schedule. Attempt `n` waits `delays[n]`; once the schedule is
/// exhausted the caller gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl RetryPolicy {
    pub fn from_delays(delays: impl IntoIterator<Item = Duration>) -> Self {
        Self {
            delays: delays.into_iter().collect(),
        }
    }

    pub fn from_millis(delays: &[u64]) -> Self {
        Self::from_delays(delays.iter().copied().map(Duration::from_millis))
    }

    /// Linear backoff: `step`, `2 * step`, ... for `max_attempts` attempts.
    pub fn linear(step: Duration, max_attempts: usize) -> Self {
        Self::from_delays((1..=max_attempts).map(|n| step.saturating_mul(n as u32)))
    }

    /// Exponential backoff starting at `initial` and multiplying by `factor`.
    pub fn exponential(initial: Duration, factor: u32, max_attempts: usize) -> Self {
        let mut delays = Vec::with_capacity(max_attempts);
        let mut current = initial;
        for _ in 0..max_attempts {
            delays.push(current);
            current = current.saturating_mul(factor);
        }
        Self { delays }
    }

    pub fn none() -> Self {
        Self { delays: Vec::new() }
    }

    pub fn delay(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_millis(&DEFAULT_SCAN_DELAYS_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schedule_is_bounded() {
        let policy = RetryPolicy::from_millis(&[100, 300]);
        assert_eq!(policy.max_attempts(), 2);
        assert_eq!(policy.delay(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay(1), Some(Duration::from_millis(300)));
        assert_eq!(policy.delay(2), None);
    }

    #[test]
    fn linear_and_exponential_schedules() {
        let linear = RetryPolicy::linear(Duration::from_millis(200), 3);
        assert_eq!(
            linear.delays(),
            &[
                Duration::from_millis(200),
                Duration::from_millis(400),
                Duration::from_millis(600)
            ]
        );

        let exponential = RetryPolicy::exponential(Duration::from_millis(100), 2, 4);
        assert_eq!(exponential.delay(3), Some(Duration::from_millis(800)));
        assert_eq!(exponential.delay(4), None);
    }

    #[test]
    fn empty_policy_never_retries() {
        assert_eq!(RetryPolicy::none().delay(0), None);
    }
}
