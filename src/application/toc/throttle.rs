use std::time::Duration;

use tokio::time::Instant;

/// Outcome of offering a scroll notification to the throttle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    /// Handle the notification now.
    RunNow,
    /// Schedule one trailing run after the given wait.
    Defer(Duration),
    /// A trailing run is already scheduled; drop this notification.
    Coalesced,
}

/// Leading and trailing edge throttle for scroll notifications.
#[derive(Debug, Clone)]
pub struct ScrollThrottle {
    interval: Duration,
    last_run: Option<Instant>,
    trailing_pending: bool,
}

impl ScrollThrottle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_run: None,
            trailing_pending: false,
        }
    }

    pub fn admit(&mut self, now: Instant) -> ThrottleDecision {
        if self.trailing_pending {
            return ThrottleDecision::Coalesced;
        }

        match self.last_run {
            Some(last) if now.saturating_duration_since(last) < self.interval => {
                self.trailing_pending = true;
                let elapsed = now.saturating_duration_since(last);
                ThrottleDecision::Defer(self.interval - elapsed)
            }
            _ => {
                self.last_run = Some(now);
                ThrottleDecision::RunNow
            }
        }
    }

    /// Record the trailing run scheduled by a previous [`ThrottleDecision::Defer`].
    pub fn flush(&mut self, now: Instant) {
        self.trailing_pending = false;
        self.last_run = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_run = None;
        self.trailing_pending = false;
    }
}
