//! Heading synchronizer state machine.
//!
//! The synchronizer never sleeps or spawns. Operations take the current time
//! and return the timers the caller has to arm; when a timer elapses the
//! caller hands it back through [`HeadingSynchronizer::fire`]. Every timer
//! carries the [`Epoch`] it was issued in, and timers from an older epoch are
//! discarded on delivery. That is how pending scan retries and suppression
//! windows die when the content changes.

use std::time::Duration;

use metrics::counter;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::TocSettings;
use crate::domain::headings::{HeadingLevel, NavigationState};

use super::retry::{DEFAULT_ACTIVATION_DELAYS_MS, RetryPolicy};
use super::scan::scan_headings;
use super::surface::{DocumentSurface, ScrollBehavior};
use super::throttle::{ScrollThrottle, ThrottleDecision};
use super::tracker::{TrackPolicy, select_current};
use super::{METRIC_ACTIVATION_MISS, METRIC_SCAN_ATTEMPTS, METRIC_SCAN_EXHAUSTED};

const DEFAULT_HEADER_OFFSET_PX: f64 = 80.0;
const DEFAULT_SUPPRESSION_WINDOW: Duration = Duration::from_millis(1_000);
const DEFAULT_SCROLL_THROTTLE: Duration = Duration::from_millis(16);

/// Tunables for one synchronizer instance.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncPolicy {
    pub max_level: HeadingLevel,
    pub track: TrackPolicy,
    /// Height of the fixed header that programmatic scrolls must clear.
    pub header_offset_px: f64,
    pub suppression_window: Duration,
    pub scroll_throttle: Duration,
    pub scan_retry: RetryPolicy,
    pub activation_retry: RetryPolicy,
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            max_level: HeadingLevel::DEEPEST,
            track: TrackPolicy::default(),
            header_offset_px: DEFAULT_HEADER_OFFSET_PX,
            suppression_window: DEFAULT_SUPPRESSION_WINDOW,
            scroll_throttle: DEFAULT_SCROLL_THROTTLE,
            scan_retry: RetryPolicy::default(),
            activation_retry: RetryPolicy::from_millis(&DEFAULT_ACTIVATION_DELAYS_MS),
        }
    }
}

impl From<&TocSettings> for SyncPolicy {
    fn from(settings: &TocSettings) -> Self {
        Self {
            max_level: settings.max_level,
            track: TrackPolicy {
                threshold_ratio: settings.threshold_ratio,
                bottom_tolerance_px: settings.bottom_tolerance_px,
            },
            header_offset_px: settings.header_offset_px,
            suppression_window: settings.suppression_window,
            scroll_throttle: settings.scroll_throttle,
            scan_retry: RetryPolicy::from_delays(settings.scan_delays.iter().copied()),
            activation_retry: RetryPolicy::from_delays(settings.activation_delays.iter().copied()),
        }
    }
}

/// Content generation counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Epoch(u64);

impl Epoch {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Idle,
    Scanning { attempt: usize },
    Ready,
    Suppressed { target: String, until: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    Scan { attempt: usize },
    ScrollFlush,
    SuppressionEnd { token: u64 },
    ActivationRetry { id: String, attempt: usize, token: u64 },
}

/// A delayed callback requested by the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timer {
    pub epoch: Epoch,
    pub delay: Duration,
    pub kind: TimerKind,
}

pub struct HeadingSynchronizer<S> {
    surface: S,
    policy: SyncPolicy,
    state: NavigationState,
    status: SyncStatus,
    epoch: Epoch,
    throttle: ScrollThrottle,
    suppression_token: u64,
    activation_token: u64,
}

impl<S> HeadingSynchronizer<S>
where
    S: DocumentSurface,
{
    pub fn new(surface: S, policy: SyncPolicy) -> Self {
        let throttle = ScrollThrottle::new(policy.scroll_throttle);
        Self {
            surface,
            policy,
            state: NavigationState::default(),
            status: SyncStatus::Idle,
            epoch: Epoch::default(),
            throttle,
            suppression_token: 0,
            activation_token: 0,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn status(&self) -> &SyncStatus {
        &self.status
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn policy(&self) -> &SyncPolicy {
        &self.policy
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Forget everything about the previous content and start scanning anew.
    pub fn content_changed(&mut self, now: Instant) -> Vec<Timer> {
        self.epoch = self.epoch.next();
        self.state.clear();
        self.throttle.reset();
        self.status = SyncStatus::Scanning { attempt: 0 };

        debug!(
            target = "application::toc",
            epoch = self.epoch.get(),
            "content changed"
        );

        match self.policy.scan_retry.delay(0) {
            Some(delay) => vec![self.timer(delay, TimerKind::Scan { attempt: 0 })],
            None => self.scan_attempt(0, now),
        }
    }

    /// Scan the mounted content once, replacing the navigation state.
    ///
    /// Each heading node gets its `heading-<n>` id written as a side effect.
    /// The current pointer is cleared. Surface failures degrade to an empty
    /// state. Finding headings leaves the synchronizer `Ready`.
    pub fn scan(&mut self) -> &NavigationState {
        self.rescan();
        if !self.state.is_empty() {
            self.status = SyncStatus::Ready;
        }
        &self.state
    }

    fn rescan(&mut self) {
        let entries = match scan_headings(&mut self.surface, self.policy.max_level) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    target = "application::toc",
                    error = %err,
                    "heading scan failed"
                );
                Vec::new()
            }
        };
        self.state = NavigationState::new(entries);
        self.activation_token = self.activation_token.wrapping_add(1);
    }

    /// Handle a scroll notification, subject to the throttle.
    pub fn scrolled(&mut self, now: Instant) -> Vec<Timer> {
        if self.state.is_empty() {
            return Vec::new();
        }

        match self.throttle.admit(now) {
            ThrottleDecision::RunNow => {
                self.track_scroll(now);
                Vec::new()
            }
            ThrottleDecision::Defer(delay) => vec![self.timer(delay, TimerKind::ScrollFlush)],
            ThrottleDecision::Coalesced => Vec::new(),
        }
    }

    /// Recompute the current entry from the surface geometry. Returns whether
    /// the current id changed.
    pub fn track_scroll(&mut self, now: Instant) -> bool {
        if self.state.is_empty() {
            return false;
        }

        if let SyncStatus::Suppressed { until, .. } = &self.status {
            if now < *until {
                return false;
            }
            self.status = SyncStatus::Ready;
        }

        let tops = self
            .state
            .entries()
            .iter()
            .map(|entry| self.surface.rect_top(entry.node).ok())
            .collect::<Vec<_>>();
        let viewport = self.surface.viewport();

        let next = select_current(&tops, &viewport, &self.policy.track)
            .and_then(|index| self.state.entries().get(index))
            .map(|entry| entry.id.clone());

        match self.state.set_current(next.as_deref()) {
            Ok(changed) => changed,
            Err(err) => {
                warn!(target = "application::toc", error = %err, "tracking produced unknown entry");
                false
            }
        }
    }

    /// Scroll to the entry `id` and mark it current right away, muting scroll
    /// tracking for the suppression window.
    ///
    /// Unknown ids are ignored. A known id whose node is missing is retried on
    /// the activation schedule before giving up silently. A newer activation
    /// cancels the retries of an older one.
    pub fn activate(&mut self, id: &str, now: Instant) -> Vec<Timer> {
        if self.state.entry(id).is_some() {
            self.activation_token = self.activation_token.wrapping_add(1);
        }
        self.try_activate(id, 0, now)
    }

    /// Deliver an elapsed timer.
    pub fn fire(&mut self, timer: Timer, now: Instant) -> Vec<Timer> {
        if timer.epoch != self.epoch {
            debug!(
                target = "application::toc",
                timer_epoch = timer.epoch.get(),
                epoch = self.epoch.get(),
                "dropping stale timer"
            );
            return Vec::new();
        }

        match timer.kind {
            TimerKind::Scan { attempt } => match self.status {
                SyncStatus::Scanning { attempt: expected } if expected == attempt => {
                    self.scan_attempt(attempt, now)
                }
                _ => Vec::new(),
            },
            TimerKind::ScrollFlush => {
                self.throttle.flush(now);
                self.track_scroll(now);
                Vec::new()
            }
            TimerKind::SuppressionEnd { token } => {
                if token == self.suppression_token
                    && matches!(self.status, SyncStatus::Suppressed { .. })
                {
                    self.status = SyncStatus::Ready;
                }
                Vec::new()
            }
            TimerKind::ActivationRetry { id, attempt, token } => {
                if token != self.activation_token {
                    debug!(
                        target = "application::toc",
                        id = %id,
                        "dropping superseded activation retry"
                    );
                    return Vec::new();
                }
                self.try_activate(&id, attempt, now)
            }
        }
    }

    fn scan_attempt(&mut self, attempt: usize, now: Instant) -> Vec<Timer> {
        counter!(METRIC_SCAN_ATTEMPTS).increment(1);
        self.rescan();

        if !self.state.is_empty() {
            self.status = SyncStatus::Ready;
            self.track_scroll(now);
            debug!(
                target = "application::toc",
                attempt,
                headings = self.state.entries().len(),
                "navigation ready"
            );
            return Vec::new();
        }

        let next = attempt + 1;
        match self.policy.scan_retry.delay(next) {
            Some(delay) => {
                self.status = SyncStatus::Scanning { attempt: next };
                vec![self.timer(delay, TimerKind::Scan { attempt: next })]
            }
            None => {
                counter!(METRIC_SCAN_EXHAUSTED).increment(1);
                debug!(
                    target = "application::toc",
                    attempts = next,
                    "no headings found; navigation hidden"
                );
                self.status = SyncStatus::Ready;
                Vec::new()
            }
        }
    }

    fn try_activate(&mut self, id: &str, attempt: usize, now: Instant) -> Vec<Timer> {
        if self.state.entry(id).is_none() {
            debug!(target = "application::toc", id, "ignoring activation of unknown entry");
            return Vec::new();
        }

        let top = self
            .surface
            .find_by_id(id)
            .and_then(|node| self.surface.rect_top(node).ok());

        let Some(top) = top else {
            counter!(METRIC_ACTIVATION_MISS).increment(1);
            return match self.policy.activation_retry.delay(attempt) {
                Some(delay) => vec![self.timer(
                    delay,
                    TimerKind::ActivationRetry {
                        id: id.to_string(),
                        attempt: attempt + 1,
                        token: self.activation_token,
                    },
                )],
                None => {
                    debug!(target = "application::toc", id, "activation target never resolved");
                    Vec::new()
                }
            };
        };

        let viewport = self.surface.viewport();
        let target = (viewport.scroll_top + top - self.policy.header_offset_px).max(0.0);
        self.surface.scroll_to(target, ScrollBehavior::Smooth);

        if let Err(err) = self.state.set_current(Some(id)) {
            warn!(target = "application::toc", error = %err, "activation lost its entry");
            return Vec::new();
        }

        self.suppression_token = self.suppression_token.wrapping_add(1);
        self.status = SyncStatus::Suppressed {
            target: id.to_string(),
            until: now + self.policy.suppression_window,
        };

        vec![self.timer(
            self.policy.suppression_window,
            TimerKind::SuppressionEnd {
                token: self.suppression_token,
            },
        )]
    }

    fn timer(&self, delay: Duration, kind: TimerKind) -> Timer {
        Timer {
            epoch: self.epoch,
            delay,
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::toc::surface::{HeadingNode, SurfaceError, Viewport};
    use crate::domain::headings::NodeRef;

    /// Surface whose root is mounted but whose queries always fail.
    struct BrokenSurface;

    impl DocumentSurface for BrokenSurface {
        fn content_root(&self) -> Result<Option<NodeRef>, SurfaceError> {
            Ok(Some(NodeRef::new(7, 0)))
        }

        fn query_headings(
            &self,
            _root: NodeRef,
            _max_level: HeadingLevel,
        ) -> Result<Vec<HeadingNode>, SurfaceError> {
            Err(SurfaceError::query("selector engine unavailable"))
        }

        fn set_element_id(&mut self, node: NodeRef, _id: &str) -> Result<(), SurfaceError> {
            Err(SurfaceError::detached(node))
        }

        fn find_by_id(&self, _id: &str) -> Option<NodeRef> {
            None
        }

        fn rect_top(&self, node: NodeRef) -> Result<f64, SurfaceError> {
            Err(SurfaceError::detached(node))
        }

        fn viewport(&self) -> Viewport {
            Viewport {
                scroll_top: 0.0,
                height: 600.0,
                document_height: 600.0,
            }
        }

        fn scroll_to(&mut self, _top: f64, _behavior: ScrollBehavior) {}
    }

    #[test]
    fn surface_failures_degrade_to_empty_navigation() {
        let mut sync = HeadingSynchronizer::new(BrokenSurface, SyncPolicy::default());

        assert!(sync.scan().is_empty());
        assert!(sync.scrolled(Instant::now()).is_empty());
        assert!(sync.activate("heading-0", Instant::now()).is_empty());
        assert_eq!(sync.status(), &SyncStatus::Idle);
    }

    #[test]
    fn empty_scan_schedule_scans_once_immediately() {
        let policy = SyncPolicy {
            scan_retry: RetryPolicy::none(),
            ..SyncPolicy::default()
        };
        let mut sync = HeadingSynchronizer::new(BrokenSurface, policy);

        let timers = sync.content_changed(Instant::now());

        assert!(timers.is_empty());
        assert_eq!(sync.epoch().get(), 1);
        assert_eq!(sync.status(), &SyncStatus::Ready);
    }

    #[test]
    fn policy_follows_settings() {
        let settings = TocSettings {
            max_level: HeadingLevel::new(3).expect("level"),
            threshold_ratio: 0.5,
            bottom_tolerance_px: 40.0,
            header_offset_px: 64.0,
            suppression_window: Duration::from_millis(800),
            scroll_throttle: Duration::from_millis(32),
            scan_delays: vec![Duration::from_millis(50)],
            activation_delays: Vec::new(),
        };

        let policy = SyncPolicy::from(&settings);

        assert_eq!(policy.max_level.get(), 3);
        assert_eq!(policy.track.threshold_ratio, 0.5);
        assert_eq!(policy.track.bottom_tolerance_px, 40.0);
        assert_eq!(policy.header_offset_px, 64.0);
        assert_eq!(policy.scan_retry.delays(), [Duration::from_millis(50)]);
        assert_eq!(policy.activation_retry.max_attempts(), 0);
    }
}
