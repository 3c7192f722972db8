//! Heading synchronizer: derives a table of contents from rendered content and
//! keeps a current-entry pointer aligned with the scroll position.
//!
//! Callers must render before scanning. The synchronizer copes with content
//! that is not painted yet by retrying the scan on a bounded schedule, and it
//! treats an article without headings as a normal, empty navigation.

mod driver;
mod retry;
mod scan;
mod surface;
mod synchronizer;
mod throttle;
mod tracker;

pub use driver::{DriverError, SyncDriver, SyncEvent, TocHandle};
pub use retry::{DEFAULT_ACTIVATION_DELAYS_MS, DEFAULT_SCAN_DELAYS_MS, RetryPolicy};
pub use scan::scan_headings;
pub use surface::{DocumentSurface, HeadingNode, ScrollBehavior, SurfaceError, Viewport};
pub use synchronizer::{Epoch, HeadingSynchronizer, SyncPolicy, SyncStatus, Timer, TimerKind};
pub use throttle::{ScrollThrottle, ThrottleDecision};
pub use tracker::{TrackPolicy, select_current};

pub const METRIC_SCAN_ATTEMPTS: &str = "tocsync_scan_attempts_total";
pub const METRIC_SCAN_EXHAUSTED: &str = "tocsync_scan_exhausted_total";
pub const METRIC_ACTIVATION_MISS: &str = "tocsync_activation_miss_total";
