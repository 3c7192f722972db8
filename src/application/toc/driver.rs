//! Event loop that owns a [`HeadingSynchronizer`].
//!
//! The driver is the single writer of navigation state. UI callbacks send
//! [`SyncEvent`]s through a [`TocHandle`]; timers requested by the
//! synchronizer are armed as short-lived tasks that post back into the same
//! queue. Display collaborators observe [`NavigationSnapshot`]s through a
//! watch channel.

use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
    time::{Instant, sleep},
};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::headings::NavigationSnapshot;

use super::surface::DocumentSurface;
use super::synchronizer::{HeadingSynchronizer, SyncPolicy, Timer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    ContentChanged,
    Scrolled,
    Activate(String),
    Timer(Timer),
    Shutdown,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriverError {
    #[error("table-of-contents driver has stopped")]
    Closed,
}

/// Cloneable sender side used by UI callbacks.
#[derive(Debug, Clone)]
pub struct TocHandle {
    events: mpsc::UnboundedSender<SyncEvent>,
    snapshots: watch::Receiver<NavigationSnapshot>,
}

impl TocHandle {
    pub fn content_changed(&self) -> Result<(), DriverError> {
        self.send(SyncEvent::ContentChanged)
    }

    pub fn scrolled(&self) -> Result<(), DriverError> {
        self.send(SyncEvent::Scrolled)
    }

    pub fn activate(&self, id: impl Into<String>) -> Result<(), DriverError> {
        self.send(SyncEvent::Activate(id.into()))
    }

    pub fn shutdown(&self) -> Result<(), DriverError> {
        self.send(SyncEvent::Shutdown)
    }

    pub fn subscribe(&self) -> watch::Receiver<NavigationSnapshot> {
        self.snapshots.clone()
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> NavigationSnapshot {
        self.snapshots.borrow().clone()
    }

    fn send(&self, event: SyncEvent) -> Result<(), DriverError> {
        self.events.send(event).map_err(|_| DriverError::Closed)
    }
}

pub struct SyncDriver<S> {
    sync: HeadingSynchronizer<S>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
    loopback: mpsc::WeakUnboundedSender<SyncEvent>,
    snapshots: watch::Sender<NavigationSnapshot>,
    pending: Vec<JoinHandle<()>>,
}

impl<S> SyncDriver<S>
where
    S: DocumentSurface + Send + 'static,
{
    pub fn new(surface: S, policy: SyncPolicy) -> (Self, TocHandle) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (snapshots_tx, snapshots_rx) = watch::channel(NavigationSnapshot::default());

        let driver = Self {
            sync: HeadingSynchronizer::new(surface, policy),
            events: events_rx,
            loopback: events_tx.downgrade(),
            snapshots: snapshots_tx,
            pending: Vec::new(),
        };
        let handle = TocHandle {
            events: events_tx,
            snapshots: snapshots_rx,
        };

        (driver, handle)
    }

    /// Process events until a shutdown request arrives or every handle is
    /// dropped. Returns the synchronizer so callers can inspect final state.
    pub async fn run(mut self) -> HeadingSynchronizer<S> {
        info!(target = "application::toc::driver", "table-of-contents driver started");

        while let Some(event) = self.events.recv().await {
            let now = Instant::now();
            let timers = match event {
                SyncEvent::ContentChanged => {
                    self.cancel_pending();
                    self.sync.content_changed(now)
                }
                SyncEvent::Scrolled => self.sync.scrolled(now),
                SyncEvent::Activate(id) => self.sync.activate(&id, now),
                SyncEvent::Timer(timer) => self.sync.fire(timer, now),
                SyncEvent::Shutdown => break,
            };

            for timer in timers {
                self.arm(timer);
            }
            self.publish();
        }

        self.cancel_pending();
        info!(target = "application::toc::driver", "table-of-contents driver stopped");
        self.sync
    }

    fn arm(&mut self, timer: Timer) {
        self.pending.retain(|task| !task.is_finished());

        debug!(
            target = "application::toc::driver",
            kind = ?timer.kind,
            delay_ms = timer.delay.as_millis() as u64,
            "arming timer"
        );

        let loopback = self.loopback.clone();
        self.pending.push(tokio::spawn(async move {
            sleep(timer.delay).await;
            if let Some(events) = loopback.upgrade() {
                let _ = events.send(SyncEvent::Timer(timer));
            }
        }));
    }

    fn cancel_pending(&mut self) {
        for task in self.pending.drain(..) {
            task.abort();
        }
    }

    fn publish(&self) {
        let next = self.sync.state().snapshot();
        self.snapshots.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
