//! Run status tracking.
//!
//! One [`StatusBoard`] per orchestrator. Mutations go through the board so
//! the done/failed counters can never drift past the batch total, and every
//! change is published on a watch channel for whoever renders progress.

use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

/// Snapshot of a run, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RunStatus {
    pub running: bool,
    /// Items the current batch set out to process.
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    /// Last human readable progress message.
    pub last_message: String,
    /// Time since the run started.
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
struct StatusInner {
    running: bool,
    total: usize,
    done: usize,
    failed: usize,
    last_message: String,
    started_at: Option<Instant>,
}

impl StatusInner {
    fn snapshot(&self) -> RunStatus {
        RunStatus {
            running: self.running,
            total: self.total,
            done: self.done,
            failed: self.failed,
            last_message: self.last_message.clone(),
            elapsed: self.started_at.map(|t| t.elapsed()).unwrap_or_default(),
        }
    }
}

pub struct StatusBoard {
    inner: Mutex<StatusInner>,
    tx: watch::Sender<RunStatus>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunStatus::default());
        Self {
            inner: Mutex::new(StatusInner::default()),
            tx,
        }
    }

    /// Watch status updates. Works with any number of subscribers.
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.tx.subscribe()
    }

    pub fn snapshot(&self) -> RunStatus {
        self.inner.lock().snapshot()
    }

    /// A run begins: mark running and restart the clock.
    pub fn start_run(&self, message: &str) {
        let mut inner = self.inner.lock();
        inner.running = true;
        inner.started_at = Some(Instant::now());
        inner.last_message = message.to_string();
        self.publish(&inner);
    }

    /// A batch begins over `total` pending items. Resets the counters but
    /// keeps the run clock (a resumed run continues the earlier timing).
    pub fn begin_batch(&self, total: usize) {
        let mut inner = self.inner.lock();
        inner.running = true;
        inner.total = total;
        inner.done = 0;
        inner.failed = 0;
        inner.started_at = inner.started_at.or_else(|| Some(Instant::now()));
        inner.last_message = "Batch started".to_string();
        self.publish(&inner);
    }

    pub fn item_done(&self, message: &str) {
        let mut inner = self.inner.lock();
        if inner.done + inner.failed < inner.total {
            inner.done += 1;
        } else {
            debug!("ignoring done increment past batch total");
        }
        inner.last_message = message.to_string();
        self.publish(&inner);
    }

    pub fn item_failed(&self, message: &str) {
        let mut inner = self.inner.lock();
        if inner.done + inner.failed < inner.total {
            inner.failed += 1;
        } else {
            debug!("ignoring failed increment past batch total");
        }
        inner.last_message = message.to_string();
        self.publish(&inner);
    }

    /// Progress note without touching the counters.
    pub fn note(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock();
        inner.last_message = message.into();
        self.publish(&inner);
    }

    /// The run is over.
    pub fn finish(&self, message: &str) {
        let mut inner = self.inner.lock();
        inner.running = false;
        inner.last_message = message.to_string();
        self.publish(&inner);
    }

    fn publish(&self, inner: &StatusInner) {
        // send_replace delivers even when no receiver is subscribed yet.
        self.tx.send_replace(inner.snapshot());
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}
