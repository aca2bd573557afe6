//! Run orchestration.
//!
//! The [`Orchestrator`] owns the run lifecycle: it decides whether a start
//! request applies (right page, no run in flight, out of the re-arm
//! cooldown), walks the pipeline of readiness wait, scroll preload and
//! batch, and watches navigation so single page app route changes onto the
//! draft page trigger a run by themselves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::EngineError;
use crate::page::DraftPage;
use crate::preload::preload_by_scrolling;
use crate::status::{RunStatus, StatusBoard};
use crate::wait::wait_until;

pub struct Orchestrator {
    pub(crate) page: Arc<dyn DraftPage>,
    pub(crate) config: Config,
    pub(crate) status: StatusBoard,
    pub(crate) cancel: Arc<AtomicBool>,
    running: AtomicBool,
    last_finished: Mutex<Option<Instant>>,
}

impl Orchestrator {
    pub fn new(page: Arc<dyn DraftPage>, config: Config) -> Self {
        Self {
            page,
            config,
            status: StatusBoard::new(),
            cancel: Arc::new(AtomicBool::new(false)),
            running: AtomicBool::new(false),
            last_finished: Mutex::new(None),
        }
    }

    /// Watch run status updates.
    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub fn snapshot(&self) -> RunStatus {
        self.status.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Request cancellation. The current group of items finishes; nothing
    /// new starts until the next `start` or `resume`.
    pub fn stop(&self) {
        info!("stop requested");
        self.cancel.store(true, Ordering::SeqCst);
        self.status.note("Stopping after the current group");
    }

    pub(crate) fn cancel_requested(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run the full pipeline if the page is the draft page and no run is
    /// already active. Returns whether a run actually happened.
    ///
    /// Starts are also suppressed for a cooldown after the previous run, so
    /// the navigation watcher cannot retrigger on the redirect dance some
    /// route changes perform.
    pub async fn start(&self) -> Result<bool, EngineError> {
        let url = self.page.current_url().await?;
        if !url.contains(&self.config.page.draft_url_fragment) {
            debug!(url = %url, "not the draft page, ignoring start");
            return Ok(false);
        }

        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("a run is already active, ignoring start");
            return Ok(false);
        }

        if let Some(finished) = *self.last_finished.lock() {
            let cooldown = Duration::from_millis(self.config.wait.rearm_cooldown_ms);
            if finished.elapsed() < cooldown {
                debug!("within the re-arm cooldown, ignoring start");
                self.running.store(false, Ordering::SeqCst);
                return Ok(false);
            }
        }

        info!(url = %url, "draft page detected, starting run");
        // A fresh run starts with a clean cancellation flag.
        self.cancel.store(false, Ordering::SeqCst);

        let result = self.run_pipeline().await;

        *self.last_finished.lock() = Some(Instant::now());
        self.running.store(false, Ordering::SeqCst);
        self.status.finish("Idle");

        match result {
            Ok(()) => {}
            Err(EngineError::Cancelled) => info!("run cancelled"),
            Err(e) => warn!("run aborted: {}", e),
        }
        Ok(true)
    }

    /// Re-run the batch over whatever is still unprocessed, skipping the
    /// readiness wait, the preload and the cooldown. For picking a stopped
    /// run back up on an already loaded page.
    pub async fn resume(&self) -> Result<bool, EngineError> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("a run is already active, ignoring resume");
            return Ok(false);
        }

        info!("resuming over remaining items");
        self.cancel.store(false, Ordering::SeqCst);
        self.status.start_run("Resuming pending items");

        let result = self.run_batch().await;

        self.running.store(false, Ordering::SeqCst);
        self.status.finish("Idle");

        match result {
            Ok(summary) => {
                info!(
                    done = summary.done,
                    failed = summary.failed,
                    cancelled = summary.cancelled,
                    "resume finished"
                );
            }
            Err(e) => warn!("resume aborted: {}", e),
        }
        Ok(true)
    }

    async fn run_pipeline(&self) -> Result<(), EngineError> {
        self.status.start_run("Waiting for the page to load");
        wait_until(
            "draft items",
            Duration::from_millis(self.config.wait.page_ready_timeout_ms),
            Duration::from_millis(self.config.wait.page_poll_ms),
            self.page.changes(),
            &self.cancel,
            || self.page.any_item_present(),
        )
        .await?;

        info!("page ready");
        self.status.note("Preloading suggestions");
        if let Err(e) = preload_by_scrolling(self.page.as_ref(), &self.config.wait.preload).await {
            // The batch can still work on whatever did load.
            warn!("preload failed: {}", e);
        }

        let summary = self.run_batch().await?;
        info!(
            done = summary.done,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "batch finished"
        );
        Ok(())
    }

    /// Follow navigation and start a run whenever the page lands on the
    /// draft URL. Runs until the page's URL channel closes.
    pub async fn watch_navigation(&self) {
        let mut urls = self.page.url_changes();
        loop {
            if urls.changed().await.is_err() {
                debug!("navigation stream closed");
                break;
            }
            let url = urls.borrow_and_update().clone();
            info!(url = %url, "navigation detected");
            if url.contains(&self.config.page.draft_url_fragment) {
                if let Err(e) = self.start().await {
                    warn!("start after navigation failed: {}", e);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
