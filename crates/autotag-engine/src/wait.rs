//! Readiness waiting.
//!
//! `wait_until` is a poll/notify hybrid: it re-runs an async probe on a fixed
//! interval, but also wakes early whenever the page's change channel ticks.
//! Pure polling reacts a whole interval late; pure notification misses state
//! that was already good before the first tick. Doing both keeps waits
//! prompt without burning the CPU.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::trace;

use crate::error::{EngineError, PageError};

/// Wait until `probe` reports true.
///
/// The probe runs immediately, then once per `poll` interval or page change
/// tick, whichever comes first. Probe errors are treated as "not ready yet";
/// a transiently detached element reads the same as one that is still
/// loading. Returns [`EngineError::WaitTimeout`] when `timeout` elapses and
/// [`EngineError::Cancelled`] as soon as the cancel flag is set.
pub(crate) async fn wait_until<F, Fut>(
    what: &'static str,
    timeout: Duration,
    poll: Duration,
    mut ticks: watch::Receiver<u64>,
    cancel: &AtomicBool,
    mut probe: F,
) -> Result<(), EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool, PageError>>,
{
    let deadline = Instant::now() + timeout;

    loop {
        if cancel.load(Ordering::SeqCst) {
            return Err(EngineError::Cancelled);
        }

        match probe().await {
            Ok(true) => return Ok(()),
            Ok(false) => {}
            Err(e) => trace!("probe for {} failed, treating as not ready: {}", what, e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(EngineError::WaitTimeout {
                what,
                after: timeout,
            });
        }

        let nap = poll.min(deadline - now);
        tokio::select! {
            _ = tokio::time::sleep(nap) => {}
            _ = changed_or_pending(&mut ticks) => {}
        }
    }
}

/// Resolve on the next tick; pend forever once the sender is gone so a closed
/// channel degrades to plain polling instead of a busy loop.
async fn changed_or_pending(ticks: &mut watch::Receiver<u64>) {
    if ticks.changed().await.is_err() {
        std::future::pending::<()>().await;
    }
}
