//! Engine error types.

use std::time::Duration;

use autotag_cdp::CdpError;
use thiserror::Error;

/// Failure talking to the page.
///
/// One item's run stops at the first such error; the scheduler catches it and
/// counts the item as failed without aborting the batch.
#[derive(Debug, Error)]
#[error("page automation failed: {0}")]
pub struct PageError(#[from] CdpError);

/// Errors surfaced by the orchestrator.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A readiness wait gave up before its probe succeeded.
    #[error("timed out after {after:?} waiting for {what}")]
    WaitTimeout {
        what: &'static str,
        after: Duration,
    },

    /// Page automation failed outside any single item's run.
    #[error(transparent)]
    Page(#[from] PageError),

    /// Cancellation was requested while waiting.
    #[error("run cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_error_wraps_cdp() {
        let err = PageError::from(CdpError::SessionClosed);
        assert!(err.to_string().contains("Session closed"));
    }

    #[test]
    fn wait_timeout_names_the_condition() {
        let err = EngineError::WaitTimeout {
            what: "draft items",
            after: Duration::from_secs(40),
        };
        assert!(err.to_string().contains("draft items"));
    }

    #[test]
    fn cancelled_display() {
        assert_eq!(EngineError::Cancelled.to_string(), "run cancelled");
    }
}
