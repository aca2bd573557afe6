//! Batch scheduling over the page's pending items.
//!
//! Items are processed in groups of `run.concurrency`; one group's items run
//! concurrently and every item of a group finishes before the next group
//! starts. Cancellation is honored at group boundaries: in-flight items run
//! to completion, queued groups never start.

use futures::future::join_all;
use tracing::{info, warn};

use crate::error::PageError;
use crate::item::{process_item, Outcome};
use crate::orchestrator::Orchestrator;
use crate::page::ItemHandle;

/// What one batch pass over the page did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Unprocessed items the batch set out to handle.
    pub total: usize,
    pub done: usize,
    pub failed: usize,
    /// The batch stopped early on a cancellation request.
    pub cancelled: bool,
}

enum ItemResult {
    Done,
    Failed,
    Cancelled,
}

impl Orchestrator {
    /// Process every unprocessed item currently on the page.
    pub(crate) async fn run_batch(&self) -> Result<BatchSummary, PageError> {
        let items = self.page.find_items().await?;
        if items.is_empty() {
            info!("no items found on the page");
            self.status.note("No items found");
            return Ok(BatchSummary::default());
        }

        let mut pending = Vec::new();
        for item in items {
            if !self.page.is_processed(item).await? {
                pending.push(item);
            }
        }

        info!(pending = pending.len(), "starting batch");
        self.status.begin_batch(pending.len());
        let mut summary = BatchSummary {
            total: pending.len(),
            ..BatchSummary::default()
        };

        let group_size = self.config.run.concurrency.max(1);
        let group_pause = std::time::Duration::from_millis(self.config.wait.group_pause_ms);

        for group in pending.chunks(group_size) {
            if self.cancel_requested() {
                info!("cancellation requested, not starting the next group");
                self.status.note("Stopped by user");
                summary.cancelled = true;
                break;
            }

            let outcomes = join_all(group.iter().map(|&item| self.process_one(item))).await;
            for outcome in outcomes {
                match outcome {
                    ItemResult::Done => summary.done += 1,
                    ItemResult::Failed => summary.failed += 1,
                    ItemResult::Cancelled => {}
                }
            }

            // Let the page settle between groups.
            tokio::time::sleep(group_pause).await;
        }

        self.status.note("Batch finished");
        Ok(summary)
    }

    /// Run one item and fold any failure into the counters; a broken item
    /// never aborts the batch.
    async fn process_one(&self, item: ItemHandle) -> ItemResult {
        match process_item(
            self.page.as_ref(),
            &self.config,
            &self.status,
            &self.cancel,
            item,
        )
        .await
        {
            Ok(Outcome::Completed { tags }) => {
                info!(item = item.index, tags, "item done");
                self.status.item_done("Item completed");
                ItemResult::Done
            }
            Ok(Outcome::GaveUp { tags }) => {
                warn!(item = item.index, tags, "item finished below target");
                self.status.item_failed("Item below target");
                ItemResult::Failed
            }
            Ok(Outcome::Cancelled) => ItemResult::Cancelled,
            Err(e) => {
                warn!(item = item.index, "item processing failed: {}", e);
                self.status.item_failed("Error in item");
                ItemResult::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
