//! Per-item tagging flow.
//!
//! One [`ItemRun`] drives a single card from whatever state it is in to
//! either the target tag count or a bounded give-up. The ladder is: wait for
//! suggestions and bulk-accept them; seed a title keyword when no panel ever
//! appears; optionally fall back to per-entry clicks and typed entries; then
//! retry in bounded rounds and trim any overflow. Every transition re-reads
//! the live tag count instead of trusting its own bookkeeping, because the
//! page mutates underneath us.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::config::{Config, RunConfig, WaitConfig};
use crate::error::PageError;
use crate::keywords::{derive_keywords, pick_keyword};
use crate::page::{DraftPage, ItemHandle};
use crate::status::StatusBoard;
use crate::wait::wait_until;

/// How one item's run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The item reached the target tag count.
    Completed { tags: usize },
    /// All attempts are exhausted and the item is still short.
    GaveUp { tags: usize },
    /// Cancellation was requested before the item finished.
    Cancelled,
}

/// Run the tagging flow for one item.
pub(crate) async fn process_item(
    page: &dyn DraftPage,
    config: &Config,
    status: &StatusBoard,
    cancel: &AtomicBool,
    item: ItemHandle,
) -> Result<Outcome, PageError> {
    ItemRun {
        page,
        run: &config.run,
        wait: &config.wait,
        status,
        cancel,
        item,
        title: String::new(),
    }
    .run()
    .await
}

struct ItemRun<'a> {
    page: &'a dyn DraftPage,
    run: &'a RunConfig,
    wait: &'a WaitConfig,
    status: &'a StatusBoard,
    cancel: &'a AtomicBool,
    item: ItemHandle,
    title: String,
}

impl ItemRun<'_> {
    async fn run(mut self) -> Result<Outcome, PageError> {
        if self.cancelled() {
            return Ok(Outcome::Cancelled);
        }

        let _ = self.page.reveal(self.item).await;
        self.title = self.page.item_title(self.item).await?;
        let mut count = self.page.tag_count(self.item).await?;
        debug!(item = self.item.index, title = %self.title, count, "processing item");
        self.status.note(format!(
            "Processing: {}",
            if self.title.is_empty() { "(untitled)" } else { &self.title }
        ));

        // First chance: suggestions that are already on their way.
        self.wait_for_suggestions().await;
        let mut panel_present = self.page.suggestion_panel_visible(self.item).await?;
        let mut bulk_added = false;
        if panel_present {
            bulk_added = self.try_bulk_accept(&mut count).await?;
        } else {
            debug!(item = self.item.index, "no suggestion panel yet, giving it one more moment");
            sleep_ms(self.wait.seed_settle_ms).await;
            panel_present = self.page.suggestion_panel_visible(self.item).await?;
            if panel_present {
                bulk_added = self.try_bulk_accept(&mut count).await?;
            }
        }

        if !bulk_added && count < self.run.max_tags {
            // The panel never showed: seed a keyword to provoke suggestions.
            if !panel_present {
                match pick_keyword(&self.title) {
                    Some(keyword) => {
                        self.seed(&keyword).await?;
                        self.wait_for_suggestions().await;
                        bulk_added = self.try_bulk_accept(&mut count).await?;
                        if !bulk_added {
                            debug!(item = self.item.index, "bulk accept still short, reseeding once");
                            self.seed(&keyword).await?;
                            self.wait_for_suggestions().await;
                            bulk_added = self.try_bulk_accept(&mut count).await?;
                        }
                        panel_present = self.page.suggestion_panel_visible(self.item).await?;
                    }
                    None => debug!(item = self.item.index, "title has no usable keyword"),
                }
            }

            // The panel is there but accept-all got us nothing.
            if !bulk_added && panel_present && !self.run.bulk_only {
                let clicked = self.try_individual(&mut count).await?;
                if !clicked {
                    self.try_manual_entry(&mut count).await?;
                }
            }
        }

        count = self.page.tag_count(self.item).await?;
        debug!(item = self.item.index, count, "tags after first pass");

        // Bounded retry rounds until the target count is reached.
        let mut attempts = 0;
        while count < self.run.max_tags && attempts < self.run.bulk_attempts {
            if self.cancelled() {
                return Ok(Outcome::Cancelled);
            }
            trace!(item = self.item.index, attempts, count, "retry round");

            if !panel_present {
                for token in derive_keywords(&self.title, self.run.max_seed_keywords) {
                    self.seed(&token).await?;
                    sleep_ms(self.wait.seed_pace_ms).await;
                }
            }
            self.wait_for_suggestions().await;
            panel_present = self.page.suggestion_panel_visible(self.item).await?;
            let accepted = self.try_bulk_accept(&mut count).await?;
            sleep_ms(self.wait.verify_settle_ms).await;
            count = self.page.tag_count(self.item).await?;

            if count > self.run.max_tags {
                count = self.trim_overflow().await?;
                sleep_ms(self.wait.trim_settle_ms).await;
                count = self.page.tag_count(self.item).await?;
                break;
            }
            if !accepted && !panel_present {
                if let Some(keyword) = pick_keyword(&self.title) {
                    self.seed(&keyword).await?;
                }
            }
            attempts += 1;
        }

        if count > self.run.max_tags {
            self.trim_overflow().await?;
            sleep_ms(self.wait.verify_settle_ms).await;
            count = self.page.tag_count(self.item).await?;
        }

        self.page.mark_processed(self.item).await?;

        if count >= self.run.max_tags {
            info!(item = self.item.index, title = %self.title, count, "item completed");
            Ok(Outcome::Completed { tags: count })
        } else {
            info!(item = self.item.index, title = %self.title, count, "item still short after all attempts");
            Ok(Outcome::GaveUp { tags: count })
        }
    }

    /// Click accept-all and verify it actually added tags. Reads the count
    /// fresh on both sides of the click; returns false without clicking when
    /// the card is already at the limit.
    async fn try_bulk_accept(&self, count: &mut usize) -> Result<bool, PageError> {
        let before = self.page.tag_count(self.item).await?;
        if before >= self.run.max_tags {
            *count = before;
            return Ok(false);
        }
        if !self.page.accept_all_suggestions(self.item).await? {
            *count = before;
            return Ok(false);
        }
        sleep_ms(self.wait.bulk_settle_ms).await;
        let after = self.page.tag_count(self.item).await?;
        *count = after;
        Ok(after > before)
    }

    /// Commit one keyword through the tag input, unless already at the limit.
    async fn seed(&self, keyword: &str) -> Result<(), PageError> {
        if self.page.tag_count(self.item).await? >= self.run.max_tags {
            return Ok(());
        }
        debug!(item = self.item.index, keyword, "seeding keyword");
        if self.page.commit_tag(self.item, keyword).await? {
            sleep_ms(self.wait.seed_settle_ms).await;
        }
        Ok(())
    }

    /// Click suggestion entries one at a time.
    async fn try_individual(&self, count: &mut usize) -> Result<bool, PageError> {
        let before = self.page.tag_count(self.item).await?;
        debug!(item = self.item.index, "accepting suggestions individually");
        self.page
            .click_suggestions(self.item, self.run.max_individual_clicks)
            .await?;
        sleep_ms(self.wait.individual_settle_ms).await;
        let after = self.page.tag_count(self.item).await?;
        *count = after;
        Ok(after > before)
    }

    /// Type the visible suggestion labels into the tag input, capped at the
    /// remaining capacity.
    async fn try_manual_entry(&self, count: &mut usize) -> Result<bool, PageError> {
        let current = self.page.tag_count(self.item).await?;
        let remaining = self.run.max_tags.saturating_sub(current);
        if remaining == 0 {
            return Ok(false);
        }
        let texts = self.page.suggestion_texts(self.item).await?;
        if texts.is_empty() {
            return Ok(false);
        }

        debug!(
            item = self.item.index,
            n = remaining.min(texts.len()),
            "typing suggestions into the tag input"
        );
        for text in texts.iter().take(remaining) {
            self.page.commit_tag(self.item, text).await?;
            sleep_ms(self.wait.entry_pace_ms).await;
        }
        sleep_ms(self.wait.entry_settle_ms).await;
        *count = self.page.tag_count(self.item).await?;
        Ok(true)
    }

    /// Remove chips until the count is back at the limit. Stops when a
    /// removal does nothing, so a page that refuses removal cannot loop.
    async fn trim_overflow(&self) -> Result<usize, PageError> {
        let mut count = self.page.tag_count(self.item).await?;
        debug!(item = self.item.index, count, "trimming overflow");

        let mut attempts = 0;
        while count > self.run.max_tags && attempts < self.run.max_trim_attempts {
            if !self.page.remove_last_tag(self.item).await? {
                break;
            }
            attempts += 1;
            sleep_ms(self.wait.trim_pace_ms).await;
            count = self.page.tag_count(self.item).await?;
        }
        Ok(count)
    }

    /// Wait for the suggestion panel, bounded by the suggestion timeout.
    /// Expiry is normal here (many cards simply have no suggestions), so the
    /// result is only traced.
    async fn wait_for_suggestions(&self) {
        let _ = self.page.reveal(self.item).await;
        let result = wait_until(
            "suggestion panel",
            Duration::from_millis(self.wait.suggestion_timeout_ms),
            Duration::from_millis(self.wait.suggestion_poll_ms),
            self.page.changes(),
            self.cancel,
            || self.page.suggestion_panel_visible(self.item),
        )
        .await;
        if let Err(e) = result {
            trace!(item = self.item.index, "suggestion wait ended: {}", e);
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
