//! In-memory [`DraftPage`] fake shared by the engine tests.
//!
//! Each `FakeItem` scripts how one card behaves (does the panel show, what
//! does accept-all add, does the tag input work) and records what the engine
//! did to it, so tests assert on both outcomes and dispatched actions.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use autotag_cdp::CdpError;
use parking_lot::Mutex;
use tokio::sync::watch;

use crate::config::Config;
use crate::error::PageError;
use crate::page::{DraftPage, ItemHandle, PageResult, ScrollMetrics};

/// Engine config with millisecond-scale pauses so tests run fast.
pub(crate) fn test_config() -> Config {
    let mut config = Config::default();
    config.run.concurrency = 2;
    config.wait.page_ready_timeout_ms = 200;
    config.wait.page_poll_ms = 5;
    config.wait.suggestion_timeout_ms = 20;
    config.wait.suggestion_poll_ms = 5;
    config.wait.bulk_settle_ms = 1;
    config.wait.seed_settle_ms = 1;
    config.wait.seed_pace_ms = 1;
    config.wait.click_pace_ms = 1;
    config.wait.individual_settle_ms = 1;
    config.wait.entry_pace_ms = 1;
    config.wait.entry_settle_ms = 1;
    config.wait.verify_settle_ms = 1;
    config.wait.trim_pace_ms = 1;
    config.wait.trim_settle_ms = 1;
    config.wait.group_pause_ms = 1;
    config.wait.rearm_cooldown_ms = 0;
    config.wait.preload.max_duration_ms = 50;
    config.wait.preload.pause_ms = 1;
    config
}

/// Scripted behavior and recorded actions for one card.
pub(crate) struct FakeItem {
    pub title: String,
    pub tags: usize,
    pub processed: bool,
    pub panel_visible: bool,
    pub suggestions: Vec<String>,
    /// Tags added by one accept-all dispatch.
    pub accept_adds: usize,
    /// Tags added by one click_suggestions round.
    pub click_adds: usize,
    /// Whether a committed tag actually lands.
    pub commit_adds: bool,
    /// Committing a tag makes the suggestion panel appear.
    pub panel_after_commit: bool,
    /// Whether chip removal works.
    pub remove_works: bool,
    /// Make tag_count fail, simulating a broken card.
    pub fail_tag_count: bool,
    /// Trip the shared cancel flag when accept-all runs on this card.
    pub cancel_on_accept: bool,

    pub accept_calls: usize,
    pub click_calls: usize,
    pub commit_calls: usize,
    pub remove_calls: usize,
    pub commits: Vec<String>,
}

impl FakeItem {
    pub fn new(title: &str, tags: usize) -> Self {
        Self {
            title: title.to_string(),
            tags,
            processed: false,
            panel_visible: false,
            suggestions: Vec::new(),
            accept_adds: 0,
            click_adds: 0,
            commit_adds: false,
            panel_after_commit: false,
            remove_works: true,
            fail_tag_count: false,
            cancel_on_accept: false,
            accept_calls: 0,
            click_calls: 0,
            commit_calls: 0,
            remove_calls: 0,
            commits: Vec::new(),
        }
    }
}

pub(crate) struct FakeState {
    pub items: Vec<FakeItem>,
    pub url: String,
    pub scroll_y: f64,
    pub viewport_h: f64,
    pub content_h: f64,
    pub max_scroll_seen: f64,
    /// Content height added once when the bottom is first reached.
    pub grow_on_bottom: Option<f64>,
    /// Flag stored by `cancel_on_accept` items, usually the orchestrator's
    /// cancel flag.
    pub cancel_target: Option<Arc<AtomicBool>>,
}

pub(crate) struct FakePage {
    pub state: Mutex<FakeState>,
    tick_tx: watch::Sender<u64>,
    tick_rx: watch::Receiver<u64>,
    url_tx: watch::Sender<String>,
    url_rx: watch::Receiver<String>,
}

impl FakePage {
    pub fn new(items: Vec<FakeItem>) -> Self {
        let (tick_tx, tick_rx) = watch::channel(0u64);
        let (url_tx, url_rx) = watch::channel(String::new());
        Self {
            state: Mutex::new(FakeState {
                items,
                url: "https://market.example/icon/draft/photos".to_string(),
                scroll_y: 0.0,
                viewport_h: 600.0,
                content_h: 600.0,
                max_scroll_seen: 0.0,
                grow_on_bottom: None,
                cancel_target: None,
            }),
            tick_tx,
            tick_rx,
            url_tx,
            url_rx,
        }
    }

    pub fn set_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
    }

    pub fn set_scroll_geometry(&self, viewport_h: f64, content_h: f64) {
        let mut state = self.state.lock();
        state.viewport_h = viewport_h;
        state.content_h = content_h;
    }

    /// Simulate a navigation: update the URL and publish it.
    pub fn push_url(&self, url: &str) {
        self.state.lock().url = url.to_string();
        self.url_tx.send_replace(url.to_string());
    }

    /// Simulate a page mutation tick.
    pub fn tick(&self) {
        self.tick_tx.send_modify(|n| *n = n.wrapping_add(1));
    }

    fn broken() -> PageError {
        PageError::from(CdpError::SessionClosed)
    }
}

#[async_trait]
impl DraftPage for FakePage {
    async fn find_items(&self) -> PageResult<Vec<ItemHandle>> {
        let state = self.state.lock();
        Ok((0..state.items.len())
            .map(|index| ItemHandle {
                node_id: index as i64,
                index,
            })
            .collect())
    }

    async fn is_processed(&self, item: ItemHandle) -> PageResult<bool> {
        let state = self.state.lock();
        Ok(state.items.get(item.index).map(|i| i.processed).unwrap_or(false))
    }

    async fn mark_processed(&self, item: ItemHandle) -> PageResult<()> {
        let mut state = self.state.lock();
        if let Some(entry) = state.items.get_mut(item.index) {
            entry.processed = true;
        }
        Ok(())
    }

    async fn item_title(&self, item: ItemHandle) -> PageResult<String> {
        let state = self.state.lock();
        Ok(state
            .items
            .get(item.index)
            .map(|i| i.title.clone())
            .unwrap_or_default())
    }

    async fn tag_count(&self, item: ItemHandle) -> PageResult<usize> {
        let state = self.state.lock();
        match state.items.get(item.index) {
            Some(entry) if entry.fail_tag_count => Err(Self::broken()),
            Some(entry) => Ok(entry.tags),
            None => Ok(0),
        }
    }

    async fn suggestion_panel_visible(&self, item: ItemHandle) -> PageResult<bool> {
        let state = self.state.lock();
        Ok(state
            .items
            .get(item.index)
            .map(|i| i.panel_visible)
            .unwrap_or(false))
    }

    async fn suggestion_texts(&self, item: ItemHandle) -> PageResult<Vec<String>> {
        let state = self.state.lock();
        Ok(state
            .items
            .get(item.index)
            .filter(|i| i.panel_visible)
            .map(|i| i.suggestions.clone())
            .unwrap_or_default())
    }

    async fn accept_all_suggestions(&self, item: ItemHandle) -> PageResult<bool> {
        let mut state = self.state.lock();
        let cancel_target = state.cancel_target.clone();
        let Some(entry) = state.items.get_mut(item.index) else {
            return Ok(false);
        };
        entry.accept_calls += 1;
        if entry.cancel_on_accept {
            if let Some(flag) = cancel_target {
                flag.store(true, Ordering::SeqCst);
            }
        }
        if !entry.panel_visible {
            return Ok(false);
        }
        entry.tags += entry.accept_adds;
        Ok(true)
    }

    async fn click_suggestions(&self, item: ItemHandle, max_clicks: usize) -> PageResult<usize> {
        let mut state = self.state.lock();
        let Some(entry) = state.items.get_mut(item.index) else {
            return Ok(0);
        };
        entry.click_calls += 1;
        if !entry.panel_visible {
            return Ok(0);
        }
        entry.tags += entry.click_adds;
        Ok(entry.suggestions.len().min(max_clicks))
    }

    async fn commit_tag(&self, item: ItemHandle, text: &str) -> PageResult<bool> {
        let mut state = self.state.lock();
        let Some(entry) = state.items.get_mut(item.index) else {
            return Ok(false);
        };
        entry.commit_calls += 1;
        entry.commits.push(text.to_string());
        if entry.commit_adds {
            entry.tags += 1;
        }
        if entry.panel_after_commit {
            entry.panel_visible = true;
        }
        Ok(true)
    }

    async fn remove_last_tag(&self, item: ItemHandle) -> PageResult<bool> {
        let mut state = self.state.lock();
        let Some(entry) = state.items.get_mut(item.index) else {
            return Ok(false);
        };
        if !entry.remove_works || entry.tags == 0 {
            return Ok(false);
        }
        entry.tags -= 1;
        entry.remove_calls += 1;
        Ok(true)
    }

    async fn reveal(&self, _item: ItemHandle) -> PageResult<()> {
        Ok(())
    }

    async fn any_item_present(&self) -> PageResult<bool> {
        Ok(!self.state.lock().items.is_empty())
    }

    async fn scroll_metrics(&self) -> PageResult<ScrollMetrics> {
        let state = self.state.lock();
        Ok(ScrollMetrics {
            scroll_y: state.scroll_y,
            viewport_h: state.viewport_h,
            content_h: state.content_h,
        })
    }

    async fn scroll_by(&self, delta_y: f64) -> PageResult<()> {
        let mut state = self.state.lock();
        let max_scroll = (state.content_h - state.viewport_h).max(0.0);
        state.scroll_y = (state.scroll_y + delta_y).clamp(0.0, max_scroll);
        state.max_scroll_seen = state.max_scroll_seen.max(state.scroll_y);
        if state.scroll_y + state.viewport_h + 12.0 >= state.content_h {
            if let Some(growth) = state.grow_on_bottom.take() {
                state.content_h += growth;
            }
        }
        Ok(())
    }

    async fn scroll_to_top(&self) -> PageResult<()> {
        self.state.lock().scroll_y = 0.0;
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        Ok(self.state.lock().url.clone())
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.tick_rx.clone()
    }

    fn url_changes(&self) -> watch::Receiver<String> {
        self.url_rx.clone()
    }
}
