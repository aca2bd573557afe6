//! The surface the engine needs from the draft page.
//!
//! [`DraftPage`] keeps the state machine and scheduler free of protocol
//! details: the production implementation drives a DevTools session, tests
//! drive an in-memory fake. All operations are mechanical; retries, pacing
//! between items and outcome decisions stay above this trait.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::PageError;

pub type PageResult<T> = Result<T, PageError>;

/// Handle to one draft item card.
///
/// Handles are positional: they stay valid while the page keeps its DOM, and
/// operations on a stale handle read as absent rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemHandle {
    /// Backend node id of the card element.
    pub node_id: i64,
    /// Position of the card on the page, for logs.
    pub index: usize,
}

/// Scroll geometry of the page in CSS pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ScrollMetrics {
    pub scroll_y: f64,
    pub viewport_h: f64,
    pub content_h: f64,
}

/// Operations the automation performs against the draft page.
#[async_trait]
pub trait DraftPage: Send + Sync {
    /// All item cards currently on the page, in document order.
    async fn find_items(&self) -> PageResult<Vec<ItemHandle>>;

    /// Whether the card carries the processed marker.
    async fn is_processed(&self, item: ItemHandle) -> PageResult<bool>;

    /// Set the processed marker on the card.
    async fn mark_processed(&self, item: ItemHandle) -> PageResult<()>;

    /// Trimmed title of the card, empty when the title input is missing.
    async fn item_title(&self, item: ItemHandle) -> PageResult<String>;

    /// Number of committed tags on the card. Counts chips when present,
    /// otherwise falls back to the "n / 10" indicator text.
    async fn tag_count(&self, item: ItemHandle) -> PageResult<usize>;

    /// Whether the suggestion panel is currently rendered in the card.
    async fn suggestion_panel_visible(&self, item: ItemHandle) -> PageResult<bool>;

    /// Visible suggestion labels, normalized and deduplicated.
    async fn suggestion_texts(&self, item: ItemHandle) -> PageResult<Vec<String>>;

    /// Click the accept-all button. Returns `false` without side effects when
    /// the panel, the button or its visibility is missing; `true` means the
    /// click was dispatched, not that tags were added.
    async fn accept_all_suggestions(&self, item: ItemHandle) -> PageResult<bool>;

    /// Click up to `max_clicks` suggestion entries, pacing between clicks.
    /// Returns the number of entries actually clicked.
    async fn click_suggestions(&self, item: ItemHandle, max_clicks: usize) -> PageResult<usize>;

    /// Type `text` into the card's tag input and commit it with Enter.
    /// Returns `false` when the input is not present.
    async fn commit_tag(&self, item: ItemHandle, text: &str) -> PageResult<bool>;

    /// Remove the last committed tag chip. Returns `false` when there is no
    /// chip to remove.
    async fn remove_last_tag(&self, item: ItemHandle) -> PageResult<bool>;

    /// Scroll the card into view.
    async fn reveal(&self, item: ItemHandle) -> PageResult<()>;

    /// Whether at least one item card exists. Cheap readiness probe.
    async fn any_item_present(&self) -> PageResult<bool>;

    async fn scroll_metrics(&self) -> PageResult<ScrollMetrics>;

    /// Scroll the page vertically by `delta_y` CSS pixels.
    async fn scroll_by(&self, delta_y: f64) -> PageResult<()>;

    async fn scroll_to_top(&self) -> PageResult<()>;

    /// URL of the page right now.
    async fn current_url(&self) -> PageResult<String>;

    /// Ticks whenever the page changes. Waiters select on this next to their
    /// poll interval so DOM mutations cut the wait short.
    fn changes(&self) -> watch::Receiver<u64>;

    /// Latest main-frame URL, updated on both full navigations and
    /// same-document history changes.
    fn url_changes(&self) -> watch::Receiver<String>;
}
