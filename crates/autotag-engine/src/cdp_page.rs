//! DevTools-backed implementation of [`DraftPage`].
//!
//! Every query is scoped to the card's subtree, never the whole document,
//! so concurrent items cannot read each other's panels. Reads are
//! tolerant: a missing element means "not there" (`false`, `0`, empty), and
//! a click on a node that just went stale reports ineffective instead of
//! failing the item.

use std::time::Duration;

use async_trait::async_trait;
use autotag_cdp::{CdpError, PageSession};
use once_cell::sync::Lazy;
use regex::Regex;
use tokio::sync::watch;
use tracing::debug;

use crate::config::{Config, Selectors};
use crate::page::{DraftPage, ItemHandle, PageResult, ScrollMetrics};

/// Matches the "n / 10" style tag count indicator.
static COUNT_INDICATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\s*/\s*\d+").unwrap());

/// Extracts the label of a suggestion entry. Entries nest count badges in
/// child elements; the label is the bare text node when one exists.
const ENTRY_LABEL_FN: &str = "function() { \
    for (const n of this.childNodes) { \
        if (n.nodeType === 3 && n.textContent.trim()) return n.textContent; \
    } \
    return this.textContent || ''; \
}";

pub struct CdpDraftPage {
    session: PageSession,
    selectors: Selectors,
    click_pace: Duration,
}

impl CdpDraftPage {
    pub fn new(session: PageSession, config: &Config) -> Self {
        Self {
            session,
            selectors: config.page.selectors.clone(),
            click_pace: Duration::from_millis(config.wait.click_pace_ms),
        }
    }

    /// Committed tag chips inside a tag container, excluding the "add new"
    /// pseudo chip.
    async fn chip_nodes(&self, container: i64) -> PageResult<Vec<i64>> {
        let nodes = self
            .session
            .query_selector_all_within(container, &self.selectors.tag_chip)
            .await?;

        let mut chips = Vec::with_capacity(nodes.len());
        for node in nodes {
            let attrs = self.session.get_attributes(node).await?;
            let is_add_new = attrs
                .get("class")
                .map(|c| c.split_whitespace().any(|cls| cls == self.selectors.add_new_class))
                .unwrap_or(false);
            if !is_add_new {
                chips.push(node);
            }
        }
        Ok(chips)
    }

    async fn tag_container(&self, item: ItemHandle) -> PageResult<Option<i64>> {
        Ok(self
            .session
            .query_selector_within(item.node_id, &self.selectors.tag_container)
            .await?)
    }

    async fn suggestion_panel(&self, item: ItemHandle) -> PageResult<Option<i64>> {
        Ok(self
            .session
            .query_selector_within(item.node_id, &self.selectors.suggestion_panel)
            .await?)
    }

    async fn entry_label(&self, node_id: i64) -> PageResult<String> {
        let obj = self.session.resolve_node(node_id).await?;
        let Some(object_id) = obj.object_id else {
            return Ok(String::new());
        };
        let value = self
            .session
            .call_function_on(&object_id, ENTRY_LABEL_FN, None)
            .await?;
        Ok(value.as_str().unwrap_or("").to_string())
    }
}

fn parse_count_indicator(text: &str) -> Option<usize> {
    COUNT_INDICATOR
        .captures(text)
        .and_then(|cap| cap[1].parse().ok())
}

fn normalize_label(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl DraftPage for CdpDraftPage {
    async fn find_items(&self) -> PageResult<Vec<ItemHandle>> {
        let nodes = self
            .session
            .query_selector_all(&self.selectors.item)
            .await?;
        Ok(nodes
            .into_iter()
            .enumerate()
            .map(|(index, node_id)| ItemHandle { node_id, index })
            .collect())
    }

    async fn is_processed(&self, item: ItemHandle) -> PageResult<bool> {
        let attrs = self.session.get_attributes(item.node_id).await?;
        Ok(attrs
            .get(&self.selectors.processed_attr)
            .map(|v| v == "1")
            .unwrap_or(false))
    }

    async fn mark_processed(&self, item: ItemHandle) -> PageResult<()> {
        self.session
            .set_attribute(item.node_id, &self.selectors.processed_attr, "1")
            .await?;
        Ok(())
    }

    async fn item_title(&self, item: ItemHandle) -> PageResult<String> {
        let Some(input) = self
            .session
            .query_selector_within(item.node_id, &self.selectors.title_input)
            .await?
        else {
            return Ok(String::new());
        };
        let value = self.session.input_value(input).await?;
        Ok(value.trim().to_string())
    }

    async fn tag_count(&self, item: ItemHandle) -> PageResult<usize> {
        if let Some(container) = self.tag_container(item).await? {
            let chips = self.chip_nodes(container).await?;
            if !chips.is_empty() {
                return Ok(chips.len());
            }
            // No chips rendered; fall back to the "n / 10" indicator.
            let text = self.session.node_text(container).await?;
            if let Some(count) = parse_count_indicator(&text) {
                return Ok(count);
            }
        }
        let text = self.session.node_text(item.node_id).await?;
        Ok(parse_count_indicator(&text).unwrap_or(0))
    }

    async fn suggestion_panel_visible(&self, item: ItemHandle) -> PageResult<bool> {
        Ok(self.suggestion_panel(item).await?.is_some())
    }

    async fn suggestion_texts(&self, item: ItemHandle) -> PageResult<Vec<String>> {
        let Some(panel) = self.suggestion_panel(item).await? else {
            return Ok(Vec::new());
        };
        let entries = self
            .session
            .query_selector_all_within(panel, &self.selectors.suggestion_entry)
            .await?;

        let mut texts: Vec<String> = Vec::new();
        for entry in entries {
            let label = normalize_label(&self.entry_label(entry).await?);
            if !label.is_empty() && !texts.contains(&label) {
                texts.push(label);
            }
        }
        Ok(texts)
    }

    async fn accept_all_suggestions(&self, item: ItemHandle) -> PageResult<bool> {
        let Some(panel) = self.suggestion_panel(item).await? else {
            return Ok(false);
        };
        let Some(button) = self
            .session
            .query_selector_within(panel, &self.selectors.accept_all)
            .await?
        else {
            return Ok(false);
        };

        // Hidden or disabled buttons swallow clicks without effect.
        if self.session.get_box_model(button).await?.is_none() {
            return Ok(false);
        }
        let attrs = self.session.get_attributes(button).await?;
        if attrs.contains_key("disabled") {
            return Ok(false);
        }

        let _ = self.session.scroll_into_view(item.node_id).await;
        debug!(item = item.index, "clicking accept-all");
        match self.session.click_node(button).await {
            Ok(()) => Ok(true),
            Err(CdpError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn click_suggestions(&self, item: ItemHandle, max_clicks: usize) -> PageResult<usize> {
        let Some(panel) = self.suggestion_panel(item).await? else {
            return Ok(0);
        };
        let entries = self
            .session
            .query_selector_all_within(panel, &self.selectors.suggestion_entry)
            .await?;

        let mut clicked = 0;
        for entry in entries {
            if clicked >= max_clicks {
                break;
            }
            if self.session.click_node(entry).await.is_ok() {
                clicked += 1;
                tokio::time::sleep(self.click_pace).await;
            }
        }
        debug!(item = item.index, clicked, "clicked suggestion entries");
        Ok(clicked)
    }

    async fn commit_tag(&self, item: ItemHandle, text: &str) -> PageResult<bool> {
        let Some(container) = self.tag_container(item).await? else {
            return Ok(false);
        };
        let Some(input) = self
            .session
            .query_selector_within(container, &self.selectors.tag_input)
            .await?
        else {
            return Ok(false);
        };

        debug!(item = item.index, tag = text, "committing tag");
        self.session.focus(input).await?;
        // Replace whatever is in the input rather than appending to it.
        self.session.press_key_combo("Control+a").await?;
        self.session.type_text(text).await?;
        self.session.press_key("Enter").await?;
        Ok(true)
    }

    async fn remove_last_tag(&self, item: ItemHandle) -> PageResult<bool> {
        let Some(container) = self.tag_container(item).await? else {
            return Ok(false);
        };
        let chips = self.chip_nodes(container).await?;
        let Some(&last) = chips.last() else {
            return Ok(false);
        };

        // The remove control is a link or bare svg; click the chip itself
        // when neither is present.
        let target = match self.session.query_selector_within(last, "a").await? {
            Some(t) => t,
            None => match self.session.query_selector_within(last, "svg").await? {
                Some(t) => t,
                None => last,
            },
        };
        match self.session.click_node(target).await {
            Ok(()) => Ok(true),
            Err(CdpError::ElementNotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn reveal(&self, item: ItemHandle) -> PageResult<()> {
        self.session.scroll_into_view(item.node_id).await?;
        Ok(())
    }

    async fn any_item_present(&self) -> PageResult<bool> {
        Ok(self
            .session
            .query_selector(&self.selectors.item)
            .await?
            .is_some())
    }

    async fn scroll_metrics(&self) -> PageResult<ScrollMetrics> {
        let metrics = self.session.layout_metrics().await?;
        Ok(ScrollMetrics {
            scroll_y: metrics.scroll_y,
            viewport_h: metrics.viewport_height,
            content_h: metrics.content_height,
        })
    }

    async fn scroll_by(&self, delta_y: f64) -> PageResult<()> {
        let metrics = self.session.layout_metrics().await?;
        // Wheel events land at the viewport center.
        let x = metrics.viewport_width / 2.0;
        let y = metrics.viewport_height / 2.0;
        self.session.scroll(x, y, 0.0, delta_y).await?;
        Ok(())
    }

    async fn scroll_to_top(&self) -> PageResult<()> {
        self.session.evaluate("window.scrollTo(0, 0)").await?;
        Ok(())
    }

    async fn current_url(&self) -> PageResult<String> {
        Ok(self.session.current_url().await?)
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.session.dom_ticks()
    }

    fn url_changes(&self) -> watch::Receiver<String> {
        self.session.url_changes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_count_indicator() {
        assert_eq!(parse_count_indicator("3 / 10"), Some(3));
        assert_eq!(parse_count_indicator("Tags 10/10 used"), Some(10));
        assert_eq!(parse_count_indicator("0/10"), Some(0));
        assert_eq!(parse_count_indicator("no counts here"), None);
        assert_eq!(parse_count_indicator(""), None);
    }

    #[test]
    fn indicator_takes_first_match() {
        assert_eq!(parse_count_indicator("2 / 10 and 7 / 10"), Some(2));
    }

    #[test]
    fn labels_are_whitespace_normalized() {
        assert_eq!(normalize_label("  shopping \n cart  "), "shopping cart");
        assert_eq!(normalize_label("plain"), "plain");
        assert_eq!(normalize_label("   "), "");
    }
}
