//! Event pump for CDP page session.
//!
//! Chrome pushes events for an attached target over the shared WebSocket.
//! The pump folds them into two watch channels: a DOM activity tick and the
//! current main-frame URL. Single-page apps rewrite history instead of doing
//! full loads, so `Page.navigatedWithinDocument` matters as much as
//! `Page.frameNavigated` here.

use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tracing::trace;

use crate::protocol::CdpResponse;

use super::core::PageSession;

impl PageSession {
    /// Consume session events until the channel closes.
    pub(super) async fn pump_events(
        mut event_rx: mpsc::UnboundedReceiver<CdpResponse>,
        tick_tx: watch::Sender<u64>,
        url_tx: watch::Sender<String>,
    ) {
        while let Some(event) = event_rx.recv().await {
            let Some(method) = event.method.as_deref() else {
                continue;
            };

            match method {
                "Page.frameNavigated" => {
                    if let Some(url) = main_frame_url(event.params.as_ref()) {
                        trace!("frame navigated: {}", url);
                        url_tx.send_replace(url);
                    }
                }
                "Page.navigatedWithinDocument" => {
                    let url = event
                        .params
                        .as_ref()
                        .and_then(|p| p["url"].as_str())
                        .map(|s| s.to_string());
                    if let Some(url) = url {
                        trace!("navigated within document: {}", url);
                        url_tx.send_replace(url);
                    }
                }
                _ => {}
            }

            // Every event counts as page activity.
            tick_tx.send_modify(|n| *n = n.wrapping_add(1));
        }
    }
}

/// Extract the URL from a frameNavigated event, top-level frames only.
fn main_frame_url(params: Option<&Value>) -> Option<String> {
    let frame = params.map(|p| &p["frame"])?;
    // Subframes carry a parentId; the main frame does not.
    if frame.get("parentId").is_some() {
        return None;
    }
    frame["url"].as_str().map(|s| s.to_string())
}
