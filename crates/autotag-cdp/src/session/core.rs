//! Core session struct and CDP command dispatch.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::SinkExt;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, trace};

use crate::client::{PendingRequest, WsSink};
use crate::error::CdpError;
use crate::protocol::{CdpRequest, CdpResponse};

/// A session attached to a single page/target.
pub struct PageSession {
    /// Target ID.
    pub(super) target_id: String,
    /// Session ID for this target.
    pub(super) session_id: String,
    /// WebSocket sender (shared with client).
    pub(super) ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
    /// Pending requests (shared with client).
    pub(super) pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
    /// Request ID counter (shared with client).
    pub(super) request_id: Arc<AtomicU64>,
    /// DOM activity counter, bumped by the event pump.
    pub(super) dom_ticks: watch::Receiver<u64>,
    /// Main-frame URL, updated by the event pump.
    pub(super) url_changes: watch::Receiver<String>,
    /// Event pump task handle.
    pub(super) event_task: tokio::task::JoinHandle<()>,
}

impl PageSession {
    /// Create a new page session.
    ///
    /// Spawns the event pump which consumes the session's CDP events and
    /// publishes them on the tick and URL watch channels.
    pub(crate) fn new(
        target_id: String,
        session_id: String,
        ws_tx: Arc<tokio::sync::Mutex<WsSink>>,
        pending: Arc<Mutex<HashMap<u64, PendingRequest>>>,
        request_id: Arc<AtomicU64>,
        event_rx: mpsc::UnboundedReceiver<CdpResponse>,
    ) -> Self {
        let (tick_tx, dom_ticks) = watch::channel(0u64);
        let (url_tx, url_changes) = watch::channel(String::new());

        let event_task = tokio::spawn(async move {
            Self::pump_events(event_rx, tick_tx, url_tx).await;
        });

        Self {
            target_id,
            session_id,
            ws_tx,
            pending,
            request_id,
            dom_ticks,
            url_changes,
            event_task,
        }
    }

    /// Get target ID.
    pub fn target_id(&self) -> &str {
        &self.target_id
    }

    /// Get session ID.
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Subscribe to DOM activity ticks.
    ///
    /// The counter advances whenever any CDP event arrives for this session,
    /// which makes it a cheap change signal for wait loops.
    pub fn dom_ticks(&self) -> watch::Receiver<u64> {
        self.dom_ticks.clone()
    }

    /// Subscribe to main-frame URL changes.
    ///
    /// Covers full navigations and same-document history/hash updates. The
    /// initial value is empty until the first navigation event arrives.
    pub fn url_changes(&self) -> watch::Receiver<String> {
        self.url_changes.clone()
    }

    /// Send a CDP command to this page session.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Result<Value, CdpError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = CdpRequest {
            id,
            method: method.to_string(),
            params,
            session_id: Some(self.session_id.clone()),
        };

        let json = serde_json::to_string(&request)?;
        trace!("CDP session send: {}", json);

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.pending.lock().insert(id, PendingRequest { tx });

        {
            let mut ws = self.ws_tx.lock().await;
            ws.send(Message::Text(json.into())).await?;
        }

        match tokio::time::timeout(std::time::Duration::from_secs(30), rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(CdpError::SessionClosed),
            Err(_) => {
                self.pending.lock().remove(&id);
                Err(CdpError::Timeout(format!("Request {} timed out", method)))
            }
        }
    }

    /// Enable required CDP domains.
    pub(crate) async fn enable_domains(&self) -> Result<(), CdpError> {
        self.call("Page.enable", None).await?;
        self.call("DOM.enable", None).await?;
        self.call("Runtime.enable", None).await?;

        debug!("Enabled CDP domains for session {}", self.session_id);
        Ok(())
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        self.event_task.abort();
    }
}
