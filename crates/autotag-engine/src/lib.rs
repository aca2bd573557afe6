//! Core engine for tagging draft items on the upload review page.
//!
//! The engine is split along one seam: [`DraftPage`] describes everything the
//! automation needs from the page (find items, count tags, click the
//! suggestion controls), and [`CdpDraftPage`] implements it over a live
//! Chrome DevTools session. Everything above the trait is pure control flow:
//! a per-item state machine, a batch scheduler that works in bounded groups,
//! and an [`Orchestrator`] that ties readiness waits, preloading and
//! navigation watching together.
//!
//! ```no_run
//! use std::sync::Arc;
//! use autotag_cdp::{Browser, BrowserConfig};
//! use autotag_engine::{CdpDraftPage, Config, Orchestrator};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let browser = Browser::new(BrowserConfig::default());
//! browser.connect().await?;
//!
//! let session = browser.attach_or_open("/icon/draft/", None).await?;
//! let page = Arc::new(CdpDraftPage::new(session, &config));
//! let orchestrator = Arc::new(Orchestrator::new(page, config));
//! orchestrator.start().await?;
//! # Ok(())
//! # }
//! ```

mod cdp_page;
mod config;
mod error;
mod item;
mod keywords;
mod orchestrator;
mod page;
mod preload;
mod scheduler;
mod status;
mod wait;

#[cfg(test)]
mod testutil;

pub use cdp_page::CdpDraftPage;
pub use config::{Config, ConfigError};
pub use error::{EngineError, PageError};
pub use keywords::{derive_keywords, pick_keyword};
pub use orchestrator::Orchestrator;
pub use page::{DraftPage, ItemHandle, PageResult, ScrollMetrics};
pub use scheduler::BatchSummary;
pub use status::{RunStatus, StatusBoard};
