//! Chrome DevTools Protocol (CDP) client for page automation.
//!
//! This crate provides a pure Rust CDP client. It connects to Chrome/Chromium
//! via WebSocket and communicates using the CDP JSON-RPC protocol. It is built
//! to drive a browser the user is already logged into, so it attaches to a
//! running Chrome (or launches one with a persistent profile) instead of
//! spinning up a throwaway instance.
//!
//! ## Setup
//!
//! Start Chrome with remote debugging enabled:
//!
//! ```bash
//! # macOS
//! /Applications/Google\ Chrome.app/Contents/MacOS/Google\ Chrome --remote-debugging-port=9222
//!
//! # Linux
//! google-chrome --remote-debugging-port=9222
//! ```
//!
//! Or let [`Browser`] launch one with its own profile directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let browser = Browser::new(BrowserConfig::default());
//! browser.connect().await?;
//! let page = browser.attach_or_open("/icon/draft/", None).await?;
//! let items = page.query_selector_all(".card").await?;
//! ```
//!
//! ## Events
//!
//! Each [`PageSession`] pumps CDP events for its target into two watch
//! channels: a DOM activity tick that advances whenever any event arrives for
//! the session, and the current main-frame URL which follows both full
//! navigations and history/hash changes. Callers subscribe via
//! [`PageSession::dom_ticks`] and [`PageSession::url_changes`].

mod browser;
mod client;
mod error;
mod protocol;
mod session;

pub use browser::{Browser, BrowserConfig, BrowserError};
pub use client::CdpClient;
pub use error::CdpError;
pub use protocol::*;
pub use session::PageSession;
