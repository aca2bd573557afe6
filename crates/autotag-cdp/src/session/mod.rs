//! CDP page session for interacting with a single page.

mod core;
mod dom;
mod events;
mod input;
mod js;
mod page;

pub use self::core::PageSession;
