//! Scroll preload.
//!
//! The page lazy-loads cards and their suggestion panels as they scroll into
//! view. Before a batch we walk the whole page once: scroll down in viewport
//! sized steps until the content height stops growing, make sure the bottom
//! was really reached, then scroll back up so processing starts from the
//! top with everything mounted.

use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::config::PreloadConfig;
use crate::error::PageError;
use crate::page::DraftPage;

/// Height changes below this are jitter, not new content.
const HEIGHT_EPSILON: f64 = 8.0;

/// Step cap for the bottom and top correction loops.
const MAX_GUARD_STEPS: u32 = 200;

fn scroll_step(viewport_h: f64) -> f64 {
    (viewport_h * 0.9).round().max(180.0)
}

pub(crate) async fn preload_by_scrolling(
    page: &dyn DraftPage,
    config: &PreloadConfig,
) -> Result<(), PageError> {
    let deadline = Instant::now() + Duration::from_millis(config.max_duration_ms);
    let pause = Duration::from_millis(config.pause_ms);

    debug!("preloading the page by scrolling");

    let mut last_height = -1.0_f64;
    let mut stable = 0u32;
    while Instant::now() < deadline && stable < config.stable_cycles {
        let m = page.scroll_metrics().await?;
        if m.scroll_y + m.viewport_h + 12.0 < m.content_h {
            page.scroll_by(scroll_step(m.viewport_h)).await?;
        } else {
            // Already at the bottom; nudge to trigger any last lazy load.
            page.scroll_by((m.viewport_h * 0.1).round().max(8.0)).await?;
        }
        tokio::time::sleep(pause).await;

        let height = page.scroll_metrics().await?.content_h;
        if (height - last_height).abs() < HEIGHT_EPSILON {
            stable += 1;
        } else {
            stable = 0;
        }
        last_height = height;
    }

    // The duration cap can cut the loop off early; finish the descent.
    let mut guard = 0;
    loop {
        let m = page.scroll_metrics().await?;
        if m.scroll_y + m.viewport_h + 2.0 >= m.content_h || guard >= MAX_GUARD_STEPS {
            break;
        }
        page.scroll_by(scroll_step(m.viewport_h)).await?;
        tokio::time::sleep(pause).await;
        guard += 1;
    }
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Walk back up so the batch starts from the first card.
    let mut guard = 0;
    loop {
        let m = page.scroll_metrics().await?;
        if m.scroll_y <= 2.0 || guard >= MAX_GUARD_STEPS {
            break;
        }
        page.scroll_by(-scroll_step(m.viewport_h)).await?;
        tokio::time::sleep(pause).await;
        guard += 1;
    }
    page.scroll_to_top().await?;
    tokio::time::sleep(Duration::from_millis(250)).await;

    debug!("preload finished");
    Ok(())
}
