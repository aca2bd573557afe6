//! Page level operations for CDP page session.

use crate::error::CdpError;
use crate::protocol::LayoutMetrics;

use super::core::PageSession;

impl PageSession {
    /// Read scroll position, viewport size and content size.
    pub async fn layout_metrics(&self) -> Result<LayoutMetrics, CdpError> {
        let result = self.call("Page.getLayoutMetrics", None).await?;

        let viewport = &result["cssVisualViewport"];
        let content = &result["cssContentSize"];

        Ok(LayoutMetrics {
            scroll_x: viewport["pageX"].as_f64().unwrap_or(0.0),
            scroll_y: viewport["pageY"].as_f64().unwrap_or(0.0),
            viewport_width: viewport["clientWidth"].as_f64().unwrap_or(0.0),
            viewport_height: viewport["clientHeight"].as_f64().unwrap_or(0.0),
            content_width: content["width"].as_f64().unwrap_or(0.0),
            content_height: content["height"].as_f64().unwrap_or(0.0),
        })
    }

    /// Get current URL.
    pub async fn current_url(&self) -> Result<String, CdpError> {
        let result = self.evaluate("window.location.href").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }

    /// Get page title.
    pub async fn title(&self) -> Result<String, CdpError> {
        let result = self.evaluate("document.title").await?;
        Ok(result.as_str().unwrap_or("").to_string())
    }
}
