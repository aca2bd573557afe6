//! DOM operations for CDP page session.

use std::collections::HashMap;

use serde_json::json;

use crate::error::CdpError;
use crate::protocol::{BoxModel, RemoteObject};

use super::core::PageSession;

impl PageSession {
    /// Get the document root node ID.
    pub async fn document_root(&self) -> Result<i64, CdpError> {
        let result = self
            .call("DOM.getDocument", Some(json!({"depth": 0})))
            .await?;

        result["root"]["nodeId"]
            .as_i64()
            .ok_or_else(|| CdpError::InvalidResponse("Missing document root".to_string()))
    }

    /// Query selector against the whole document.
    pub async fn query_selector(&self, selector: &str) -> Result<Option<i64>, CdpError> {
        let root = self.document_root().await?;
        self.query_selector_within(root, selector).await
    }

    /// Query selector scoped to a node's subtree.
    pub async fn query_selector_within(
        &self,
        node_id: i64,
        selector: &str,
    ) -> Result<Option<i64>, CdpError> {
        let result = self
            .call(
                "DOM.querySelector",
                Some(json!({
                    "nodeId": node_id,
                    "selector": selector,
                })),
            )
            .await?;

        let found = result["nodeId"].as_i64().unwrap_or(0);
        if found == 0 { Ok(None) } else { Ok(Some(found)) }
    }

    /// Query selector all against the whole document.
    pub async fn query_selector_all(&self, selector: &str) -> Result<Vec<i64>, CdpError> {
        let root = self.document_root().await?;
        self.query_selector_all_within(root, selector).await
    }

    /// Query selector all scoped to a node's subtree.
    pub async fn query_selector_all_within(
        &self,
        node_id: i64,
        selector: &str,
    ) -> Result<Vec<i64>, CdpError> {
        let result = self
            .call(
                "DOM.querySelectorAll",
                Some(json!({
                    "nodeId": node_id,
                    "selector": selector,
                })),
            )
            .await?;

        let node_ids: Vec<i64> = result["nodeIds"]
            .as_array()
            .map(|arr| arr.iter().filter_map(|v| v.as_i64()).collect())
            .unwrap_or_default();

        Ok(node_ids)
    }

    /// Get box model for node.
    ///
    /// Returns `None` when the node has no layout (hidden or detached).
    pub async fn get_box_model(&self, node_id: i64) -> Result<Option<BoxModel>, CdpError> {
        let result = self
            .call("DOM.getBoxModel", Some(json!({"nodeId": node_id})))
            .await;

        match result {
            Ok(r) => {
                let model: BoxModel = serde_json::from_value(r["model"].clone())?;
                Ok(Some(model))
            }
            Err(CdpError::Protocol { code: -32000, .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get element attributes as a name/value map.
    ///
    /// CDP returns attributes as a flat interleaved array.
    pub async fn get_attributes(&self, node_id: i64) -> Result<HashMap<String, String>, CdpError> {
        let result = self
            .call("DOM.getAttributes", Some(json!({"nodeId": node_id})))
            .await?;

        let mut attrs = HashMap::new();
        if let Some(flat) = result["attributes"].as_array() {
            for pair in flat.chunks(2) {
                if let [name, value] = pair {
                    if let (Some(name), Some(value)) = (name.as_str(), value.as_str()) {
                        attrs.insert(name.to_string(), value.to_string());
                    }
                }
            }
        }

        Ok(attrs)
    }

    /// Set an attribute on an element.
    pub async fn set_attribute(
        &self,
        node_id: i64,
        name: &str,
        value: &str,
    ) -> Result<(), CdpError> {
        self.call(
            "DOM.setAttributeValue",
            Some(json!({
                "nodeId": node_id,
                "name": name,
                "value": value,
            })),
        )
        .await?;
        Ok(())
    }

    /// Scroll element into view if needed.
    pub async fn scroll_into_view(&self, node_id: i64) -> Result<(), CdpError> {
        self.call(
            "DOM.scrollIntoViewIfNeeded",
            Some(json!({"nodeId": node_id})),
        )
        .await?;
        Ok(())
    }

    /// Resolve node to runtime object.
    pub async fn resolve_node(&self, node_id: i64) -> Result<RemoteObject, CdpError> {
        let result = self
            .call("DOM.resolveNode", Some(json!({"nodeId": node_id})))
            .await?;

        let obj: RemoteObject = serde_json::from_value(result["object"].clone())?;
        Ok(obj)
    }

    /// Focus element.
    pub async fn focus(&self, node_id: i64) -> Result<(), CdpError> {
        self.call("DOM.focus", Some(json!({"nodeId": node_id})))
            .await?;
        Ok(())
    }

    /// Get an element's text content.
    pub async fn node_text(&self, node_id: i64) -> Result<String, CdpError> {
        let obj = self.resolve_node(node_id).await?;
        let Some(object_id) = obj.object_id else {
            return Ok(String::new());
        };

        let value = self
            .call_function_on(
                &object_id,
                "function() { return this.textContent || ''; }",
                None,
            )
            .await?;

        Ok(value.as_str().unwrap_or("").to_string())
    }

    /// Get an input element's current value.
    pub async fn input_value(&self, node_id: i64) -> Result<String, CdpError> {
        let obj = self.resolve_node(node_id).await?;
        let Some(object_id) = obj.object_id else {
            return Ok(String::new());
        };

        let value = self
            .call_function_on(&object_id, "function() { return this.value || ''; }", None)
            .await?;

        Ok(value.as_str().unwrap_or("").to_string())
    }

    /// Click an element at the center of its content box.
    pub async fn click_node(&self, node_id: i64) -> Result<(), CdpError> {
        let box_model = self
            .get_box_model(node_id)
            .await?
            .ok_or_else(|| CdpError::ElementNotFound(format!("node {} (not visible)", node_id)))?;

        let (x, y) = Self::quad_center(&box_model.content);
        self.click(x, y).await
    }

    /// Calculate center point of a quad.
    pub(super) fn quad_center(quad: &[f64]) -> (f64, f64) {
        if quad.len() >= 8 {
            let x = (quad[0] + quad[2] + quad[4] + quad[6]) / 4.0;
            let y = (quad[1] + quad[3] + quad[5] + quad[7]) / 4.0;
            (x, y)
        } else {
            (0.0, 0.0)
        }
    }
}
