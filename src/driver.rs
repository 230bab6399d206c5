use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::WebScoutResult;
use crate::explorer::state::Action;

/// One raw element as reported by the browser driver. The core never parses
/// markup; the driver is responsible for flattening the DOM into these fields.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageElement {
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_text: Option<String>,
    /// `type` attribute for input fields.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    pub is_visible: bool,
    pub is_interactable: bool,
    pub width: f64,
    pub height: f64,
    /// Position in document order, assigned by the driver.
    pub doc_index: usize,
}

/// A page as seen at one instant: the DOM is re-fetched every step, so
/// nothing in here is a live reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub elements: Vec<PageElement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DispatchOutcome {
    pub fn ok(new_url: impl Into<String>) -> Self {
        Self {
            success: true,
            new_url: Some(new_url.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            new_url: None,
            error: Some(error.into()),
        }
    }
}

/// Seam to the external browser-control layer. One browser context per
/// session id; timeouts (page settle, element waits) live behind this trait,
/// not in the core.
#[async_trait]
pub trait PageDriver: Send + Sync {
    async fn snapshot(&self, session_id: &str) -> WebScoutResult<PageSnapshot>;

    async fn dispatch(&self, session_id: &str, action: &Action) -> WebScoutResult<DispatchOutcome>;
}
