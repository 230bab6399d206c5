use serde::{Deserialize, Serialize};

use crate::driver::PageElement;

/// An element eligible for interaction, derived per step from a snapshot.
/// Identified by a stable fingerprint rather than a DOM reference: the DOM
/// is re-fetched every step, so references never survive an iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateElement {
    pub fingerprint: u64,
    pub tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    pub doc_index: usize,
}

impl CandidateElement {
    pub fn from_page_element(el: &PageElement) -> Self {
        Self {
            fingerprint: fingerprint(el),
            tag: el.tag.clone(),
            role: el.role.clone(),
            aria_label: el.aria_label.clone(),
            visible_text: el.visible_text.clone(),
            input_type: el.input_type.clone(),
            doc_index: el.doc_index,
        }
    }

    /// True when the element carries any human-readable label.
    pub fn is_labeled(&self) -> bool {
        non_empty(&self.visible_text) || non_empty(&self.aria_label)
    }
}

fn non_empty(s: &Option<String>) -> bool {
    s.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
}

/// Stable identity hash over the element's structural attributes. Two
/// snapshots of the same logical element must fingerprint identically, so
/// only attributes that survive a re-render participate.
pub fn fingerprint(el: &PageElement) -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    el.tag.hash(&mut hasher);
    el.id.hash(&mut hasher);
    el.name.hash(&mut hasher);
    el.role.hash(&mut hasher);
    el.aria_label.hash(&mut hasher);
    el.input_type.hash(&mut hasher);
    if let Some(text) = &el.visible_text {
        text.trim().hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag: &str, id: Option<&str>, text: Option<&str>) -> PageElement {
        PageElement {
            tag: tag.into(),
            id: id.map(Into::into),
            visible_text: text.map(Into::into),
            is_visible: true,
            is_interactable: true,
            width: 100.0,
            height: 20.0,
            ..Default::default()
        }
    }

    #[test]
    fn fingerprint_is_stable_across_refetch() {
        let mut a = element("button", Some("buy"), Some("Buy now"));
        let mut b = element("button", Some("buy"), Some("Buy now"));
        // Position in document order may shift between snapshots.
        a.doc_index = 3;
        b.doc_index = 7;
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn fingerprint_distinguishes_attributes() {
        let a = element("button", Some("buy"), Some("Buy now"));
        let b = element("button", Some("cancel"), Some("Buy now"));
        let c = element("a", Some("buy"), Some("Buy now"));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn fingerprint_ignores_surrounding_whitespace() {
        let a = element("a", None, Some("More info"));
        let b = element("a", None, Some("  More info \n"));
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn labeled_requires_non_blank_text() {
        let labeled = CandidateElement::from_page_element(&element("a", None, Some("Docs")));
        let blank = CandidateElement::from_page_element(&element("a", None, Some("   ")));
        assert!(labeled.is_labeled());
        assert!(!blank.is_labeled());
    }
}
