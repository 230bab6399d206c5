use std::collections::{HashMap, HashSet};

use crate::page::normalizer::PageKey;

/// Per-session record of which elements have already been acted upon, keyed
/// by normalized page. Never shared across sessions; dropped with the
/// session. Grows monotonically within a session.
#[derive(Debug, Default)]
pub struct ElementRegistry {
    acted: HashMap<PageKey, HashSet<u64>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has(&self, key: &PageKey, fingerprint: u64) -> bool {
        self.acted
            .get(key)
            .map(|set| set.contains(&fingerprint))
            .unwrap_or(false)
    }

    /// Idempotent: recording the same fingerprint twice is a no-op.
    /// Returns true when the fingerprint was not yet recorded.
    pub fn record(&mut self, key: &PageKey, fingerprint: u64) -> bool {
        self.acted.entry(key.clone()).or_default().insert(fingerprint)
    }

    pub fn count_on(&self, key: &PageKey) -> usize {
        self.acted.get(key).map(|set| set.len()).unwrap_or(0)
    }

    pub fn total_recorded(&self) -> usize {
        self.acted.values().map(|set| set.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizerConfig;
    use crate::page::normalizer::normalize_url;

    fn key(url: &str) -> PageKey {
        normalize_url(url, &NormalizerConfig::default()).unwrap()
    }

    #[test]
    fn record_is_idempotent() {
        let mut registry = ElementRegistry::new();
        let page = key("https://example.com/a");

        assert!(registry.record(&page, 7));
        assert!(!registry.record(&page, 7));
        assert_eq!(registry.count_on(&page), 1);
        assert!(registry.has(&page, 7));
    }

    #[test]
    fn pages_are_independent() {
        let mut registry = ElementRegistry::new();
        let a = key("https://example.com/a");
        let b = key("https://example.com/b");

        registry.record(&a, 7);
        assert!(registry.has(&a, 7));
        assert!(!registry.has(&b, 7));
        assert_eq!(registry.count_on(&b), 0);
        assert_eq!(registry.total_recorded(), 1);
    }

    #[test]
    fn cosmetic_url_variants_share_a_page() {
        let mut registry = ElementRegistry::new();
        registry.record(&key("https://example.com/a?utm_source=mail"), 7);
        assert!(registry.has(&key("https://example.com/a/"), 7));
    }
}
