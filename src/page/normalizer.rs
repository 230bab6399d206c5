use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::NormalizerConfig;
use crate::driver::PageElement;
use crate::errors::WebScoutResult;
use crate::page::element::CandidateElement;

/// Canonical identity of a page. Collapses cosmetic URL differences so the
/// element registry treats revisits of the same logical page as one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageKey(String);

impl PageKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonicalize a URL: lowercased host, trailing slash stripped, fragment
/// dropped, volatile query params removed per the deny rules, survivors
/// re-serialized in sorted order.
pub fn normalize_url(raw: &str, cfg: &NormalizerConfig) -> WebScoutResult<PageKey> {
    let parsed = Url::parse(raw)?;

    let host = parsed.host_str().unwrap_or("").to_ascii_lowercase();
    let path = parsed.path().trim_end_matches('/');

    let mut kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !is_dropped_param(k, cfg))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    kept.sort();

    // `Url::port()` is None for a scheme's default port, so default ports
    // never show up in the key.
    let mut key = match parsed.port() {
        Some(port) => format!("{}://{}:{}{}", parsed.scheme(), host, port, path),
        None => format!("{}://{}{}", parsed.scheme(), host, path),
    };
    if !kept.is_empty() {
        let query: Vec<String> = kept.iter().map(|(k, v)| format!("{k}={v}")).collect();
        key.push('?');
        key.push_str(&query.join("&"));
    }

    Ok(PageKey(key))
}

fn is_dropped_param(name: &str, cfg: &NormalizerConfig) -> bool {
    cfg.drop_params.iter().any(|p| p == name)
        || cfg.drop_param_prefixes.iter().any(|p| name.starts_with(p.as_str()))
}

/// Structural priority class used for bounded-cost truncation: interactive
/// tags come before generic clickable containers, before any scoring runs.
fn priority_class(el: &PageElement) -> u8 {
    match el.tag.as_str() {
        "a" | "button" | "input" | "select" | "textarea" => 0,
        _ => match el.role.as_deref() {
            Some("button") | Some("link") | Some("textbox") => 0,
            _ => 1,
        },
    }
}

/// Map a raw `(url, snapshot elements)` pair to its page key and filtered
/// candidate list. Pure function of its inputs plus the filtering policy.
pub fn normalize(
    url: &str,
    elements: &[PageElement],
    cfg: &NormalizerConfig,
) -> WebScoutResult<(PageKey, Vec<CandidateElement>)> {
    let key = normalize_url(url, cfg)?;

    let mut eligible: Vec<&PageElement> = elements
        .iter()
        .filter(|el| {
            el.is_visible
                && el.is_interactable
                && el.width >= cfg.min_element_size
                && el.height >= cfg.min_element_size
        })
        .collect();

    eligible.sort_by_key(|el| (priority_class(el), el.doc_index));
    eligible.truncate(cfg.max_candidates);

    let candidates = eligible
        .into_iter()
        .map(CandidateElement::from_page_element)
        .collect();

    Ok((key, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> NormalizerConfig {
        NormalizerConfig::default()
    }

    fn visible(tag: &str, doc_index: usize) -> PageElement {
        PageElement {
            tag: tag.into(),
            is_visible: true,
            is_interactable: true,
            width: 50.0,
            height: 20.0,
            doc_index,
            ..Default::default()
        }
    }

    #[test]
    fn tracking_params_collapse_to_one_key() {
        let a = normalize_url("https://example.com/pricing?utm_source=x&utm_campaign=y", &cfg()).unwrap();
        let b = normalize_url("https://example.com/pricing?gclid=abc123", &cfg()).unwrap();
        let c = normalize_url("https://example.com/pricing/", &cfg()).unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn meaningful_params_are_kept_and_sorted() {
        let a = normalize_url("https://example.com/search?q=rust&page=2", &cfg()).unwrap();
        let b = normalize_url("https://example.com/search?page=2&q=rust", &cfg()).unwrap();
        assert_eq!(a, b);
        assert!(a.as_str().contains("page=2"));
        assert!(a.as_str().contains("q=rust"));
    }

    #[test]
    fn fragment_and_host_case_do_not_matter() {
        let a = normalize_url("https://Example.COM/docs#install", &cfg()).unwrap();
        let b = normalize_url("https://example.com/docs", &cfg()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn malformed_url_is_an_error() {
        assert!(normalize_url("not a url", &cfg()).is_err());
    }

    #[test]
    fn filtering_drops_hidden_and_tiny_elements() {
        let mut hidden = visible("button", 0);
        hidden.is_visible = false;
        let mut inert = visible("button", 1);
        inert.is_interactable = false;
        let mut tiny = visible("button", 2);
        tiny.width = 1.0;
        let kept = visible("button", 3);

        let (_, candidates) =
            normalize("https://example.com", &[hidden, inert, tiny, kept], &cfg()).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].doc_index, 3);
    }

    #[test]
    fn truncation_prefers_interactive_tags() {
        let mut elements: Vec<PageElement> = (0..5).map(|i| visible("div", i)).collect();
        elements.push(visible("button", 5));
        elements.push(visible("a", 6));

        let mut config = cfg();
        config.max_candidates = 2;

        let (_, candidates) = normalize("https://example.com", &elements, &config).unwrap();
        let tags: Vec<&str> = candidates.iter().map(|c| c.tag.as_str()).collect();
        assert_eq!(tags, vec!["button", "a"]);
    }

    #[test]
    fn role_promotes_generic_containers() {
        let mut clickable_div = visible("div", 0);
        clickable_div.role = Some("button".into());
        let plain_div = visible("div", 1);

        let mut config = cfg();
        config.max_candidates = 1;

        let (_, candidates) =
            normalize("https://example.com", &[plain_div, clickable_div], &config).unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].doc_index, 0);
    }
}
