use crate::config::ScoringConfig;
use crate::explorer::registry::ElementRegistry;
use crate::explorer::state::Action;
use crate::page::element::CandidateElement;
use crate::page::normalizer::PageKey;

/// Weighted score for one candidate. Higher wins; ties fall back to
/// document order, so the result is fully deterministic.
pub fn score(candidate: &CandidateElement, cfg: &ScoringConfig) -> i64 {
    let mut score = cfg.tag_weight(&candidate.tag);
    if candidate.is_labeled() {
        score += cfg.bonus_labeled;
    }
    if let Some(input_type) = &candidate.input_type {
        if cfg.has_affinity(input_type) {
            score += cfg.bonus_input_affinity;
        }
    }
    score
}

/// Pick the next action for the current page, or `None` when the registry
/// has exhausted every candidate (the caller then delegates to the stuck
/// detector). Pure function: no I/O, deterministic for identical inputs.
pub fn choose(
    candidates: &[CandidateElement],
    registry: &ElementRegistry,
    key: &PageKey,
    cfg: &ScoringConfig,
) -> Option<Action> {
    let winner = candidates
        .iter()
        .filter(|c| !registry.has(key, c.fingerprint))
        .max_by(|a, b| {
            score(a, cfg)
                .cmp(&score(b, cfg))
                // Earlier document order wins a tie, so invert for max_by.
                .then(b.doc_index.cmp(&a.doc_index))
        })?;

    let action = match winner.input_type.as_deref() {
        Some(input_type) if cfg.has_affinity(input_type) => Action::Type {
            fingerprint: winner.fingerprint,
            value: synthetic_value(input_type, winner.fingerprint),
        },
        _ => Action::Click {
            fingerprint: winner.fingerprint,
        },
    };
    Some(action)
}

/// Deterministic synthetic input shaped for the field's semantic type.
/// Derived from the fingerprint so repeated invocations agree.
pub fn synthetic_value(input_type: &str, fingerprint: u64) -> String {
    match input_type {
        "email" => format!("scout-{:06x}@example.org", fingerprint & 0xff_ffff),
        "search" => "exploration probe".to_string(),
        _ => format!("scout input {:04x}", fingerprint & 0xffff),
    }
}
