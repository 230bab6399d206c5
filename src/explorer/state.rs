use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::explorer::registry::ElementRegistry;
use crate::page::element::CandidateElement;
use crate::page::normalizer::PageKey;

/// Lifecycle states of one exploration session. Transitions happen only
/// inside the run loop.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SessionStatus {
    Idle,
    Running,
    Completed { reason: CompletionReason },
    Stopped,
    Error { message: String },
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed { .. } | SessionStatus::Stopped | SessionStatus::Error { .. }
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            SessionStatus::Idle => "idle",
            SessionStatus::Running => "running",
            SessionStatus::Completed { .. } => "completed",
            SessionStatus::Stopped => "stopped",
            SessionStatus::Error { .. } => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionReason {
    /// The stuck detector ran out of recovery options. A normal terminal
    /// state, not an error. Running out of step budget does not complete a
    /// session; it just ends the run call.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    Click { fingerprint: u64 },
    Type { fingerprint: u64, value: String },
    Scroll,
    Back,
}

impl Action {
    pub fn label(&self) -> &'static str {
        match self {
            Action::Click { .. } => "click",
            Action::Type { .. } => "type",
            Action::Scroll => "scroll",
            Action::Back => "back",
        }
    }

    pub fn target_fingerprint(&self) -> Option<u64> {
        match self {
            Action::Click { fingerprint } | Action::Type { fingerprint, .. } => Some(*fingerprint),
            Action::Scroll | Action::Back => None,
        }
    }
}

/// Immutable once appended to the session history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub step_number: u32,
    pub action: Action,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_fingerprint: Option<u64>,
    pub success: bool,
    pub resulting_url: String,
    pub element_count_after: usize,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// What one call to `step()` produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepOutcome {
    Recorded(StepRecord),
    /// The session reached a terminal status before any action was taken.
    Finished { reason: CompletionReason },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub session_id: String,
    pub records: Vec<StepRecord>,
    pub steps_completed: u32,
    pub successful_steps: u32,
    pub status: SessionStatus,
}

/// Point-in-time view returned by `stats()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: String,
    pub start_url: String,
    pub current_url: String,
    pub status: SessionStatus,
    pub step_count: u32,
    pub successful_steps: u32,
    pub stuck_counter: u32,
    pub pages_visited: usize,
    pub elements_acted: usize,
}

/// The session's current idea of the page it is on: the result of the last
/// snapshot, folded back after every dispatch so the next step never scores
/// against a stale DOM.
#[derive(Debug, Clone)]
pub struct PageView {
    pub key: PageKey,
    pub candidates: Vec<CandidateElement>,
}

/// One independent exploration run. Owned exclusively by its loop task; the
/// store hands out the owning handle, never a shared mutable reference.
pub struct ExplorationSession {
    pub session_id: String,
    pub start_url: String,
    pub current_url: String,
    pub status: SessionStatus,
    pub step_count: u32,
    pub successful_steps: u32,
    pub stuck_counter: u32,
    pub registry: ElementRegistry,
    pub current_view: Option<PageView>,
    history: Vec<StepRecord>,
    visited: HashSet<PageKey>,
    discovered: HashMap<PageKey, HashSet<u64>>,
}

impl ExplorationSession {
    pub fn new(session_id: String, start_url: String) -> Self {
        Self {
            current_url: start_url.clone(),
            session_id,
            start_url,
            status: SessionStatus::Idle,
            step_count: 0,
            successful_steps: 0,
            stuck_counter: 0,
            registry: ElementRegistry::new(),
            current_view: None,
            history: Vec::new(),
            visited: HashSet::new(),
            discovered: HashMap::new(),
        }
    }

    pub fn history(&self) -> &[StepRecord] {
        &self.history
    }

    pub fn has_visited(&self, key: &PageKey) -> bool {
        self.visited.contains(key)
    }

    pub fn mark_visited(&mut self, key: &PageKey) -> bool {
        self.visited.insert(key.clone())
    }

    /// Fold a page's candidate fingerprints into the per-page discovery set,
    /// returning how many were new. Feeds stuck detection, not the registry.
    pub fn note_discovered(&mut self, key: &PageKey, fingerprints: &[u64]) -> usize {
        let seen = self.discovered.entry(key.clone()).or_default();
        fingerprints.iter().filter(|fp| seen.insert(**fp)).count()
    }

    /// Append one record. Counters move exactly once per loop iteration.
    pub fn record_step(&mut self, record: StepRecord) {
        self.step_count += 1;
        if record.success {
            self.successful_steps += 1;
        }
        self.current_url = record.resulting_url.clone();
        self.history.push(record);
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.session_id.clone(),
            start_url: self.start_url.clone(),
            current_url: self.current_url.clone(),
            status: self.status.clone(),
            step_count: self.step_count,
            successful_steps: self.successful_steps,
            stuck_counter: self.stuck_counter,
            pages_visited: self.visited.len(),
            elements_acted: self.registry.total_recorded(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(step_number: u32, success: bool) -> StepRecord {
        StepRecord {
            step_number,
            action: Action::Scroll,
            target_fingerprint: None,
            success,
            resulting_url: "https://example.com".into(),
            element_count_after: 0,
            timestamp: chrono::Utc::now(),
        }
    }

    #[test]
    fn counters_stay_consistent() {
        let mut session =
            ExplorationSession::new("s1".into(), "https://example.com".into());
        session.record_step(record(1, true));
        session.record_step(record(2, false));
        session.record_step(record(3, true));

        assert_eq!(session.step_count, 3);
        assert_eq!(session.successful_steps, 2);
        assert!(session.successful_steps <= session.step_count);
        assert_eq!(session.history().len(), 3);
    }

    #[test]
    fn discovery_counts_only_new_fingerprints() {
        let mut session =
            ExplorationSession::new("s1".into(), "https://example.com".into());
        let key = crate::page::normalizer::normalize_url(
            "https://example.com",
            &crate::config::NormalizerConfig::default(),
        )
        .unwrap();

        assert_eq!(session.note_discovered(&key, &[1, 2, 3]), 3);
        assert_eq!(session.note_discovered(&key, &[2, 3, 4]), 1);
        assert_eq!(session.note_discovered(&key, &[1, 2]), 0);
    }

    #[test]
    fn terminal_statuses() {
        assert!(!SessionStatus::Idle.is_terminal());
        assert!(!SessionStatus::Running.is_terminal());
        assert!(SessionStatus::Stopped.is_terminal());
        assert!(SessionStatus::Completed {
            reason: CompletionReason::Exhausted
        }
        .is_terminal());
        assert!(SessionStatus::Error {
            message: "boom".into()
        }
        .is_terminal());
    }

    #[test]
    fn action_serialization_is_tagged() {
        let action = Action::Type {
            fingerprint: 42,
            value: "probe@example.org".into(),
        };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["type"], "type");
        assert_eq!(json["fingerprint"], 42);
        assert_eq!(action.target_fingerprint(), Some(42));
        assert_eq!(Action::Back.target_fingerprint(), None);
    }
}
