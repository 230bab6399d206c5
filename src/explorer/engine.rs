use std::sync::Arc;

use url::Url;

use crate::config::ExploreConfig;
use crate::driver::PageDriver;
use crate::errors::{WebScoutError, WebScoutResult};
use crate::explorer::events::{EventBus, StepEvent};
use crate::explorer::prioritizer;
use crate::explorer::state::{
    CompletionReason, ExplorationSession, PageView, RunSummary, SessionSnapshot, SessionStatus,
    StepOutcome, StepRecord,
};
use crate::explorer::store::SessionStore;
use crate::explorer::stuck::{fold_observation, Recovery, StepObservation};
use crate::page::normalizer;

/// Step executor and run loop for all exploration sessions. Sessions are
/// independent units of concurrency; within one session, steps are strictly
/// serialized behind the session's own lock.
pub struct ExplorationEngine {
    store: Arc<SessionStore>,
    driver: Arc<dyn PageDriver>,
    config: ExploreConfig,
    events: EventBus,
}

impl ExplorationEngine {
    pub fn new(driver: Arc<dyn PageDriver>, config: ExploreConfig) -> Self {
        Self {
            store: Arc::new(SessionStore::new()),
            driver,
            config,
            events: EventBus::new(),
        }
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<StepEvent> {
        self.events.subscribe()
    }

    pub fn sessions(&self) -> Vec<String> {
        self.store.ids()
    }

    /// Create a new exploration session. The start URL is validated before
    /// any session object exists.
    pub fn start(&self, start_url: &str) -> WebScoutResult<String> {
        let parsed =
            Url::parse(start_url).map_err(|_| WebScoutError::InvalidUrl(start_url.to_string()))?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(WebScoutError::InvalidUrl(start_url.to_string()));
        }

        let session_id = uuid::Uuid::new_v4().to_string();
        let session = ExplorationSession::new(session_id.clone(), start_url.to_string());
        self.store.insert(session);
        tracing::info!(session = %session_id, url = %start_url, "exploration session started");
        Ok(session_id)
    }

    pub async fn stats(&self, session_id: &str) -> WebScoutResult<SessionSnapshot> {
        let handle = self.store.get(session_id)?;
        let session = handle.session.lock().await;
        Ok(session.snapshot())
    }

    /// Ask a running loop to exit at the next iteration boundary. In-flight
    /// actions are never interrupted.
    pub fn stop(&self, session_id: &str) -> WebScoutResult<()> {
        let handle = self.store.get(session_id)?;
        handle.request_stop();
        tracing::info!(session = %session_id, "stop requested");
        Ok(())
    }

    /// Destroy a session. Any loop still running is signalled to stop first;
    /// its in-memory state goes away with the last handle.
    pub async fn end(&self, session_id: &str) -> WebScoutResult<()> {
        let handle = self.store.remove(session_id)?;
        handle.request_stop();
        let mut session = handle.session.lock().await;
        if !session.status.is_terminal() {
            session.status = SessionStatus::Stopped;
        }
        tracing::info!(session = %session_id, "exploration session ended");
        Ok(())
    }

    /// Perform exactly one iteration for the session and return its record.
    pub async fn step(&self, session_id: &str) -> WebScoutResult<StepOutcome> {
        let handle = self.store.get(session_id)?;
        let mut session = handle.session.lock().await;
        if session.status.is_terminal() {
            return Err(WebScoutError::SessionNotRunnable {
                id: session_id.to_string(),
                status: session.status.label().to_string(),
            });
        }

        let outcome = self.execute_step(&mut session).await;
        self.emit_for(&session, &outcome);
        Ok(outcome)
    }

    /// Autonomous run: serial step iterations until the budget is spent, the
    /// session reaches a terminal status, or a stop signal is observed
    /// between iterations.
    pub async fn run(&self, session_id: &str, max_steps: Option<u32>) -> WebScoutResult<RunSummary> {
        let handle = self.store.get(session_id)?;
        let budget = max_steps.unwrap_or(self.config.limits.max_steps);

        {
            let mut session = handle.session.lock().await;
            if session.status.is_terminal() {
                return Err(WebScoutError::SessionNotRunnable {
                    id: session_id.to_string(),
                    status: session.status.label().to_string(),
                });
            }
            session.status = SessionStatus::Running;
        }

        let mut records = Vec::new();
        for _ in 0..budget {
            if handle.stop_requested() {
                let mut session = handle.session.lock().await;
                session.status = SessionStatus::Stopped;
                tracing::info!(session = %session_id, "run loop observed stop signal");
                self.emit_final(&session);
                break;
            }

            let mut session = handle.session.lock().await;
            let outcome = self.execute_step(&mut session).await;
            self.emit_for(&session, &outcome);
            match outcome {
                StepOutcome::Recorded(record) => records.push(record),
                StepOutcome::Finished { reason } => {
                    tracing::info!(session = %session_id, ?reason, "exploration finished");
                    break;
                }
            }
        }

        let mut session = handle.session.lock().await;
        // Budget ran out mid-exploration: the session stays usable.
        if session.status == SessionStatus::Running {
            session.status = SessionStatus::Idle;
        }

        let successful_steps = records.iter().filter(|r| r.success).count() as u32;
        Ok(RunSummary {
            session_id: session_id.to_string(),
            steps_completed: records.len() as u32,
            successful_steps,
            status: session.status.clone(),
            records,
        })
    }

    fn emit_for(&self, session: &ExplorationSession, outcome: &StepOutcome) {
        match outcome {
            StepOutcome::Recorded(record) => {
                self.events.emit(StepEvent {
                    session_id: session.session_id.clone(),
                    step: record.clone(),
                    total_steps: session.step_count,
                    done: session.status.is_terminal(),
                });
            }
            StepOutcome::Finished { .. } => self.emit_final(session),
        }
    }

    /// Closing event for a session that just reached a terminal status: the
    /// last record is re-sent with `done: true` so subscribers learn the run
    /// is over. A session that never completed a step has nothing to send.
    fn emit_final(&self, session: &ExplorationSession) {
        if let Some(record) = session.history().last() {
            self.events.emit(StepEvent {
                session_id: session.session_id.clone(),
                step: record.clone(),
                total_steps: session.step_count,
                done: true,
            });
        }
    }

    // ── One step: normalize → prioritize/recover → dispatch → fold ────────

    async fn execute_step(&self, session: &mut ExplorationSession) -> StepOutcome {
        let session_id = session.session_id.clone();

        // Make sure we have a folded view of the current page. A failed
        // snapshot is a no-progress signal, not a session abort.
        let mut pre_snapshot_failed = false;
        if session.current_view.is_none() {
            match self.driver.snapshot(&session_id).await {
                Ok(snapshot) => match normalizer::normalize(
                    &snapshot.url,
                    &snapshot.elements,
                    &self.config.normalizer,
                ) {
                    Ok((key, candidates)) => {
                        let fingerprints: Vec<u64> =
                            candidates.iter().map(|c| c.fingerprint).collect();
                        session.note_discovered(&key, &fingerprints);
                        session.mark_visited(&key);
                        session.current_url = snapshot.url.clone();
                        session.current_view = Some(PageView { key, candidates });
                    }
                    Err(e) => {
                        tracing::warn!(session = %session_id, error = %e, "unparseable page url");
                        session.stuck_counter += 1;
                        pre_snapshot_failed = true;
                    }
                },
                Err(e) => {
                    tracing::warn!(session = %session_id, error = %e, "snapshot failed");
                    session.stuck_counter += 1;
                    pre_snapshot_failed = true;
                }
            }
        }

        // Choose an action: prioritizer first, recovery when it comes up dry.
        let pre_key = session.current_view.as_ref().map(|v| v.key.clone());
        let action = match session.current_view.as_ref().and_then(|view| {
            prioritizer::choose(
                &view.candidates,
                &session.registry,
                &view.key,
                &self.config.scoring,
            )
        }) {
            Some(action) => action,
            None => match Recovery::decide(session.stuck_counter, &self.config.stuck).action() {
                Some(action) => {
                    tracing::debug!(
                        session = %session_id,
                        stuck = session.stuck_counter,
                        recovery = action.label(),
                        "no fresh candidate, applying recovery"
                    );
                    action
                }
                None => {
                    session.status = SessionStatus::Completed {
                        reason: CompletionReason::Exhausted,
                    };
                    tracing::info!(session = %session_id, "exploration exhausted");
                    return StepOutcome::Finished {
                        reason: CompletionReason::Exhausted,
                    };
                }
            },
        };

        // Dispatch to the external driver. Failures are data, not errors.
        let (success, dispatch_url) = match self.driver.dispatch(&session_id, &action).await {
            Ok(outcome) => {
                if let Some(error) = &outcome.error {
                    tracing::debug!(session = %session_id, error = %error, "dispatch reported failure");
                }
                (outcome.success, outcome.new_url)
            }
            Err(e) => {
                tracing::warn!(session = %session_id, action = action.label(), error = %e, "dispatch failed");
                (false, None)
            }
        };

        // Register the target fingerprint even on failure, so a broken
        // element is never retried forever.
        let mut coverage_increased = false;
        if let (Some(fingerprint), Some(key)) = (action.target_fingerprint(), pre_key.as_ref()) {
            coverage_increased = session.registry.record(key, fingerprint);
        }

        // Fold the result back: re-snapshot becomes the next step's view.
        // When the re-snapshot fails, the record keeps the pre-step count.
        let mut resulting_url = dispatch_url.unwrap_or_else(|| session.current_url.clone());
        let mut element_count_after = session
            .current_view
            .as_ref()
            .map(|view| view.candidates.len())
            .unwrap_or(0);
        let observation = match self.driver.snapshot(&session_id).await {
            Ok(snapshot) => {
                match normalizer::normalize(
                    &snapshot.url,
                    &snapshot.elements,
                    &self.config.normalizer,
                ) {
                    Ok((key, candidates)) => {
                        resulting_url = snapshot.url.clone();
                        element_count_after = candidates.len();
                        let fingerprints: Vec<u64> =
                            candidates.iter().map(|c| c.fingerprint).collect();
                        let new_candidates = session.note_discovered(&key, &fingerprints);
                        let reached_new_page = session.mark_visited(&key);
                        let same_page = pre_key.as_ref() == Some(&key);
                        session.current_view = Some(PageView { key, candidates });
                        Some(StepObservation {
                            reached_new_page,
                            coverage_increased,
                            same_page,
                            new_candidates,
                        })
                    }
                    Err(e) => {
                        tracing::warn!(session = %session_id, error = %e, "unparseable page url after dispatch");
                        session.current_view = None;
                        None
                    }
                }
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "post-dispatch snapshot failed");
                session.current_view = None;
                None
            }
        };

        match observation {
            Some(obs) => session.stuck_counter = fold_observation(session.stuck_counter, obs),
            // No usable snapshot after the action: a no-progress signal, at
            // most one per step even when both snapshots failed.
            None => {
                if !pre_snapshot_failed {
                    session.stuck_counter += 1;
                }
            }
        }

        let record = StepRecord {
            step_number: session.step_count + 1,
            target_fingerprint: action.target_fingerprint(),
            action,
            success,
            resulting_url,
            element_count_after,
            timestamp: chrono::Utc::now(),
        };
        tracing::debug!(
            session = %session_id,
            step = record.step_number,
            action = record.action.label(),
            success = record.success,
            stuck = session.stuck_counter,
            url = %record.resulting_url,
            "step recorded"
        );
        session.record_step(record.clone());
        StepOutcome::Recorded(record)
    }
}
