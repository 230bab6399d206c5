use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::explorer::state::StepRecord;

/// One event per completed step, pushed to whatever UI/WebSocket layer is
/// listening. Fire-and-forget: the loop's correctness never depends on a
/// subscriber being present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEvent {
    pub session_id: String,
    pub step: StepRecord,
    pub total_steps: u32,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<StepEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StepEvent> {
        self.tx.subscribe()
    }

    /// A send error only means nobody is subscribed; drop it.
    pub fn emit(&self, event: StepEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("step event dropped: no subscribers");
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::state::Action;

    fn event(done: bool) -> StepEvent {
        StepEvent {
            session_id: "s1".into(),
            step: StepRecord {
                step_number: 1,
                action: Action::Scroll,
                target_fingerprint: None,
                success: true,
                resulting_url: "https://example.com".into(),
                element_count_after: 3,
                timestamp: chrono::Utc::now(),
            },
            total_steps: 1,
            done,
        }
    }

    #[test]
    fn emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new();
        bus.emit(event(false));
    }

    #[tokio::test]
    async fn subscribers_receive_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(event(true));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.session_id, "s1");
        assert!(received.done);
    }
}
