pub mod config;
pub mod driver;
pub mod errors;
pub mod explorer;
pub mod page;

pub use crate::config::ExploreConfig;
pub use crate::driver::{DispatchOutcome, PageDriver, PageElement, PageSnapshot};
pub use crate::errors::{WebScoutError, WebScoutResult};
pub use crate::explorer::engine::ExplorationEngine;
pub use crate::explorer::events::StepEvent;
pub use crate::explorer::state::{
    Action, CompletionReason, RunSummary, SessionSnapshot, SessionStatus, StepOutcome, StepRecord,
};

/// Install the default tracing subscriber. Hosts embedding the engine in a
/// larger process should configure their own subscriber instead.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
