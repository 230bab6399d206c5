use crate::config::StuckConfig;
use crate::explorer::state::Action;

/// What the recovery policy decided for the current stuck counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    Scroll,
    Back,
    /// Out of recovery options: the session completes with reason
    /// "exhausted". Terminal, not an error.
    Exhausted,
}

impl Recovery {
    /// Escalation ladder over the stuck counter. Recovery actions bypass the
    /// prioritizer entirely.
    pub fn decide(stuck_counter: u32, cfg: &StuckConfig) -> Recovery {
        if stuck_counter >= cfg.exhaust_after {
            Recovery::Exhausted
        } else if stuck_counter >= cfg.back_after {
            Recovery::Back
        } else {
            Recovery::Scroll
        }
    }

    pub fn action(self) -> Option<Action> {
        match self {
            Recovery::Scroll => Some(Action::Scroll),
            Recovery::Back => Some(Action::Back),
            Recovery::Exhausted => None,
        }
    }
}

/// Result of one step, as needed for the progress/no-progress transitions.
#[derive(Debug, Clone, Copy)]
pub struct StepObservation {
    /// Resulting page key was never visited before this step.
    pub reached_new_page: bool,
    /// An unregistered element was acted on (registry coverage increased).
    pub coverage_increased: bool,
    /// Resulting page key equals the pre-step key.
    pub same_page: bool,
    /// Candidates on the resulting page that were never seen there before.
    pub new_candidates: usize,
}

/// Apply one observation to the stuck counter: progress resets, no progress
/// increments, anything else leaves it alone.
pub fn fold_observation(stuck_counter: u32, obs: StepObservation) -> u32 {
    if obs.reached_new_page || obs.coverage_increased {
        0
    } else if obs.same_page && obs.new_candidates == 0 {
        stuck_counter + 1
    } else {
        stuck_counter
    }
}
