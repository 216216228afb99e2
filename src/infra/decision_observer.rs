use std::time::Duration;

use crate::infra::Action;
use crate::planners::{Assignment, Task};

/// Trait for observing decisions made by a session
pub trait DecisionObserver {
    /// Called when a new match starts, including after a reset
    fn on_match_start(&mut self, tick: u32, match_number: u32);

    /// Called once per tick when the shared team plan is built
    fn on_plan(&mut self, tick: u32, tasks: &[Task], assignment: &Assignment);

    /// Called when an action is selected for a unit
    fn on_action_selected(&mut self, tick: u32, unit_id: u32, action: &Action);

    /// Called at most once per tick when two-turn rollouts ran out of time
    fn on_budget_exhausted(&mut self, _tick: u32, _spent: Duration, _limit: Duration) {
        // Default implementation does nothing
    }
}
