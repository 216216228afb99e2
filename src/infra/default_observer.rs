use std::time::Duration;

use tracing::{debug, info, warn};

use crate::infra::{Action, DecisionObserver};
use crate::planners::{Assignment, Task};

pub struct DefaultObserver;

impl DecisionObserver for DefaultObserver {
    fn on_match_start(&mut self, tick: u32, match_number: u32) {
        info!("Match {} started at tick {}", match_number, tick);
    }

    fn on_plan(&mut self, tick: u32, tasks: &[Task], assignment: &Assignment) {
        debug!(
            "tick: {}, tasks: {}, assigned: {}, solver: {:?}",
            tick,
            tasks.len(),
            assignment.len(),
            assignment.method
        );
    }

    fn on_action_selected(&mut self, tick: u32, unit_id: u32, action: &Action) {
        info!("tick: {}, unit: {}, action: {}", tick, unit_id, action);
    }

    fn on_budget_exhausted(&mut self, tick: u32, spent: Duration, limit: Duration) {
        warn!(
            "Rollout budget exhausted on tick {}: {:.2}ms of {:.2}ms",
            tick,
            spent.as_secs_f64() * 1000.0,
            limit.as_secs_f64() * 1000.0
        );
    }
}
