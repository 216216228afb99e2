use std::time::{Duration, Instant};

/// Per-tick wall-clock allowance for two-turn rollouts.
///
/// The owner resets it at the start of every tick and charges the elapsed
/// time of each measured rollout against it. Once `spent >= limit` the
/// budget reports itself exhausted for the rest of the tick.
#[derive(Debug, Clone)]
pub struct RolloutBudget {
    limit: Duration,
    spent: Duration,
    tick: Option<u32>,
    exhausted_reported: bool,
}

impl RolloutBudget {
    pub fn new(limit: Duration) -> Self {
        Self {
            limit,
            spent: Duration::ZERO,
            tick: None,
            exhausted_reported: false,
        }
    }

    /// Resets the spent time when `tick` differs from the last one seen.
    pub fn begin_tick(&mut self, tick: u32) {
        if self.tick == Some(tick) {
            return;
        }
        self.tick = Some(tick);
        self.spent = Duration::ZERO;
        self.exhausted_reported = false;
    }

    pub fn is_exhausted(&self) -> bool {
        self.spent >= self.limit
    }

    /// Runs `f`, charging its elapsed time.
    pub fn measure<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.spent += start.elapsed();
        result
    }

    pub fn charge(&mut self, elapsed: Duration) {
        self.spent += elapsed;
    }

    pub fn spent(&self) -> Duration {
        self.spent
    }

    pub fn limit(&self) -> Duration {
        self.limit
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.spent)
    }

    /// True exactly once per tick after exhaustion, for logging.
    pub fn take_exhaustion_report(&mut self) -> bool {
        if self.is_exhausted() && !self.exhausted_reported {
            self.exhausted_reported = true;
            return true;
        }
        false
    }
}
