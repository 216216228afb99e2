pub mod assignment;
pub mod executor;
pub mod hungarian;
pub mod rollout;
pub mod tactics;
pub mod tasks;

pub use assignment::{Assignment, ScoreContext, SolveMethod, Unit, plan_assignment, team_units};
pub use executor::{DecisionContext, Executor};
pub use tactics::{ScorerStats, TacticalScorer};
pub use tasks::{Role, Task, TaskContext, TaskKind, TaskPayload, generate_tasks};
