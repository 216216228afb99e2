mod action;
mod budget;
mod config;
mod decision_observer;
mod default_observer;
mod types;

pub use action::{Action, ActionKind};
pub use budget::RolloutBudget;
pub use config::{ConfigError, Rules, Tuning};
pub use decision_observer::DecisionObserver;
pub use default_observer::DefaultObserver;
pub use types::{Bounds, Point};
