pub mod infra;
pub mod planners;
pub mod session;
pub mod state;

// Re-export commonly used types for convenience
pub use infra::{Action, ActionKind, ConfigError, Point, Rules, Tuning};
pub use session::Session;
pub use state::{Entity, Observation};
