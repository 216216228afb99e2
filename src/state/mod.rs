mod belief;
mod enemy_tracker;
mod entity;
mod memory;

pub use belief::BeliefState;
pub use enemy_tracker::{EnemyTrack, EnemyTracker, Sighting};
pub use entity::{Entity, EntityState, GHOST_TYPE, Observation, RawEntity, RawSelfStatus};
pub use memory::{AgentMemory, MemoryRecord};
