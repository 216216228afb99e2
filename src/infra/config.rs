use std::env;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::infra::Bounds;

/// Constants owned by the game engine. Read-only for the decision core.
#[derive(Debug, Clone, PartialEq)]
pub struct Rules {
    pub map_width: f64,
    pub map_height: f64,
    pub move_speed: f64,
    pub bust_min: f64,
    pub bust_max: f64,
    pub stun_range: f64,
    pub stun_cooldown: u32,
    pub stun_duration: u32,
    pub base_radius: f64,
    pub vision_radius: f64,
    pub radar_radius: f64,
    pub eject_max: f64,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            map_width: 16001.0,
            map_height: 9001.0,
            move_speed: 800.0,
            bust_min: 900.0,
            bust_max: 1760.0,
            stun_range: 1760.0,
            stun_cooldown: 20,
            stun_duration: 10,
            base_radius: 1600.0,
            vision_radius: 2200.0,
            radar_radius: 4400.0,
            eject_max: 1760.0,
        }
    }
}

impl Rules {
    pub fn bounds(&self) -> Bounds {
        Bounds::new(self.map_width, self.map_height)
    }

    pub fn in_capture_band(&self, dist: f64) -> bool {
        dist >= self.bust_min && dist <= self.bust_max
    }

    /// Radius of the capture ring units aim for when approaching a ghost.
    pub fn capture_ring(&self) -> f64 {
        (self.bust_min + self.bust_max) / 2.0
    }
}

/// Named tuning constants supplied once at session start.
#[derive(Debug, Clone, PartialEq)]
pub struct Tuning {
    // Belief grid
    pub cell_size: f64,
    pub heat_decay: f64,
    pub heat_epsilon: f64,
    pub corridor_decay: f64,
    pub diffusion_rate: f64,
    pub clear_suppression: f64,
    pub ghost_falloff: f64,
    pub bump_mass: f64,
    pub never_visited_age: f64,
    pub frontier_heat_weight: f64,
    pub frontier_distance_cost: f64,
    pub frontier_warmup_ticks: u32,
    pub enemy_memory_ticks: u32,
    pub prediction_horizon: usize,

    // Task generation
    pub defend_radius: f64,
    pub near_radius: f64,
    pub support_radius: f64,
    pub intercept_score: f64,
    pub defend_score: f64,
    pub bust_score: f64,
    pub bust_ring_bonus: f64,
    pub bust_contest_penalty: f64,
    pub support_score: f64,
    pub carry_score: f64,
    pub carry_risk_penalty: f64,
    pub block_score: f64,
    pub block_ring: f64,
    pub explore_score: f64,
    pub explore_heat_weight: f64,
    pub corridor_weight: f64,

    // Assignment
    pub distance_penalty: f64,
    pub role_bonus: f64,
    pub defend_proximity_bonus: f64,
    pub delta_weight: f64,
    pub two_turn_weight: f64,
    pub assignment_cap: usize,

    // Execution
    pub release_distance: f64,
    pub threat_radius: f64,
    pub candidate_radius: f64,
    pub candidate_count: usize,
    pub candidate_distance_weight: f64,
    pub radar_ticks: [u32; 2],
    pub patrol_reach: f64,

    // Tactical scorer
    pub rollout_budget: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            cell_size: 1000.0,
            heat_decay: 0.97,
            heat_epsilon: 1e-9,
            corridor_decay: 0.8,
            diffusion_rate: 0.2,
            clear_suppression: 0.05,
            ghost_falloff: 900.0,
            bump_mass: 1.0,
            never_visited_age: 200.0,
            frontier_heat_weight: 100.0,
            frontier_distance_cost: 0.002,
            frontier_warmup_ticks: 2,
            enemy_memory_ticks: 10,
            prediction_horizon: 3,

            defend_radius: 5000.0,
            near_radius: 2200.0,
            support_radius: 2500.0,
            intercept_score: 60.0,
            defend_score: 40.0,
            bust_score: 50.0,
            bust_ring_bonus: 10.0,
            bust_contest_penalty: 8.0,
            support_score: 30.0,
            carry_score: 35.0,
            carry_risk_penalty: 10.0,
            block_score: 15.0,
            block_ring: 2600.0,
            explore_score: 10.0,
            explore_heat_weight: 20.0,
            corridor_weight: 10.0,

            distance_penalty: 0.004,
            role_bonus: 8.0,
            defend_proximity_bonus: 10.0,
            delta_weight: 12.0,
            two_turn_weight: 6.0,
            assignment_cap: 100,

            release_distance: 1600.0,
            threat_radius: 2560.0,
            candidate_radius: 400.0,
            candidate_count: 8,
            candidate_distance_weight: 0.001,
            radar_ticks: [2, 55],
            patrol_reach: 800.0,

            rollout_budget: Duration::from_millis(20),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InvalidValue { key: String, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, value } => {
                write!(formatter, "Invalid value {:?} for {}", value, key)
            }
        }
    }
}

impl Error for ConfigError {}

fn get_env_var<T: FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value,
            }),
        Err(_) => Ok(None),
    }
}

impl Tuning {
    /// Defaults overridden by `BUSTER_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut tuning = Self::default();
        tuning.apply_env()?;
        Ok(tuning)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        let floats: [(&str, &mut f64); 14] = [
            ("BUSTER_CELL_SIZE", &mut self.cell_size),
            ("BUSTER_HEAT_DECAY", &mut self.heat_decay),
            ("BUSTER_DIFFUSION_RATE", &mut self.diffusion_rate),
            ("BUSTER_FRONTIER_HEAT_WEIGHT", &mut self.frontier_heat_weight),
            ("BUSTER_FRONTIER_DISTANCE_COST", &mut self.frontier_distance_cost),
            ("BUSTER_DEFEND_RADIUS", &mut self.defend_radius),
            ("BUSTER_NEAR_RADIUS", &mut self.near_radius),
            ("BUSTER_INTERCEPT_SCORE", &mut self.intercept_score),
            ("BUSTER_BUST_SCORE", &mut self.bust_score),
            ("BUSTER_CARRY_SCORE", &mut self.carry_score),
            ("BUSTER_EXPLORE_SCORE", &mut self.explore_score),
            ("BUSTER_DISTANCE_PENALTY", &mut self.distance_penalty),
            ("BUSTER_ROLE_BONUS", &mut self.role_bonus),
            ("BUSTER_RELEASE_DISTANCE", &mut self.release_distance),
        ];
        for (key, slot) in floats {
            if let Some(value) = get_env_var::<f64>(key)? {
                *slot = value;
            }
        }

        if let Some(cap) = get_env_var::<usize>("BUSTER_ASSIGNMENT_CAP")? {
            self.assignment_cap = cap;
        }
        if let Some(ms) = get_env_var::<u64>("BUSTER_ROLLOUT_BUDGET_MS")? {
            self.rollout_budget = Duration::from_millis(ms);
        }
        if let Some(first) = get_env_var::<u32>("BUSTER_RADAR_TICK_1")? {
            self.radar_ticks[0] = first;
        }
        if let Some(second) = get_env_var::<u32>("BUSTER_RADAR_TICK_2")? {
            self.radar_ticks[1] = second;
        }
        Ok(())
    }

    /// Distance from own base inside which a carrier can score.
    pub fn release_radius(&self, rules: &Rules) -> f64 {
        self.release_distance.min(rules.base_radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_band_is_inclusive() {
        let rules = Rules::default();
        assert!(rules.in_capture_band(900.0));
        assert!(rules.in_capture_band(1760.0));
        assert!(!rules.in_capture_band(899.0));
        assert!(!rules.in_capture_band(1761.0));
    }

    #[test]
    fn test_env_overrides_and_rejects_garbage() {
        // Only this test touches these keys.
        unsafe {
            env::set_var("BUSTER_ASSIGNMENT_CAP", "42");
            env::set_var("BUSTER_RADAR_TICK_2", "70");
        }
        let tuning = Tuning::from_env().unwrap();
        assert_eq!(tuning.assignment_cap, 42);
        assert_eq!(tuning.radar_ticks, [2, 70]);

        unsafe {
            env::set_var("BUSTER_ASSIGNMENT_CAP", "lots");
        }
        let err = Tuning::from_env().unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidValue {
                key: "BUSTER_ASSIGNMENT_CAP".to_string(),
                value: "lots".to_string()
            }
        );
        unsafe {
            env::remove_var("BUSTER_ASSIGNMENT_CAP");
            env::remove_var("BUSTER_RADAR_TICK_2");
        }
    }
}
