use std::env;
use std::error::Error;

use busterbot::infra::{ActionKind, Point, Rules, Tuning};
use busterbot::state::{Entity, Observation};
use busterbot::{Action, Session};
use dotenv::dotenv;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

fn get_env_var_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|val| val.parse::<u64>().ok())
}

fn init_logging() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("busterbot=debug,info"));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Synthetic surroundings for exercising a session without the game engine.
/// Our units follow their MOVE orders, everything else wanders at random.
struct DryRun {
    rng: StdRng,
    rules: Rules,
    own_base: Point,
    enemy_base: Point,
    units: Vec<Entity>,
    enemies: Vec<Entity>,
    ghosts: Vec<Entity>,
}

impl DryRun {
    fn new(seed: u64, rules: Rules, team_size: usize, ghost_count: usize) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let own_base = Point::new(0.0, 0.0);
        let enemy_base = Point::new(rules.map_width - 1.0, rules.map_height - 1.0);

        let units = (0..team_size)
            .map(|i| {
                let position = own_base.toward(&enemy_base, 1000.0 + 400.0 * i as f64);
                Entity::new(i as u32, position)
            })
            .collect();
        let enemies = (0..team_size)
            .map(|i| {
                let position = enemy_base.toward(&own_base, 1000.0 + 400.0 * i as f64);
                Entity::new((team_size + i) as u32, position)
            })
            .collect();
        let ghosts = (0..ghost_count)
            .map(|i| {
                let position = Point::new(
                    rng.random_range(0.0..rules.map_width - 1.0),
                    rng.random_range(0.0..rules.map_height - 1.0),
                );
                Entity::new((2 * team_size + i) as u32, position)
            })
            .collect();

        Self {
            rng,
            rules,
            own_base,
            enemy_base,
            units,
            enemies,
            ghosts,
        }
    }

    fn visible(&self, list: &[Entity]) -> Vec<Entity> {
        list.iter()
            .filter(|e| {
                self.units
                    .iter()
                    .any(|u| u.position.distance(&e.position) <= self.rules.vision_radius)
            })
            .cloned()
            .collect()
    }

    fn observations(&self, tick: u32) -> Vec<Observation> {
        let enemies = self.visible(&self.enemies);
        let ghosts = self.visible(&self.ghosts);
        self.units
            .iter()
            .map(|me| {
                let mut obs = Observation::new(tick, me.clone(), self.own_base, self.enemy_base);
                obs.friends = self.units.iter().filter(|u| u.id != me.id).cloned().collect();
                obs.enemies = enemies.clone();
                obs.ghosts = ghosts.clone();
                obs.team_size = self.units.len();
                obs
            })
            .collect()
    }

    fn apply(&mut self, actions: &[(u32, Action)]) {
        let bounds = self.rules.bounds();
        for (id, action) in actions {
            if let ActionKind::Move(target) = action.kind
                && let Some(unit) = self.units.iter_mut().find(|u| u.id == *id)
            {
                let next = unit.position.step_toward(&target, self.rules.move_speed);
                unit.position = bounds.clamp(next);
            }
        }

        for enemy in self.enemies.iter_mut() {
            let wander = Point::new(
                self.rng.random_range(0.0..self.rules.map_width - 1.0),
                self.rng.random_range(0.0..self.rules.map_height - 1.0),
            );
            let next = enemy.position.step_toward(&wander, self.rules.move_speed);
            enemy.position = bounds.clamp(next);
            if enemy.is_carrying() {
                if enemy.position.distance(&self.enemy_base) <= self.rules.base_radius {
                    *enemy = Entity::new(enemy.id, enemy.position);
                }
            } else if self.rng.random_bool(0.02) {
                *enemy = Entity::new(enemy.id, enemy.position).carrying(0);
            }
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    init_logging()?;

    let tuning = Tuning::from_env()?;
    let rules = Rules::default();
    let seed = get_env_var_u64("BUSTER_SEED").unwrap_or(1);
    let ticks = get_env_var_u64("BUSTER_TICKS").unwrap_or(20);
    let team_size = get_env_var_u64("BUSTER_TEAM_SIZE").unwrap_or(3).max(1) as usize;
    let ghost_count = get_env_var_u64("BUSTER_GHOSTS").unwrap_or(8) as usize;

    tracing::info!(seed, ticks, team_size, ghost_count, "Starting dry run");

    let mut world = DryRun::new(seed, rules.clone(), team_size, ghost_count);
    let mut session = Session::new(rules, tuning);

    for tick in 0..ticks {
        let tick = u32::try_from(tick)?;
        let actions = session.decide_team(&world.observations(tick));
        for (_, action) in &actions {
            println!("{}", action);
        }
        world.apply(&actions);
    }

    let stats = session.scorer().stats();
    tracing::info!(
        hits = stats.hits,
        misses = stats.misses,
        skipped = stats.skipped,
        "Dry run finished"
    );
    Ok(())
}
