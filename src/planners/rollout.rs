//! Short-horizon rollouts scoring contested situations.
//!
//! Every function here is pure: it projects the involved units one (or two)
//! fixed-speed steps and evaluates a feasibility condition. Results are signed
//! deltas where a positive value favours the acting unit.

use crate::infra::{Point, Rules, Tuning};
use crate::state::Entity;

pub const DUEL_WIN: f64 = 1.0;
pub const DUEL_LOSS: f64 = -1.0;
pub const DUEL_INITIATIVE: f64 = 0.15;

const CONTEST_CLEAR_BONUS: f64 = 0.2;
const CONTEST_RING_BONUS: f64 = 0.5;
const CONTEST_RISK_PER_ENEMY: f64 = 0.3;
const CONTEST_STUN_THREAT: f64 = 0.5;

const BLOCK_MEET_MARGIN: f64 = 100.0;
const BLOCK_STUN_BONUS: f64 = 0.3;

const INTERCEPT_STUN_BONUS: f64 = 0.5;

pub const INTERCEPT_FRACTIONS: [f64; 6] = [0.15, 0.3, 0.45, 0.6, 0.75, 0.9];
pub const INTERCEPT_FALLBACK_FRACTION: f64 = 0.6;

/// The engine constants rollouts need, copied out once.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RolloutParams {
    pub speed: f64,
    pub stun_range: f64,
    pub bust_min: f64,
    pub bust_max: f64,
    pub release_radius: f64,
    pub eject_max: f64,
    pub near_radius: f64,
}

impl RolloutParams {
    pub fn new(rules: &Rules, tuning: &Tuning) -> Self {
        Self {
            speed: rules.move_speed,
            stun_range: rules.stun_range,
            bust_min: rules.bust_min,
            bust_max: rules.bust_max,
            release_radius: tuning.release_radius(rules),
            eject_max: rules.eject_max,
            near_radius: tuning.near_radius,
        }
    }

    fn in_band(&self, dist: f64) -> bool {
        dist >= self.bust_min && dist <= self.bust_max
    }

    fn ring(&self) -> f64 {
        (self.bust_min + self.bust_max) / 2.0
    }
}

/// Both units close in for one step; who can stun at the resulting distance?
pub fn duel_stun_delta(
    me: &Entity,
    opponent: &Entity,
    me_ready: bool,
    params: &RolloutParams,
) -> f64 {
    let my_next = me.position.step_toward(&opponent.position, params.speed);
    let their_next = opponent.position.step_toward(&me.position, params.speed);
    if my_next.distance(&their_next) > params.stun_range {
        return 0.0;
    }
    let me_can = me_ready && me.can_stun();
    let they_can = opponent.can_stun();
    match (me_can, they_can) {
        (true, false) => DUEL_WIN,
        (false, true) => DUEL_LOSS,
        (true, true) => DUEL_INITIATIVE,
        (false, false) => 0.0,
    }
}

/// Contest over a ghost after `steps` projected steps. `me` approaches the
/// capture ring, enemies head straight for the ghost.
fn contest_after(
    me: Point,
    ghost: &Point,
    enemies: &[Point],
    me_can_stun: bool,
    steps: u32,
    params: &RolloutParams,
) -> f64 {
    let ring_point = ghost.toward(&me, params.ring());
    let mut mine = me;
    let mut theirs: Vec<Point> = enemies.to_vec();
    for _ in 0..steps {
        mine = mine.step_toward(&ring_point, params.speed);
        for enemy in theirs.iter_mut() {
            *enemy = enemy.step_toward(ghost, params.speed);
        }
    }

    let my_dist = mine.distance(ghost);
    let near: Vec<&Point> = theirs
        .iter()
        .filter(|e| e.distance(ghost) <= params.near_radius)
        .collect();

    if near.is_empty() {
        return if params.in_band(my_dist) {
            CONTEST_CLEAR_BONUS
        } else {
            0.0
        };
    }

    let ring = if params.in_band(my_dist) {
        CONTEST_RING_BONUS
    } else {
        0.0
    };
    let risk = CONTEST_RISK_PER_ENEMY * near.len() as f64;
    let threatened = near.iter().any(|e| e.distance(&mine) <= params.stun_range);
    let stun_threat = if threatened && !me_can_stun {
        CONTEST_STUN_THREAT
    } else {
        0.0
    };
    ring - risk - stun_threat
}

pub fn contested_bust_delta(
    me: &Point,
    ghost: &Point,
    enemies: &[Point],
    me_can_stun: bool,
    params: &RolloutParams,
) -> f64 {
    contest_after(*me, ghost, enemies, me_can_stun, 1, params)
}

pub fn two_turn_contest_delta(
    me: &Point,
    ghost: &Point,
    enemies: &[Point],
    me_can_stun: bool,
    params: &RolloutParams,
) -> f64 {
    contest_after(*me, ghost, enemies, me_can_stun, 2, params)
}

/// Can a blocker reach the carrier's release boundary before the carrier?
pub fn release_block_delta(
    carrier: &Point,
    blocker: &Point,
    base: &Point,
    params: &RolloutParams,
) -> f64 {
    let carrier_next = carrier.step_toward(base, params.speed);
    if carrier_next.distance(base) <= params.release_radius {
        return DUEL_LOSS;
    }
    let meet = base.toward(&carrier_next, params.release_radius + BLOCK_MEET_MARGIN);
    let carrier_ticks = (carrier_next.distance(&meet) / params.speed).ceil() as i64;
    let blocker_next = blocker.step_toward(&meet, params.speed);
    let blocker_ticks = (blocker_next.distance(&meet) / params.speed).ceil() as i64;

    let lead = carrier_ticks - blocker_ticks;
    let mut delta = if lead <= -2 {
        -1.0
    } else if lead >= 1 {
        1.0
    } else {
        0.0
    };
    if blocker_next.distance(&meet) <= params.stun_range {
        delta += BLOCK_STUN_BONUS;
    }
    delta
}

/// First point along enemy→base that `me` can reach no later than the enemy.
pub fn estimate_intercept_point(me: &Point, enemy: &Point, base: &Point, speed: f64) -> Point {
    for fraction in INTERCEPT_FRACTIONS {
        let point = enemy.lerp(base, fraction);
        let enemy_time = enemy.distance(&point) / speed;
        let my_time = me.distance(&point) / speed;
        if my_time <= enemy_time {
            return point;
        }
    }
    enemy.lerp(base, INTERCEPT_FALLBACK_FRACTION)
}

fn intercept_after(
    me: Point,
    enemy: Point,
    base: &Point,
    steps: u32,
    params: &RolloutParams,
) -> f64 {
    let start = me.distance(&enemy);
    let mut mine = me;
    let mut theirs = enemy;
    for _ in 0..steps {
        let aim = estimate_intercept_point(&mine, &theirs, base, params.speed);
        mine = mine.step_toward(&aim, params.speed);
        theirs = theirs.step_toward(base, params.speed);
    }
    let end = mine.distance(&theirs);
    let progress = ((start - end) / (params.speed * steps as f64)).clamp(-1.0, 1.0);
    let bonus = if end <= params.stun_range {
        INTERCEPT_STUN_BONUS
    } else {
        0.0
    };
    progress + bonus
}

/// Progress toward a rendezvous with an enemy carrier running to `base`.
pub fn intercept_delta(me: &Point, enemy: &Point, base: &Point, params: &RolloutParams) -> f64 {
    intercept_after(*me, *enemy, base, 1, params)
}

pub fn two_turn_intercept_delta(
    me: &Point,
    enemy: &Point,
    base: &Point,
    params: &RolloutParams,
) -> f64 {
    intercept_after(*me, *enemy, base, 2, params)
}

fn eject_after(carrier: Point, ally: Point, base: &Point, steps: u32, params: &RolloutParams) -> f64 {
    let mut carrier = carrier;
    let mut ally = ally;
    for _ in 0..steps {
        carrier = carrier.step_toward(base, params.speed);
        ally = ally.step_toward(&carrier, params.speed);
    }
    let carrier_left = carrier.distance(base);
    let ally_left = ally.distance(base);
    if carrier.distance(&ally) > params.eject_max || ally_left >= carrier_left {
        return 0.0;
    }
    ((carrier_left - ally_left) / params.eject_max).min(1.0)
}

/// Gain from handing the payload to `ally` once both have moved.
pub fn eject_delta(carrier: &Point, ally: &Point, base: &Point, params: &RolloutParams) -> f64 {
    eject_after(*carrier, *ally, base, 1, params)
}

pub fn two_turn_eject_delta(
    carrier: &Point,
    ally: &Point,
    base: &Point,
    params: &RolloutParams,
) -> f64 {
    eject_after(*carrier, *ally, base, 2, params)
}
