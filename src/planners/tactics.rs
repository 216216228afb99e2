use std::collections::HashMap;

use crate::infra::{Point, RolloutBudget, Rules, Tuning};
use crate::planners::rollout::{self, RolloutParams};
use crate::state::Entity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum RolloutKind {
    Duel,
    Contest,
    TwoTurnContest,
    ReleaseBlock,
    Intercept,
    TwoTurnIntercept,
    Eject,
    TwoTurnEject,
}

/// Cache key built from rounded coordinates so equal situations within a
/// tick share a result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RolloutKey {
    kind: RolloutKind,
    data: Vec<i64>,
}

impl RolloutKey {
    fn new(kind: RolloutKind) -> Self {
        Self {
            kind,
            data: Vec::with_capacity(8),
        }
    }

    fn point(mut self, p: &Point) -> Self {
        let (x, y) = p.rounded();
        self.data.push(x);
        self.data.push(y);
        self
    }

    /// Enemy order does not change the result, so it must not change the key.
    fn points_unordered(mut self, points: &[Point]) -> Self {
        let mut rounded: Vec<(i64, i64)> = points.iter().map(|p| p.rounded()).collect();
        rounded.sort_unstable();
        self.data.push(rounded.len() as i64);
        for (x, y) in rounded {
            self.data.push(x);
            self.data.push(y);
        }
        self
    }

    fn flag(mut self, value: bool) -> Self {
        self.data.push(value as i64);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScorerStats {
    pub hits: usize,
    pub misses: usize,
    pub skipped: usize,
}

/// Memoized rollout front end used by the assignment scorer and executor.
///
/// Cheap one-step rollouts always run. Two-turn rollouts are charged against
/// the per-tick [`RolloutBudget`] and contribute a neutral `0.0` once it runs
/// out.
pub struct TacticalScorer {
    params: RolloutParams,
    budget: RolloutBudget,
    cache: HashMap<RolloutKey, f64>,
    stats: ScorerStats,
    tick: Option<u32>,
}

impl TacticalScorer {
    pub fn new(rules: &Rules, tuning: &Tuning) -> Self {
        Self {
            params: RolloutParams::new(rules, tuning),
            budget: RolloutBudget::new(tuning.rollout_budget),
            cache: HashMap::new(),
            stats: ScorerStats::default(),
            tick: None,
        }
    }

    pub fn params(&self) -> &RolloutParams {
        &self.params
    }

    /// Drops cached results and refills the budget when the tick changes.
    pub fn begin_tick(&mut self, tick: u32) {
        if self.tick == Some(tick) {
            return;
        }
        self.tick = Some(tick);
        self.cache.clear();
        self.stats = ScorerStats::default();
        self.budget.begin_tick(tick);
    }

    pub fn stats(&self) -> ScorerStats {
        self.stats
    }

    pub fn budget(&self) -> &RolloutBudget {
        &self.budget
    }

    /// True once per tick, and only if a two-turn rollout was actually skipped.
    pub fn take_exhaustion_report(&mut self) -> bool {
        self.stats.skipped > 0 && self.budget.take_exhaustion_report()
    }

    fn cached(&mut self, key: RolloutKey, compute: impl FnOnce(&RolloutParams) -> f64) -> f64 {
        if let Some(value) = self.cache.get(&key) {
            self.stats.hits += 1;
            return *value;
        }
        self.stats.misses += 1;
        let value = compute(&self.params);
        self.cache.insert(key, value);
        value
    }

    /// An exhausted budget wins over the cache: every later two-turn call on
    /// the tick is neutral.
    fn budgeted(&mut self, key: RolloutKey, compute: impl FnOnce(&RolloutParams) -> f64) -> f64 {
        if self.budget.is_exhausted() {
            self.stats.skipped += 1;
            return 0.0;
        }
        if let Some(value) = self.cache.get(&key) {
            self.stats.hits += 1;
            return *value;
        }
        self.stats.misses += 1;
        let params = self.params;
        let value = self.budget.measure(|| compute(&params));
        self.cache.insert(key, value);
        value
    }

    pub fn duel(&mut self, me: &Entity, opponent: &Entity, me_ready: bool) -> f64 {
        let key = RolloutKey::new(RolloutKind::Duel)
            .point(&me.position)
            .point(&opponent.position)
            .flag(me_ready && me.can_stun())
            .flag(opponent.can_stun());
        self.cached(key, |p| rollout::duel_stun_delta(me, opponent, me_ready, p))
    }

    pub fn contest(&mut self, me: &Point, ghost: &Point, enemies: &[Point], me_can_stun: bool) -> f64 {
        let key = RolloutKey::new(RolloutKind::Contest)
            .point(me)
            .point(ghost)
            .points_unordered(enemies)
            .flag(me_can_stun);
        self.cached(key, |p| {
            rollout::contested_bust_delta(me, ghost, enemies, me_can_stun, p)
        })
    }

    pub fn two_turn_contest(
        &mut self,
        me: &Point,
        ghost: &Point,
        enemies: &[Point],
        me_can_stun: bool,
    ) -> f64 {
        let key = RolloutKey::new(RolloutKind::TwoTurnContest)
            .point(me)
            .point(ghost)
            .points_unordered(enemies)
            .flag(me_can_stun);
        self.budgeted(key, |p| {
            rollout::two_turn_contest_delta(me, ghost, enemies, me_can_stun, p)
        })
    }

    pub fn release_block(&mut self, carrier: &Point, blocker: &Point, base: &Point) -> f64 {
        let key = RolloutKey::new(RolloutKind::ReleaseBlock)
            .point(carrier)
            .point(blocker)
            .point(base);
        self.cached(key, |p| rollout::release_block_delta(carrier, blocker, base, p))
    }

    pub fn intercept(&mut self, me: &Point, enemy: &Point, base: &Point) -> f64 {
        let key = RolloutKey::new(RolloutKind::Intercept)
            .point(me)
            .point(enemy)
            .point(base);
        self.cached(key, |p| rollout::intercept_delta(me, enemy, base, p))
    }

    pub fn two_turn_intercept(&mut self, me: &Point, enemy: &Point, base: &Point) -> f64 {
        let key = RolloutKey::new(RolloutKind::TwoTurnIntercept)
            .point(me)
            .point(enemy)
            .point(base);
        self.budgeted(key, |p| rollout::two_turn_intercept_delta(me, enemy, base, p))
    }

    pub fn eject(&mut self, carrier: &Point, ally: &Point, base: &Point) -> f64 {
        let key = RolloutKey::new(RolloutKind::Eject)
            .point(carrier)
            .point(ally)
            .point(base);
        self.cached(key, |p| rollout::eject_delta(carrier, ally, base, p))
    }

    pub fn two_turn_eject(&mut self, carrier: &Point, ally: &Point, base: &Point) -> f64 {
        let key = RolloutKey::new(RolloutKind::TwoTurnEject)
            .point(carrier)
            .point(ally)
            .point(base);
        self.budgeted(key, |p| rollout::two_turn_eject_delta(carrier, ally, base, p))
    }

    pub fn intercept_point(&self, me: &Point, enemy: &Point, base: &Point) -> Point {
        rollout::estimate_intercept_point(me, enemy, base, self.params.speed)
    }
}
