use std::collections::BTreeMap;

use crate::infra::{Point, Rules, Tuning};
use crate::planners::hungarian::hungarian;
use crate::planners::tactics::TacticalScorer;
use crate::planners::tasks::{Role, Task, TaskKind, TaskPayload};
use crate::state::{AgentMemory, BeliefState, Entity, Observation};

const CARRYING_PENALTY: f64 = 1000.0;
const PAD_COST: f64 = 1e9;

/// A team member as seen by the solver.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub entity: Entity,
    pub role: Role,
    pub stun_ready: bool,
}

/// Team units in ascending id order with their roles and stun readiness.
pub fn team_units(obs: &Observation, memory: &AgentMemory) -> Vec<Unit> {
    obs.team()
        .into_iter()
        .enumerate()
        .map(|(index, entity)| Unit {
            entity: entity.clone(),
            role: Role::for_local_index(index),
            stun_ready: entity.can_stun() && memory.stun_ready(entity.id, obs.tick),
        })
        .collect()
}

pub struct ScoreContext<'a> {
    pub obs: &'a Observation,
    pub belief: &'a BeliefState,
    pub rules: &'a Rules,
    pub tuning: &'a Tuning,
}

impl ScoreContext<'_> {
    /// Current best knowledge of an enemy: the visible entity, else its track.
    fn enemy(&self, id: u32, visible: bool) -> Option<Entity> {
        if visible && let Some(enemy) = self.obs.enemy(id) {
            return Some(enemy.clone());
        }
        self.belief.enemies().get(id).map(|track| track.as_entity())
    }

    fn enemy_points_near(&self, point: &Point, radius: f64) -> Vec<Point> {
        self.obs
            .enemies
            .iter()
            .map(|e| e.position)
            .filter(|p| p.distance(point) <= radius)
            .collect()
    }

    /// Rollouts only run when the two units could interact within two steps.
    fn rollout_gate(&self) -> f64 {
        self.tuning.threat_radius + 2.0 * self.rules.move_speed
    }
}

/// Utility of `unit` taking `task`. Higher is better.
pub fn score(unit: &Unit, task: &Task, ctx: &ScoreContext, scorer: &mut TacticalScorer) -> f64 {
    let tuning = ctx.tuning;
    let me = &unit.entity;
    let dist = me.position.distance(&task.target);
    let mut total = task.base_score - tuning.distance_penalty * dist;

    if me.is_carrying() && task.kind != TaskKind::Carry {
        total -= CARRYING_PENALTY;
    }

    match (task.kind, task.payload) {
        (TaskKind::Bust, TaskPayload::Ghost(id)) | (TaskKind::Support, TaskPayload::Ghost(id)) => {
            if let Some(ghost) = ctx.obs.ghost(id) {
                let ghost_dist = me.position.distance(&ghost.position);
                if task.kind == TaskKind::Bust && ctx.rules.in_capture_band(ghost_dist) {
                    total += tuning.bust_ring_bonus;
                }
                let enemies = ctx.enemy_points_near(&ghost.position, tuning.near_radius);
                if !enemies.is_empty() && ghost_dist <= ctx.rollout_gate() {
                    total += tuning.delta_weight
                        * scorer.contest(&me.position, &ghost.position, &enemies, unit.stun_ready);
                    total += tuning.two_turn_weight
                        * scorer.two_turn_contest(
                            &me.position,
                            &ghost.position,
                            &enemies,
                            unit.stun_ready,
                        );
                }
            }
        }
        (
            TaskKind::Intercept | TaskKind::Defend | TaskKind::Support,
            TaskPayload::Enemy { id, visible },
        ) => {
            if let Some(enemy) = ctx.enemy(id, visible) {
                let gap = me.position.distance(&enemy.position);
                if enemy.is_carrying() {
                    let home = ctx.obs.enemy_base;
                    total += tuning.delta_weight
                        * scorer.intercept(&me.position, &enemy.position, &home);
                    total += tuning.two_turn_weight
                        * scorer.two_turn_intercept(&me.position, &enemy.position, &home);
                    total += tuning.delta_weight
                        * scorer.release_block(&enemy.position, &me.position, &home);
                }
                if visible && gap <= ctx.rollout_gate() {
                    total += tuning.delta_weight * scorer.duel(me, &enemy, unit.stun_ready);
                }
            }
            if task.kind == TaskKind::Defend {
                let from_base = me.position.distance(&ctx.obs.own_base);
                let closeness = (1.0 - from_base / tuning.defend_radius).max(0.0);
                total += tuning.defend_proximity_bonus * closeness;
            }
        }
        (TaskKind::Carry, TaskPayload::Ally(carrier_id)) => {
            if carrier_id == me.id {
                let threats = ctx
                    .obs
                    .enemies
                    .iter()
                    .filter(|e| e.can_stun())
                    .filter(|e| e.position.distance(&me.position) <= tuning.threat_radius)
                    .count();
                total -= tuning.carry_risk_penalty * threats as f64;
            } else if let Some(carrier) = ctx.obs.friend(carrier_id) {
                let base = ctx.obs.own_base;
                total += tuning.delta_weight
                    * scorer.eject(&carrier.position, &me.position, &base);
                total += tuning.two_turn_weight
                    * scorer.two_turn_eject(&carrier.position, &me.position, &base);
            }
        }
        (TaskKind::Explore, TaskPayload::Explore { unit: owner, .. }) => {
            if owner == me.id {
                total += 0.5 * tuning.role_bonus;
            }
        }
        _ => {}
    }

    if unit.role.likes(task.kind) {
        total += tuning.role_bonus;
    }
    total
}

pub fn score_matrix(
    units: &[Unit],
    tasks: &[Task],
    ctx: &ScoreContext,
    scorer: &mut TacticalScorer,
) -> Vec<Vec<f64>> {
    units
        .iter()
        .map(|unit| tasks.iter().map(|task| score(unit, task, ctx, scorer)).collect())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveMethod {
    Exact,
    Greedy,
}

/// Unit id to task index. Units without an entry have no task.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub by_unit: BTreeMap<u32, usize>,
    pub method: SolveMethod,
}

impl Assignment {
    pub fn task_for(&self, unit_id: u32) -> Option<usize> {
        self.by_unit.get(&unit_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_unit.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_unit.is_empty()
    }
}

/// Maximum-total assignment via Hungarian on a padded square matrix.
pub fn solve_exact(scores: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = scores.len();
    let cols = scores.first().map_or(0, |row| row.len());
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }
    let size = rows.max(cols);
    let cost: Vec<Vec<f64>> = (0..size)
        .map(|r| {
            (0..size)
                .map(|c| {
                    if r < rows && c < cols {
                        -scores[r][c]
                    } else {
                        PAD_COST
                    }
                })
                .collect()
        })
        .collect();

    let columns = hungarian(&cost);
    (0..rows)
        .map(|r| Some(columns[r]).filter(|&c| c < cols))
        .collect()
}

/// Highest-scoring free pairs first, ties broken by unit then task index.
pub fn solve_greedy(scores: &[Vec<f64>]) -> Vec<Option<usize>> {
    let rows = scores.len();
    let cols = scores.first().map_or(0, |row| row.len());
    let mut pairs: Vec<(usize, usize)> = (0..rows)
        .flat_map(|r| (0..cols).map(move |c| (r, c)))
        .collect();
    pairs.sort_by(|a, b| {
        scores[b.0][b.1]
            .total_cmp(&scores[a.0][a.1])
            .then(a.cmp(b))
    });

    let mut result = vec![None; rows];
    let mut task_taken = vec![false; cols];
    let mut remaining = rows.min(cols);
    for (r, c) in pairs {
        if remaining == 0 {
            break;
        }
        if result[r].is_none() && !task_taken[c] {
            result[r] = Some(c);
            task_taken[c] = true;
            remaining -= 1;
        }
    }
    result
}

/// Exact when `units * tasks <= cap`, greedy above it.
pub fn solve(scores: &[Vec<f64>], cap: usize) -> (Vec<Option<usize>>, SolveMethod) {
    let rows = scores.len();
    let cols = scores.first().map_or(0, |row| row.len());
    if rows * cols <= cap {
        (solve_exact(scores), SolveMethod::Exact)
    } else {
        (solve_greedy(scores), SolveMethod::Greedy)
    }
}

#[tracing::instrument(level = "trace", skip_all, fields(units = units.len(), tasks = tasks.len()))]
pub fn plan_assignment(
    units: &[Unit],
    tasks: &[Task],
    ctx: &ScoreContext,
    scorer: &mut TacticalScorer,
) -> Assignment {
    let scores = score_matrix(units, tasks, ctx, scorer);
    let (picks, method) = solve(&scores, ctx.tuning.assignment_cap);

    let by_unit: BTreeMap<u32, usize> = units
        .iter()
        .zip(picks)
        .filter_map(|(unit, pick)| pick.map(|task| (unit.entity.id, task)))
        .collect();

    for (unit_id, task) in &by_unit {
        tracing::debug!(
            unit = unit_id,
            task = %tasks[*task].kind,
            target = ?tasks[*task].target.rounded(),
            "Assigned task"
        );
    }
    Assignment { by_unit, method }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_scores(rng: &mut StdRng, rows: usize, cols: usize) -> Vec<Vec<f64>> {
        (0..rows)
            .map(|_| (0..cols).map(|_| rng.random_range(-100.0..100.0)).collect())
            .collect()
    }

    fn total(scores: &[Vec<f64>], picks: &[Option<usize>]) -> f64 {
        picks
            .iter()
            .enumerate()
            .filter_map(|(r, pick)| pick.map(|c| scores[r][c]))
            .sum()
    }

    fn brute_force(scores: &[Vec<f64>]) -> f64 {
        fn go(
            scores: &[Vec<f64>],
            row: usize,
            taken: &mut Vec<bool>,
            pairs: usize,
            acc: f64,
            need: usize,
            best: &mut f64,
        ) {
            if row == scores.len() {
                if pairs == need {
                    *best = best.max(acc);
                }
                return;
            }
            go(scores, row + 1, taken, pairs, acc, need, best);
            for col in 0..taken.len() {
                if !taken[col] {
                    taken[col] = true;
                    go(scores, row + 1, taken, pairs + 1, acc + scores[row][col], need, best);
                    taken[col] = false;
                }
            }
        }
        let cols = scores.first().map_or(0, |row| row.len());
        let need = scores.len().min(cols);
        let mut best = f64::NEG_INFINITY;
        go(scores, 0, &mut vec![false; cols], 0, 0.0, need, &mut best);
        best
    }

    fn assert_exclusive(picks: &[Option<usize>]) {
        let mut used: Vec<usize> = picks.iter().flatten().copied().collect();
        let before = used.len();
        used.sort_unstable();
        used.dedup();
        assert_eq!(used.len(), before, "task assigned twice: {:?}", picks);
    }

    #[test]
    fn test_exact_matches_brute_force() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..300 {
            let rows = rng.random_range(1..=4);
            let cols = rng.random_range(1..=4);
            let scores = random_scores(&mut rng, rows, cols);
            let picks = solve_exact(&scores);
            assert_exclusive(&picks);
            assert_eq!(picks.iter().flatten().count(), rows.min(cols));
            assert!((total(&scores, &picks) - brute_force(&scores)).abs() < 1e-6);
        }
    }

    #[test]
    fn test_exact_dominates_greedy() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..200 {
            let rows = rng.random_range(1..=6);
            let cols = rng.random_range(1..=8);
            let scores = random_scores(&mut rng, rows, cols);
            let exact = solve_exact(&scores);
            let greedy = solve_greedy(&scores);
            assert!(total(&scores, &exact) + 1e-6 >= total(&scores, &greedy));
        }
    }

    #[test]
    fn test_greedy_fallback_above_cap() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let rows = rng.random_range(1..=12);
            let cols = rng.random_range(1..=15);
            let scores = random_scores(&mut rng, rows, cols);
            let (picks, method) = solve(&scores, 0);
            assert_eq!(method, SolveMethod::Greedy);
            assert_exclusive(&picks);
            assert_eq!(picks.iter().flatten().count(), rows.min(cols));
        }
        let scores = random_scores(&mut rng, 3, 3);
        assert_eq!(solve(&scores, 100).1, SolveMethod::Exact);
    }

    #[test]
    fn test_greedy_known_case() {
        // Greedy grabs the 10, exact prefers 9 + 8.
        let scores = vec![vec![10.0, 9.0], vec![8.0, 0.0]];
        assert_eq!(solve_greedy(&scores), vec![Some(0), Some(1)]);
        assert_eq!(solve_exact(&scores), vec![Some(1), Some(0)]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(solve_exact(&[]).is_empty());
        assert_eq!(solve_exact(&[vec![], vec![]]), vec![None, None]);
        assert_eq!(solve_greedy(&[vec![], vec![]]), vec![None, None]);
    }

    #[test]
    fn test_score_penalizes_carrier_off_carry() {
        let rules = Rules::default();
        let tuning = Tuning::default();
        let belief = BeliefState::new(&rules, &tuning);
        let mut scorer = TacticalScorer::new(&rules, &tuning);
        scorer.begin_tick(1);

        let me = Entity::new(0, Point::new(4000.0, 4000.0)).carrying(9);
        let obs = Observation::new(1, me.clone(), Point::new(0.0, 0.0), Point::new(16000.0, 9000.0));
        let ctx = ScoreContext {
            obs: &obs,
            belief: &belief,
            rules: &rules,
            tuning: &tuning,
        };
        let unit = Unit {
            entity: me,
            role: Role::Scout,
            stun_ready: true,
        };
        let carry = Task::new(TaskKind::Carry, Point::new(2000.0, 2000.0), TaskPayload::Ally(0), 35.0);
        let block = Task::new(TaskKind::Block, Point::new(2000.0, 2000.0), TaskPayload::None, 35.0);
        let gap = score(&unit, &carry, &ctx, &mut scorer) - score(&unit, &block, &ctx, &mut scorer);
        assert!((gap - CARRYING_PENALTY).abs() < 1e-9);
    }

    #[test]
    fn test_plan_assignment_prefers_role_and_distance() {
        let rules = Rules::default();
        let tuning = Tuning::default();
        let belief = BeliefState::new(&rules, &tuning);
        let mut scorer = TacticalScorer::new(&rules, &tuning);
        scorer.begin_tick(1);
        let memory = AgentMemory::new();

        let mut obs = Observation::new(
            1,
            Entity::new(0, Point::new(3000.0, 3000.0)),
            Point::new(0.0, 0.0),
            Point::new(16000.0, 9000.0),
        );
        obs.friends.push(Entity::new(1, Point::new(12000.0, 6000.0)));
        obs.team_size = 2;
        let units = team_units(&obs, &memory);
        assert_eq!(units[0].role, Role::Buster);
        assert_eq!(units[1].role, Role::Catcher);

        let tasks = vec![
            Task::new(TaskKind::Block, Point::new(13700.0, 7700.0), TaskPayload::None, 15.0),
            Task::new(TaskKind::Carry, Point::new(3000.0, 3000.0), TaskPayload::None, 15.0),
        ];
        let ctx = ScoreContext {
            obs: &obs,
            belief: &belief,
            rules: &rules,
            tuning: &tuning,
        };
        let assignment = plan_assignment(&units, &tasks, &ctx, &mut scorer);
        assert_eq!(assignment.method, SolveMethod::Exact);
        assert_eq!(assignment.task_for(0), Some(1));
        assert_eq!(assignment.task_for(1), Some(0));
    }
}
