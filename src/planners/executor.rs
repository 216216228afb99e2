use std::collections::HashSet;
use std::f64::consts::TAU;

use crate::infra::{Action, ActionKind, Point, Rules, Tuning};
use crate::planners::assignment::Assignment;
use crate::planners::tactics::TacticalScorer;
use crate::planners::tasks::{Task, TaskPayload, patrol_target, patrol_waypoints};
use crate::state::{AgentMemory, BeliefState, Entity, Observation};

const ACTION_BONUS: f64 = 1.0;

/// Per-decision view: the observation, the shared tick plan and the
/// session state the executor is allowed to update.
pub struct DecisionContext<'a> {
    pub obs: &'a Observation,
    pub tasks: &'a [Task],
    pub assignment: &'a Assignment,
    pub memory: &'a mut AgentMemory,
    pub belief: &'a mut BeliefState,
    pub scorer: &'a mut TacticalScorer,
    /// Enemies already targeted by a STUN from our team this tick.
    pub stun_claims: &'a mut HashSet<u32>,
}

impl DecisionContext<'_> {
    fn me(&self) -> &Entity {
        &self.obs.me
    }

    fn stun_ready(&self) -> bool {
        self.obs.me.can_stun() && self.memory.stun_ready(self.obs.me.id, self.obs.tick)
    }

    fn stunnable(&self, enemy: &Entity) -> bool {
        !enemy.is_stunned() && !self.stun_claims.contains(&enemy.id)
    }
}

struct Candidate {
    action: Action,
    /// Where the unit stands after the action, for scoring.
    projected: Point,
}

/// Turns one unit's assignment into a concrete action, by fixed priority.
pub struct Executor {
    rules: Rules,
    tuning: Tuning,
}

impl Executor {
    pub fn new(rules: &Rules, tuning: &Tuning) -> Self {
        Self {
            rules: rules.clone(),
            tuning: tuning.clone(),
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(unit = ctx.obs.me.id, tick = ctx.obs.tick))]
    pub fn decide(&self, ctx: &mut DecisionContext) -> Action {
        let action = self
            .release(ctx)
            .or_else(|| self.eject_escape(ctx))
            .or_else(|| self.stun(ctx))
            .or_else(|| self.radar(ctx))
            .or_else(|| self.home_run(ctx))
            .or_else(|| self.immediate_bust(ctx))
            .or_else(|| self.plan(ctx))
            .unwrap_or_else(|| self.fallback(ctx));

        tracing::debug!(
            unit = ctx.obs.me.id,
            tick = ctx.obs.tick,
            action = %action,
            "Selected action"
        );
        action
    }

    fn release(&self, ctx: &DecisionContext) -> Option<Action> {
        let me = ctx.me();
        let radius = self.tuning.release_radius(&self.rules);
        (me.is_carrying() && me.position.distance(&ctx.obs.own_base) <= radius)
            .then(|| Action::release().tagged("release"))
    }

    fn eject_escape(&self, ctx: &DecisionContext) -> Option<Action> {
        let me = ctx.me();
        if !me.is_carrying() {
            return None;
        }
        let base = ctx.obs.own_base;
        let my_left = me.position.distance(&base);

        let relay = ctx
            .obs
            .friends
            .iter()
            .filter(|f| f.id != me.id && !f.is_carrying() && !f.is_stunned())
            .filter(|f| f.position.distance(&me.position) <= self.rules.eject_max)
            .filter(|f| f.position.distance(&base) < my_left)
            .min_by(|a, b| {
                a.position
                    .distance(&base)
                    .total_cmp(&b.position.distance(&base))
                    .then(a.id.cmp(&b.id))
            });
        if let Some(ally) = relay {
            return Some(Action::eject(ally.position).tagged("relay"));
        }

        let threatened = ctx
            .obs
            .enemies
            .iter()
            .any(|e| e.can_stun() && e.position.distance(&me.position) <= self.tuning.threat_radius);
        if threatened && !ctx.stun_ready() {
            let target = self
                .rules
                .bounds()
                .clamp(me.position.toward(&base, self.rules.eject_max));
            return Some(Action::eject(target).tagged("escape"));
        }
        None
    }

    fn stun(&self, ctx: &mut DecisionContext) -> Option<Action> {
        if !ctx.stun_ready() {
            return None;
        }
        let me = ctx.me().clone();
        let nearest = |limit: f64, carriers_only: bool| {
            ctx.obs
                .enemies
                .iter()
                .filter(|e| ctx.stunnable(e))
                .filter(|e| !carriers_only || e.is_carrying())
                .filter(|e| e.position.distance(&me.position) <= limit)
                .min_by(|a, b| {
                    a.position
                        .distance(&me.position)
                        .total_cmp(&b.position.distance(&me.position))
                        .then(a.id.cmp(&b.id))
                })
                .cloned()
        };
        let target = nearest(self.rules.stun_range, true)
            .or_else(|| nearest(self.rules.bust_max, false))?;

        if ctx.scorer.duel(&me, &target, true) < 0.0 {
            return None;
        }
        ctx.memory
            .record_stun(me.id, ctx.obs.tick, self.rules.stun_cooldown);
        ctx.stun_claims.insert(target.id);
        Some(Action::stun(target.id).tagged("stun"))
    }

    fn radar(&self, ctx: &mut DecisionContext) -> Option<Action> {
        let me = ctx.me();
        let slot = ctx.obs.local_index();
        let scheduled = self.tuning.radar_ticks.get(slot) == Some(&ctx.obs.tick);
        if !scheduled || ctx.obs.radar_used || ctx.memory.radar_used(me.id) {
            return None;
        }
        let (id, position) = (me.id, me.position);
        ctx.memory.record_radar(id, ctx.obs.tick);
        ctx.belief.clear_circle(&position, self.rules.radar_radius);
        Some(Action::radar().tagged("radar"))
    }

    fn home_run(&self, ctx: &DecisionContext) -> Option<Action> {
        ctx.me()
            .is_carrying()
            .then(|| Action::move_to(ctx.obs.own_base).tagged("home"))
    }

    /// Only the nearest ghost counts. A farther ghost inside the band is left
    /// to the plan.
    fn immediate_bust(&self, ctx: &DecisionContext) -> Option<Action> {
        let me = ctx.me();
        ctx.obs
            .nearest_ghost()
            .filter(|g| self.rules.in_capture_band(g.position.distance(&me.position)))
            .map(|ghost| Action::bust(ghost.id).tagged("bust"))
    }

    /// Whether the ids a task refers to still resolve.
    fn task_is_live(&self, ctx: &DecisionContext, task: &Task) -> bool {
        match task.payload {
            TaskPayload::Ghost(id) => ctx.obs.ghost(id).is_some(),
            TaskPayload::Enemy { id, visible: true } => ctx.obs.enemy(id).is_some(),
            TaskPayload::Enemy { id, visible: false } => ctx.belief.enemies().get(id).is_some(),
            TaskPayload::Ally(id) => ctx.obs.friend(id).is_some(),
            TaskPayload::Explore { .. } | TaskPayload::None => true,
        }
    }

    /// Carriers never get here: they release, eject or head home first, so
    /// plan candidates are moves, stuns and busts only.
    fn plan(&self, ctx: &mut DecisionContext) -> Option<Action> {
        let me = ctx.me().clone();
        let tasks = ctx.tasks;
        let index = ctx.assignment.task_for(me.id)?;
        let Some(task) = tasks.get(index) else {
            tracing::warn!(unit = me.id, index, "Assigned task index out of range");
            return None;
        };
        if !self.task_is_live(ctx, task) {
            tracing::debug!(unit = me.id, task = %task.kind, "Task target gone, falling through");
            return None;
        }

        let mut target = task.target;
        if let TaskPayload::Explore { unit, patrol: true } = task.payload
            && unit == me.id
            && me.position.distance(&target) <= self.tuning.patrol_reach
        {
            let route_len = patrol_waypoints(&ctx.obs.own_base, &self.rules).len();
            ctx.memory.advance_patrol(me.id, ctx.obs.tick, route_len);
            target = patrol_target(
                me.id,
                ctx.obs.local_index(),
                &ctx.obs.own_base,
                ctx.memory,
                &self.rules,
            );
        }

        let candidates = self.candidates(ctx, &me, task, target);
        let mut best: Option<(f64, Candidate)> = None;
        for candidate in candidates {
            let value = self.evaluate(ctx, &me, task, target, &candidate);
            if best.as_ref().is_none_or(|(top, _)| value > *top) {
                best = Some((value, candidate));
            }
        }
        let (_, chosen) = best?;

        if let ActionKind::Stun(enemy_id) = chosen.action.kind {
            ctx.memory
                .record_stun(me.id, ctx.obs.tick, self.rules.stun_cooldown);
            ctx.stun_claims.insert(enemy_id);
        }
        Some(chosen.action.tagged(task.kind.name()))
    }

    fn candidates(
        &self,
        ctx: &DecisionContext,
        me: &Entity,
        task: &Task,
        target: Point,
    ) -> Vec<Candidate> {
        let bounds = self.rules.bounds();
        let speed = self.rules.move_speed;
        let move_to = |point: Point| {
            let point = bounds.clamp(point);
            Candidate {
                action: Action::move_to(point),
                projected: me.position.step_toward(&point, speed),
            }
        };

        let mut out = vec![move_to(target)];
        let count = self.tuning.candidate_count.max(1);
        for k in 0..count {
            let angle = TAU * k as f64 / count as f64;
            out.push(move_to(target.on_circle(self.tuning.candidate_radius, angle)));
        }

        match task.payload {
            TaskPayload::Ghost(id) => {
                if let Some(ghost) = ctx.obs.ghost(id) {
                    let ring = self.rules.capture_ring();
                    out.push(move_to(ghost.position.toward(&me.position, ring)));
                    for k in 0..count {
                        let angle = TAU * k as f64 / count as f64;
                        out.push(move_to(ghost.position.on_circle(ring, angle)));
                    }
                    if self
                        .rules
                        .in_capture_band(ghost.position.distance(&me.position))
                    {
                        out.push(Candidate {
                            action: Action::bust(id),
                            projected: me.position,
                        });
                    }
                }
            }
            TaskPayload::Enemy { id, visible } => {
                let enemy = if visible {
                    ctx.obs.enemy(id).cloned()
                } else {
                    ctx.belief.enemies().get(id).map(|t| t.as_entity())
                };
                if let Some(enemy) = enemy {
                    if enemy.is_carrying() {
                        let meet = ctx.scorer.intercept_point(
                            &me.position,
                            &enemy.position,
                            &ctx.obs.enemy_base,
                        );
                        out.push(move_to(meet));
                    }
                    let in_range = enemy.position.distance(&me.position) <= self.rules.stun_range;
                    if visible && in_range && ctx.stun_ready() && ctx.stunnable(&enemy) {
                        out.push(Candidate {
                            action: Action::stun(id),
                            projected: me.position,
                        });
                    }
                }
            }
            TaskPayload::Ally(id) => {
                if let Some(carrier) = ctx.obs.friend(id)
                    && carrier.id != me.id
                {
                    let escort = carrier
                        .position
                        .step_toward(&ctx.obs.own_base, speed);
                    out.push(move_to(escort));
                }
            }
            TaskPayload::Explore { .. } | TaskPayload::None => {}
        }
        out
    }

    fn evaluate(
        &self,
        ctx: &mut DecisionContext,
        me: &Entity,
        task: &Task,
        target: Point,
        candidate: &Candidate,
    ) -> f64 {
        let p = candidate.projected;
        let mut value = -self.tuning.candidate_distance_weight * p.distance(&target);

        match task.payload {
            TaskPayload::Ghost(id) => {
                if let Some(ghost) = ctx.obs.ghost(id) {
                    let enemies: Vec<Point> = ctx
                        .obs
                        .enemies
                        .iter()
                        .map(|e| e.position)
                        .filter(|e| e.distance(&ghost.position) <= self.tuning.near_radius)
                        .collect();
                    if !enemies.is_empty() {
                        let ready = ctx.stun_ready();
                        value += ctx.scorer.contest(&p, &ghost.position, &enemies, ready);
                    }
                    if let ActionKind::Bust(_) = candidate.action.kind {
                        value += ACTION_BONUS;
                    }
                }
            }
            TaskPayload::Enemy { id, visible } => {
                let enemy = if visible {
                    ctx.obs.enemy(id).cloned()
                } else {
                    ctx.belief.enemies().get(id).map(|t| t.as_entity())
                };
                if let Some(enemy) = enemy {
                    if enemy.is_carrying() {
                        value += ctx
                            .scorer
                            .intercept(&p, &enemy.position, &ctx.obs.enemy_base);
                    }
                    if let ActionKind::Stun(_) = candidate.action.kind {
                        let ready = ctx.stun_ready();
                        value += ACTION_BONUS + ctx.scorer.duel(me, &enemy, ready);
                    }
                }
            }
            TaskPayload::Ally(id) => {
                if let Some(carrier) = ctx.obs.friend(id)
                    && carrier.id != me.id
                {
                    value += ctx
                        .scorer
                        .eject(&carrier.position, &p, &ctx.obs.own_base);
                }
            }
            TaskPayload::Explore { .. } | TaskPayload::None => {}
        }
        value
    }

    fn fallback(&self, ctx: &DecisionContext) -> Action {
        let me = ctx.me();
        match ctx.obs.nearest_ghost() {
            Some(ghost) => {
                let ring = self.rules.capture_ring();
                let point = self
                    .rules
                    .bounds()
                    .clamp(ghost.position.toward(&me.position, ring));
                Action::move_to(point).tagged("chase")
            }
            None => Action::move_to(ctx.obs.own_base).tagged("base"),
        }
    }
}
