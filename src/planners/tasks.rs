use std::fmt;

use crate::infra::{Point, Rules, Tuning};
use crate::state::{AgentMemory, BeliefState, Entity, Observation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Bust,
    Intercept,
    Defend,
    Block,
    Explore,
    Support,
    Carry,
}

impl TaskKind {
    pub fn name(&self) -> &'static str {
        match self {
            TaskKind::Bust => "bust",
            TaskKind::Intercept => "intercept",
            TaskKind::Defend => "defend",
            TaskKind::Block => "block",
            TaskKind::Explore => "explore",
            TaskKind::Support => "support",
            TaskKind::Carry => "carry",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ids a task refers to, so execution can check they still exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPayload {
    None,
    Ghost(u32),
    /// `visible` is false for targets derived from a remembered sighting.
    Enemy { id: u32, visible: bool },
    Ally(u32),
    Explore { unit: u32, patrol: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub kind: TaskKind,
    pub target: Point,
    pub payload: TaskPayload,
    pub base_score: f64,
}

impl Task {
    pub fn new(kind: TaskKind, target: Point, payload: TaskPayload, base_score: f64) -> Self {
        Self {
            kind,
            target,
            payload,
            base_score,
        }
    }
}

/// Behavioural role, fixed per roster slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Buster,
    Catcher,
    Scout,
}

impl Role {
    pub fn for_local_index(index: usize) -> Self {
        match index % 3 {
            0 => Role::Buster,
            1 => Role::Catcher,
            _ => Role::Scout,
        }
    }

    pub fn likes(&self, kind: TaskKind) -> bool {
        matches!(
            (self, kind),
            (Role::Buster, TaskKind::Bust | TaskKind::Carry)
                | (
                    Role::Catcher,
                    TaskKind::Intercept | TaskKind::Defend | TaskKind::Block
                )
                | (Role::Scout, TaskKind::Explore | TaskKind::Support)
        )
    }
}

const PATROL_WAYPOINTS: [(f64, f64); 6] = [
    (3000.0, 7000.0),
    (8000.0, 4500.0),
    (13000.0, 2000.0),
    (7000.0, 1500.0),
    (12000.0, 7500.0),
    (2500.0, 3000.0),
];

/// Fixed patrol route, mirrored for the team starting in the far corner.
pub fn patrol_waypoints(own_base: &Point, rules: &Rules) -> Vec<Point> {
    let mirrored = own_base.x > rules.map_width / 2.0;
    PATROL_WAYPOINTS
        .iter()
        .map(|&(x, y)| {
            if mirrored {
                Point::new(rules.map_width - 1.0 - x, rules.map_height - 1.0 - y)
            } else {
                Point::new(x, y)
            }
        })
        .collect()
}

/// Next patrol waypoint for a team member. Members start staggered along the route.
pub fn patrol_target(
    unit_id: u32,
    local_index: usize,
    own_base: &Point,
    memory: &AgentMemory,
    rules: &Rules,
) -> Point {
    let route = patrol_waypoints(own_base, rules);
    let idx = (memory.patrol_index(unit_id) + local_index * 2) % route.len();
    route[idx]
}

/// Everything task generation reads. Nothing here is mutated.
pub struct TaskContext<'a> {
    pub obs: &'a Observation,
    pub belief: &'a BeliefState,
    pub memory: &'a AgentMemory,
    pub rules: &'a Rules,
    pub tuning: &'a Tuning,
}

impl TaskContext<'_> {
    fn ally_stun_ready(&self, ally: &Entity) -> bool {
        ally.can_stun() && self.memory.stun_ready(ally.id, self.obs.tick)
    }

    fn enemies_near(&self, point: &Point, radius: f64) -> usize {
        self.obs
            .enemies
            .iter()
            .filter(|e| e.position.distance(point) <= radius)
            .count()
    }
}

/// Builds the tick's candidate objectives with unit-independent scores.
#[tracing::instrument(level = "trace", skip(ctx), fields(tick = ctx.obs.tick))]
pub fn generate_tasks(ctx: &TaskContext) -> Vec<Task> {
    let mut tasks = Vec::new();

    let intercept_count = intercept_tasks(ctx, &mut tasks);
    defend_task(ctx, &mut tasks);
    bust_tasks(ctx, &mut tasks);
    support_tasks(ctx, &mut tasks);
    carry_tasks(ctx, &mut tasks);
    if intercept_count == 0 {
        block_task(ctx, &mut tasks);
    }
    explore_tasks(ctx, &mut tasks);

    tracing::debug!(
        tick = ctx.obs.tick,
        total = tasks.len(),
        intercept = intercept_count,
        "Generated tasks"
    );
    tasks
}

fn intercept_tasks(ctx: &TaskContext, tasks: &mut Vec<Task>) -> usize {
    let obs = ctx.obs;
    let tuning = ctx.tuning;
    let before = tasks.len();

    for enemy in obs.enemies.iter().filter(|e| e.is_carrying()) {
        let target = enemy.position.midpoint(&obs.own_base);
        let score = tuning.intercept_score + tuning.corridor_weight * ctx.belief.corridor_at(&target);
        tasks.push(Task::new(
            TaskKind::Intercept,
            target,
            TaskPayload::Enemy {
                id: enemy.id,
                visible: true,
            },
            score,
        ));
    }

    for track in ctx.belief.remembered_enemies() {
        if !track.is_carrying() || obs.enemy(track.id).is_some() {
            continue;
        }
        let path = ctx
            .belief
            .predict_enemy_path(track, obs.enemy_base, tuning.prediction_horizon);
        for (k, point) in path.iter().enumerate() {
            let target = point.midpoint(&obs.own_base);
            let confidence = (0.9 - 0.1 * k as f64).max(0.1);
            let score = tuning.intercept_score * confidence
                + tuning.corridor_weight * ctx.belief.corridor_at(point);
            tasks.push(Task::new(
                TaskKind::Intercept,
                target,
                TaskPayload::Enemy {
                    id: track.id,
                    visible: false,
                },
                score,
            ));
        }
    }

    tasks.len() - before
}

fn defend_task(ctx: &TaskContext, tasks: &mut Vec<Task>) {
    let obs = ctx.obs;
    let base = obs.own_base;
    let radius = ctx.tuning.defend_radius;

    let visible = obs.enemies.iter().map(|e| (e.id, e.position, true));
    let remembered = ctx
        .belief
        .remembered_enemies()
        .into_iter()
        .filter(|t| obs.enemy(t.id).is_none())
        .map(|t| (t.id, t.last.position, false));

    let threat = visible
        .chain(remembered)
        .filter(|(_, pos, _)| pos.distance(&base) <= radius)
        .min_by(|a, b| {
            a.1.distance(&base)
                .total_cmp(&b.1.distance(&base))
                .then(a.0.cmp(&b.0))
        });

    if let Some((id, pos, visible)) = threat {
        let urgency = 1.0 - pos.distance(&base) / radius;
        tasks.push(Task::new(
            TaskKind::Defend,
            pos.midpoint(&base),
            TaskPayload::Enemy { id, visible },
            ctx.tuning.defend_score * (1.0 + 0.5 * urgency),
        ));
    }
}

fn bust_tasks(ctx: &TaskContext, tasks: &mut Vec<Task>) {
    let team = ctx.obs.team();
    for ghost in &ctx.obs.ghosts {
        let mut score = ctx.tuning.bust_score;
        let ringed = team
            .iter()
            .any(|u| ctx.rules.in_capture_band(u.position.distance(&ghost.position)));
        if ringed {
            score += ctx.tuning.bust_ring_bonus;
        }
        let contest = ctx.enemies_near(&ghost.position, ctx.tuning.near_radius);
        score -= ctx.tuning.bust_contest_penalty * contest as f64;
        tasks.push(Task::new(
            TaskKind::Bust,
            ghost.position,
            TaskPayload::Ghost(ghost.id),
            score,
        ));
    }
}

fn support_tasks(ctx: &TaskContext, tasks: &mut Vec<Task>) {
    let obs = ctx.obs;
    let tuning = ctx.tuning;
    let team = obs.team();

    for ghost in &obs.ghosts {
        let ally_near = team
            .iter()
            .any(|u| u.position.distance(&ghost.position) <= tuning.support_radius);
        let enemies = ctx.enemies_near(&ghost.position, tuning.near_radius);
        if ally_near && enemies > 0 {
            tasks.push(Task::new(
                TaskKind::Support,
                ghost.position,
                TaskPayload::Ghost(ghost.id),
                tuning.support_score + 2.0 * enemies as f64,
            ));
        }
    }

    for enemy in obs.enemies.iter().filter(|e| !e.is_stunned()) {
        let around: Vec<&&Entity> = team
            .iter()
            .filter(|u| u.position.distance(&enemy.position) <= tuning.support_radius)
            .collect();
        if around.len() >= 2 && around.iter().any(|u| ctx.ally_stun_ready(u)) {
            let bonus = if enemy.is_carrying() { 5.0 } else { 0.0 };
            tasks.push(Task::new(
                TaskKind::Support,
                enemy.position,
                TaskPayload::Enemy {
                    id: enemy.id,
                    visible: true,
                },
                tuning.support_score + bonus,
            ));
        }
    }
}

fn carry_tasks(ctx: &TaskContext, tasks: &mut Vec<Task>) {
    let base = ctx.obs.own_base;
    for carrier in ctx.obs.team().into_iter().filter(|u| u.is_carrying()) {
        let target = carrier.position.midpoint(&base);
        let risk = ctx.enemies_near(&target, ctx.tuning.near_radius);
        tasks.push(Task::new(
            TaskKind::Carry,
            target,
            TaskPayload::Ally(carrier.id),
            ctx.tuning.carry_score - ctx.tuning.carry_risk_penalty * risk as f64,
        ));
    }
}

fn block_task(ctx: &TaskContext, tasks: &mut Vec<Task>) {
    let enemy_base = ctx.obs.enemy_base;
    let center = ctx.rules.bounds().center();
    let target = ctx
        .rules
        .bounds()
        .clamp(enemy_base.toward(&center, ctx.tuning.block_ring));
    tasks.push(Task::new(
        TaskKind::Block,
        target,
        TaskPayload::None,
        ctx.tuning.block_score,
    ));
}

fn explore_tasks(ctx: &TaskContext, tasks: &mut Vec<Task>) {
    let obs = ctx.obs;
    for (local_index, member) in obs.team().into_iter().enumerate() {
        let (target, patrol) = match ctx.belief.pick_frontier_target(&member.position) {
            Some(cell) => (cell, false),
            None => (
                patrol_target(member.id, local_index, &obs.own_base, ctx.memory, ctx.rules),
                true,
            ),
        };
        let heat = ctx.belief.heat_at(&target).min(2.0);
        tasks.push(Task::new(
            TaskKind::Explore,
            target,
            TaskPayload::Explore {
                unit: member.id,
                patrol,
            },
            ctx.tuning.explore_score + ctx.tuning.explore_heat_weight * heat,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        rules: Rules,
        tuning: Tuning,
        belief: BeliefState,
        memory: AgentMemory,
    }

    impl Fixture {
        fn new(tick: u32) -> Self {
            let rules = Rules::default();
            let tuning = Tuning::default();
            let mut belief = BeliefState::new(&rules, &tuning);
            belief.begin_tick(tick);
            Self {
                rules,
                tuning,
                belief,
                memory: AgentMemory::new(),
            }
        }

        fn tasks(&self, obs: &Observation) -> Vec<Task> {
            generate_tasks(&TaskContext {
                obs,
                belief: &self.belief,
                memory: &self.memory,
                rules: &self.rules,
                tuning: &self.tuning,
            })
        }
    }

    fn obs(tick: u32, me: Entity) -> Observation {
        Observation::new(
            tick,
            me,
            Point::new(0.0, 0.0),
            Point::new(16000.0, 9000.0),
        )
    }

    fn count(tasks: &[Task], kind: TaskKind) -> usize {
        tasks.iter().filter(|t| t.kind == kind).count()
    }

    #[test]
    fn test_quiet_map_yields_block_and_explore_only() {
        let fixture = Fixture::new(5);
        let mut o = obs(5, Entity::new(0, Point::new(2000.0, 2000.0)));
        o.friends.push(Entity::new(1, Point::new(2500.0, 2000.0)));
        let tasks = fixture.tasks(&o);

        assert_eq!(count(&tasks, TaskKind::Explore), 2);
        assert_eq!(count(&tasks, TaskKind::Block), 1);
        assert_eq!(tasks.len(), 3);

        let block = tasks.iter().find(|t| t.kind == TaskKind::Block).unwrap();
        assert!((block.target.distance(&o.enemy_base) - 2600.0).abs() < 1e-6);
    }

    #[test]
    fn test_visible_carrier_intercept_and_no_block() {
        let fixture = Fixture::new(5);
        let mut o = obs(5, Entity::new(0, Point::new(2000.0, 2000.0)));
        o.enemies.push(Entity::new(5, Point::new(8000.0, 4000.0)).carrying(11));
        let tasks = fixture.tasks(&o);

        let intercept = tasks.iter().find(|t| t.kind == TaskKind::Intercept).unwrap();
        assert_eq!(intercept.target, Point::new(4000.0, 2000.0));
        assert_eq!(
            intercept.payload,
            TaskPayload::Enemy {
                id: 5,
                visible: true
            }
        );
        assert_eq!(count(&tasks, TaskKind::Block), 0);
    }

    #[test]
    fn test_remembered_carrier_yields_one_intercept_per_predicted_point() {
        let mut fixture = Fixture::new(4);
        fixture
            .belief
            .track_enemies(&[Entity::new(6, Point::new(9000.0, 5000.0)).carrying(2)], 4);
        fixture.belief.begin_tick(6);

        let o = obs(6, Entity::new(0, Point::new(2000.0, 2000.0)));
        let tasks = fixture.tasks(&o);
        let intercepts: Vec<&Task> = tasks
            .iter()
            .filter(|t| t.kind == TaskKind::Intercept)
            .collect();
        assert_eq!(intercepts.len(), fixture.tuning.prediction_horizon);
        assert!(intercepts.iter().all(|t| t.payload
            == TaskPayload::Enemy {
                id: 6,
                visible: false
            }));
        // Closer predictions carry more confidence.
        assert!(intercepts[0].base_score > intercepts[2].base_score);
        assert_eq!(count(&tasks, TaskKind::Block), 0);
    }

    #[test]
    fn test_defend_single_task_for_closest_threat() {
        let fixture = Fixture::new(5);
        let mut o = obs(5, Entity::new(0, Point::new(6000.0, 6000.0)));
        o.enemies.push(Entity::new(5, Point::new(3000.0, 0.0)));
        o.enemies.push(Entity::new(6, Point::new(2000.0, 0.0)));
        let tasks = fixture.tasks(&o);

        let defends: Vec<&Task> = tasks.iter().filter(|t| t.kind == TaskKind::Defend).collect();
        assert_eq!(defends.len(), 1);
        assert_eq!(defends[0].target, Point::new(1000.0, 0.0));
    }

    #[test]
    fn test_bust_score_ring_bonus_and_contest_penalty() {
        let fixture = Fixture::new(5);
        let mut o = obs(5, Entity::new(0, Point::new(5000.0, 5000.0)));
        o.ghosts.push(Entity::new(20, Point::new(6200.0, 5000.0)));
        o.ghosts.push(Entity::new(21, Point::new(12000.0, 1000.0)));
        o.enemies.push(Entity::new(8, Point::new(12500.0, 1500.0)));
        let tasks = fixture.tasks(&o);

        let score_of = |id: u32| {
            tasks
                .iter()
                .find(|t| t.kind == TaskKind::Bust && t.payload == TaskPayload::Ghost(id))
                .unwrap()
                .base_score
        };
        let t = &fixture.tuning;
        assert_eq!(score_of(20), t.bust_score + t.bust_ring_bonus);
        assert_eq!(score_of(21), t.bust_score - t.bust_contest_penalty);
    }

    #[test]
    fn test_support_for_contested_ghost_and_stun_chain() {
        let fixture = Fixture::new(5);
        let mut o = obs(5, Entity::new(0, Point::new(5000.0, 5000.0)));
        o.friends.push(Entity::new(1, Point::new(5600.0, 5000.0)));
        o.ghosts.push(Entity::new(20, Point::new(6000.0, 5000.0)));
        o.enemies.push(Entity::new(8, Point::new(7000.0, 5000.0)));
        let tasks = fixture.tasks(&o);

        assert!(tasks.iter().any(|t| t.kind == TaskKind::Support
            && t.payload == TaskPayload::Ghost(20)));
        assert!(tasks.iter().any(|t| t.kind == TaskKind::Support
            && t.payload
                == TaskPayload::Enemy {
                    id: 8,
                    visible: true
                }));
    }

    #[test]
    fn test_carry_penalized_by_enemy_presence() {
        let fixture = Fixture::new(5);
        let mut o = obs(5, Entity::new(0, Point::new(6000.0, 6000.0)));
        o.friends
            .push(Entity::new(1, Point::new(4000.0, 4000.0)).carrying(9));
        o.enemies.push(Entity::new(8, Point::new(2200.0, 2000.0)));
        let tasks = fixture.tasks(&o);

        let carry = tasks.iter().find(|t| t.kind == TaskKind::Carry).unwrap();
        assert_eq!(carry.target, Point::new(2000.0, 2000.0));
        assert_eq!(carry.payload, TaskPayload::Ally(1));
        assert_eq!(
            carry.base_score,
            fixture.tuning.carry_score - fixture.tuning.carry_risk_penalty
        );
    }

    #[test]
    fn test_explore_falls_back_to_patrol_before_warmup() {
        let fixture = Fixture::new(0);
        let o = obs(0, Entity::new(0, Point::new(1000.0, 1000.0)));
        let tasks = fixture.tasks(&o);
        let explore = tasks.iter().find(|t| t.kind == TaskKind::Explore).unwrap();
        assert_eq!(
            explore.payload,
            TaskPayload::Explore {
                unit: 0,
                patrol: true
            }
        );
        assert_eq!(explore.target, Point::new(3000.0, 7000.0));
    }

    #[test]
    fn test_patrol_route_mirrors_for_far_base() {
        let rules = Rules::default();
        let near = patrol_waypoints(&Point::new(0.0, 0.0), &rules);
        let far = patrol_waypoints(&Point::new(16000.0, 9000.0), &rules);
        assert_eq!(far[0], Point::new(16000.0 - near[0].x, 9000.0 - near[0].y));
    }
}
