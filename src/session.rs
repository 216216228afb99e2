use std::collections::HashSet;

use crate::infra::{Action, DecisionObserver, DefaultObserver, Rules, Tuning};
use crate::planners::{
    Assignment, DecisionContext, Executor, ScoreContext, TacticalScorer, Task, TaskContext,
    generate_tasks, plan_assignment, team_units,
};
use crate::state::{AgentMemory, BeliefState, Observation};

/// Confidence written into the corridor layer for predicted carrier paths.
const CORRIDOR_CONFIDENCE: f64 = 0.9;

/// Plan shared by every unit of the team on one tick.
struct TickPlan {
    tick: u32,
    tasks: Vec<Task>,
    assignment: Assignment,
}

/// All decision state for one team across a match.
///
/// Units call [`Session::decide`] with their own observation. The first call
/// on a tick advances the belief state and builds the team plan, later calls
/// on the same tick reuse it. A tick lower than the previous one starts a new
/// match.
pub struct Session {
    rules: Rules,
    tuning: Tuning,
    belief: BeliefState,
    memory: AgentMemory,
    scorer: TacticalScorer,
    executor: Executor,
    observer: Box<dyn DecisionObserver>,

    last_tick: Option<u32>,
    plan: Option<TickPlan>,
    stun_claims: HashSet<u32>,
    matches: u32,
}

impl Session {
    pub fn new(rules: Rules, tuning: Tuning) -> Self {
        Self::with_observer(rules, tuning, DefaultObserver)
    }

    pub fn with_observer(
        rules: Rules,
        tuning: Tuning,
        observer: impl DecisionObserver + 'static,
    ) -> Self {
        Self {
            belief: BeliefState::new(&rules, &tuning),
            memory: AgentMemory::new(),
            scorer: TacticalScorer::new(&rules, &tuning),
            executor: Executor::new(&rules, &tuning),
            observer: Box::new(observer),
            last_tick: None,
            plan: None,
            stun_claims: HashSet::new(),
            matches: 0,
            rules,
            tuning,
        }
    }

    pub fn rules(&self) -> &Rules {
        &self.rules
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn belief(&self) -> &BeliefState {
        &self.belief
    }

    pub fn memory(&self) -> &AgentMemory {
        &self.memory
    }

    pub fn scorer(&self) -> &TacticalScorer {
        &self.scorer
    }

    pub fn matches(&self) -> u32 {
        self.matches
    }

    /// Forgets everything learned in the current match.
    pub fn reset(&mut self) {
        tracing::info!(matches = self.matches, "Resetting session state");
        self.belief.reset();
        self.memory.clear();
        self.scorer = TacticalScorer::new(&self.rules, &self.tuning);
        self.last_tick = None;
        self.plan = None;
        self.stun_claims.clear();
    }

    /// One unit's action for the observation's tick.
    pub fn decide(&mut self, obs: &Observation) -> Action {
        if let Some(last) = self.last_tick
            && obs.tick < last
        {
            tracing::info!(last, tick = obs.tick, "Tick went backwards, new match");
            self.reset();
        }
        if self.last_tick.is_none() {
            self.matches += 1;
            self.observer.on_match_start(obs.tick, self.matches);
        }
        if self.last_tick != Some(obs.tick) {
            self.begin_tick(obs.tick);
        }

        self.update_belief(obs);

        let plan = match self.plan.take().filter(|plan| plan.tick == obs.tick) {
            Some(plan) => plan,
            None => self.build_plan(obs),
        };

        let action = {
            let mut ctx = DecisionContext {
                obs,
                tasks: &plan.tasks,
                assignment: &plan.assignment,
                memory: &mut self.memory,
                belief: &mut self.belief,
                scorer: &mut self.scorer,
                stun_claims: &mut self.stun_claims,
            };
            self.executor.decide(&mut ctx)
        };
        self.plan = Some(plan);

        if self.scorer.take_exhaustion_report() {
            let budget = self.scorer.budget();
            self.observer
                .on_budget_exhausted(obs.tick, budget.spent(), budget.limit());
        }
        self.observer
            .on_action_selected(obs.tick, obs.me.id, &action);
        action
    }

    /// Actions for every unit of the team, evaluated in ascending unit id.
    pub fn decide_team(&mut self, observations: &[Observation]) -> Vec<(u32, Action)> {
        let mut ordered: Vec<&Observation> = observations.iter().collect();
        ordered.sort_by_key(|obs| obs.me.id);
        ordered
            .into_iter()
            .map(|obs| (obs.me.id, self.decide(obs)))
            .collect()
    }

    fn begin_tick(&mut self, tick: u32) {
        self.belief.begin_tick(tick);
        self.belief.diffuse_ghosts();
        self.memory.prune(tick);
        self.scorer.begin_tick(tick);
        self.stun_claims.clear();
        self.last_tick = Some(tick);
    }

    fn update_belief(&mut self, obs: &Observation) {
        let tick = obs.tick;
        for unit in obs.team() {
            self.memory.touch(unit.id, tick);
            self.belief
                .observe_vision(unit.id, &unit.position, self.rules.vision_radius);
        }
        for ghost in &obs.ghosts {
            self.belief.note_ghost(ghost);
        }
        self.belief.track_enemies(&obs.enemies, tick);
        if obs.radar_used {
            self.memory.record_radar(obs.me.id, tick);
        }

        let paths: Vec<Vec<_>> = self
            .belief
            .remembered_enemies()
            .into_iter()
            .filter(|track| track.is_carrying() && obs.enemy(track.id).is_none())
            .map(|track| {
                self.belief
                    .predict_enemy_path(track, obs.enemy_base, self.tuning.prediction_horizon)
            })
            .collect();
        for path in paths {
            self.belief.mark_corridor(&path, CORRIDOR_CONFIDENCE);
        }
    }

    fn build_plan(&mut self, obs: &Observation) -> TickPlan {
        let tasks = generate_tasks(&TaskContext {
            obs,
            belief: &self.belief,
            memory: &self.memory,
            rules: &self.rules,
            tuning: &self.tuning,
        });
        let units = team_units(obs, &self.memory);
        let ctx = ScoreContext {
            obs,
            belief: &self.belief,
            rules: &self.rules,
            tuning: &self.tuning,
        };
        let assignment = plan_assignment(&units, &tasks, &ctx, &mut self.scorer);
        self.observer.on_plan(obs.tick, &tasks, &assignment);
        TickPlan {
            tick: obs.tick,
            tasks,
            assignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::{ActionKind, Point};
    use crate::state::Entity;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct Events {
        matches: Vec<u32>,
        plans: Vec<u32>,
        actions: Vec<(u32, u32)>,
        exhausted: Vec<u32>,
    }

    struct RecordingObserver(Rc<RefCell<Events>>);

    impl DecisionObserver for RecordingObserver {
        fn on_match_start(&mut self, tick: u32, _match_number: u32) {
            self.0.borrow_mut().matches.push(tick);
        }

        fn on_plan(&mut self, tick: u32, _tasks: &[Task], _assignment: &Assignment) {
            self.0.borrow_mut().plans.push(tick);
        }

        fn on_action_selected(&mut self, tick: u32, unit_id: u32, _action: &Action) {
            self.0.borrow_mut().actions.push((tick, unit_id));
        }

        fn on_budget_exhausted(&mut self, tick: u32, _spent: Duration, _limit: Duration) {
            self.0.borrow_mut().exhausted.push(tick);
        }
    }

    fn session(tuning: Tuning) -> (Session, Rc<RefCell<Events>>) {
        let events = Rc::new(RefCell::new(Events::default()));
        let session = Session::with_observer(
            Rules::default(),
            tuning,
            RecordingObserver(Rc::clone(&events)),
        );
        (session, events)
    }

    fn team_obs(tick: u32) -> Vec<Observation> {
        let a = Entity::new(0, Point::new(2000.0, 2000.0));
        let b = Entity::new(1, Point::new(2500.0, 2500.0));
        let base = Point::new(0.0, 0.0);
        let enemy_base = Point::new(16000.0, 9000.0);

        let mut first = Observation::new(tick, a.clone(), base, enemy_base);
        first.friends.push(b.clone());
        first.team_size = 2;
        let mut second = Observation::new(tick, b, base, enemy_base);
        second.friends.push(a);
        second.team_size = 2;
        // Deliberately out of id order.
        vec![second, first]
    }

    #[test]
    fn test_plan_shared_within_tick_and_team_order() {
        let (mut session, events) = session(Tuning::default());
        let actions = session.decide_team(&team_obs(5));
        assert_eq!(actions.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![0, 1]);

        let events = events.borrow();
        assert_eq!(events.matches, vec![5]);
        assert_eq!(events.plans, vec![5]);
        assert_eq!(events.actions, vec![(5, 0), (5, 1)]);
    }

    #[test]
    fn test_new_plan_each_tick() {
        let (mut session, events) = session(Tuning::default());
        session.decide_team(&team_obs(5));
        session.decide_team(&team_obs(6));
        assert_eq!(events.borrow().plans, vec![5, 6]);
        assert_eq!(session.belief().tick(), 6);
    }

    #[test]
    fn test_tick_going_backwards_starts_new_match() {
        let (mut session, events) = session(Tuning::default());
        session.decide_team(&team_obs(40));
        assert!(session.belief().last_visited_at(&Point::new(2000.0, 2000.0)).is_some());

        session.decide_team(&team_obs(3));
        assert_eq!(events.borrow().matches, vec![40, 3]);
        assert_eq!(session.matches(), 2);
        assert_eq!(session.belief().last_visited_at(&Point::new(2000.0, 2000.0)), Some(3));
    }

    #[test]
    fn test_budget_exhaustion_reported_once_per_tick() {
        let tuning = Tuning {
            rollout_budget: Duration::ZERO,
            ..Tuning::default()
        };
        let (mut session, events) = session(tuning);
        let with_carrier = |tick: u32| {
            let mut team = team_obs(tick);
            for obs in &mut team {
                obs.enemies
                    .push(Entity::new(7, Point::new(6000.0, 4000.0)).carrying(30));
            }
            team
        };
        session.decide_team(&with_carrier(5));
        session.decide_team(&with_carrier(6));
        assert_eq!(events.borrow().exhausted, vec![5, 6]);
    }

    #[test]
    fn test_no_exhaustion_report_when_nothing_skipped() {
        let tuning = Tuning {
            rollout_budget: Duration::ZERO,
            ..Tuning::default()
        };
        let (mut session, events) = session(tuning);
        session.decide_team(&team_obs(5));
        assert_eq!(session.scorer().stats().skipped, 0);
        assert!(events.borrow().exhausted.is_empty());
    }

    #[test]
    fn test_carrier_home_in_session() {
        let (mut session, _) = session(Tuning::default());
        let me = Entity::new(0, Point::new(800.0, 800.0)).carrying(9);
        let obs = Observation::new(1, me, Point::new(0.0, 0.0), Point::new(16000.0, 9000.0));
        assert_eq!(session.decide(&obs).kind, ActionKind::Release);
    }
}
