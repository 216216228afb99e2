use std::collections::HashSet;

use crate::infra::{Bounds, Point, Rules, Tuning};
use crate::state::{EnemyTrack, EnemyTracker, Entity};

const NEVER_VISITED: i64 = -1;

/// Grid-shaped estimate of what is currently out of sight.
///
/// Each cell keeps the tick it was last seen, a heat value (belief mass of
/// ghost presence) and a corridor value (predicted paths of unseen enemy
/// carriers). Heat is a conserved quantity: diffusion and subtraction
/// renormalise it, only decay and fresh sightings change the total.
#[derive(Debug, Clone)]
pub struct BeliefState {
    cols: usize,
    rows: usize,
    cell_size: f64,
    bounds: Bounds,
    move_speed: f64,
    params: Tuning,

    last_visited: Vec<i64>,
    heat: Vec<f64>,
    corridor: Vec<f64>,

    tick: Option<u32>,
    bumped: HashSet<u32>,
    observed_units: HashSet<u32>,
    enemies: EnemyTracker,
}

impl BeliefState {
    pub fn new(rules: &Rules, tuning: &Tuning) -> Self {
        let cell_size = tuning.cell_size.max(1.0);
        let cols = (rules.map_width / cell_size).ceil().max(1.0) as usize;
        let rows = (rules.map_height / cell_size).ceil().max(1.0) as usize;
        let count = cols * rows;
        Self {
            cols,
            rows,
            cell_size,
            bounds: rules.bounds(),
            move_speed: rules.move_speed,
            params: tuning.clone(),
            last_visited: vec![NEVER_VISITED; count],
            heat: vec![1.0 / count as f64; count],
            corridor: vec![0.0; count],
            tick: None,
            bumped: HashSet::new(),
            observed_units: HashSet::new(),
            enemies: EnemyTracker::new(),
        }
    }

    /// Back to the start-of-match prior.
    pub fn reset(&mut self) {
        let count = self.cell_count();
        self.last_visited.fill(NEVER_VISITED);
        self.heat.fill(1.0 / count as f64);
        self.corridor.fill(0.0);
        self.tick = None;
        self.bumped.clear();
        self.observed_units.clear();
        self.enemies.clear();
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cell_count(&self) -> usize {
        self.cols * self.rows
    }

    pub fn tick(&self) -> u32 {
        self.tick.unwrap_or(0)
    }

    fn index(&self, col: usize, row: usize) -> usize {
        row * self.cols + col
    }

    fn cell_of(&self, point: &Point) -> usize {
        let col = ((point.x / self.cell_size).floor().max(0.0) as usize).min(self.cols - 1);
        let row = ((point.y / self.cell_size).floor().max(0.0) as usize).min(self.rows - 1);
        self.index(col, row)
    }

    /// Centre of a cell, pulled inside the map for the last column/row.
    pub fn cell_center(&self, idx: usize) -> Point {
        let col = idx % self.cols;
        let row = idx / self.cols;
        self.bounds.clamp(Point::new(
            (col as f64 + 0.5) * self.cell_size,
            (row as f64 + 0.5) * self.cell_size,
        ))
    }

    fn cells_within(&self, point: &Point, radius: f64) -> Vec<usize> {
        (0..self.cell_count())
            .filter(|&idx| self.cell_center(idx).distance(point) <= radius)
            .collect()
    }

    fn neighbors(&self, idx: usize) -> impl Iterator<Item = usize> + '_ {
        let col = (idx % self.cols) as i64;
        let row = (idx / self.cols) as i64;
        [(0, -1), (1, 0), (0, 1), (-1, 0)]
            .into_iter()
            .filter_map(move |(dc, dr)| {
                let c = col + dc;
                let r = row + dr;
                if c < 0 || r < 0 || c >= self.cols as i64 || r >= self.rows as i64 {
                    None
                } else {
                    Some(self.index(c as usize, r as usize))
                }
            })
    }

    /// Starts a tick: decays heat and corridor once, no matter how many
    /// units report on the same tick.
    pub fn begin_tick(&mut self, tick: u32) {
        if self.tick == Some(tick) {
            return;
        }
        self.tick = Some(tick);
        self.bumped.clear();
        self.observed_units.clear();
        self.decay_ghosts();
        let decay = self.params.corridor_decay;
        let eps = self.params.heat_epsilon;
        for value in self.corridor.iter_mut() {
            *value *= decay;
            if *value < eps {
                *value = 0.0;
            }
        }
    }

    pub fn mark_visited(&mut self, point: &Point) {
        let idx = self.cell_of(point);
        self.last_visited[idx] = self.tick() as i64;
    }

    /// Marks every cell centre inside the circle as visited this tick.
    pub fn mark_visited_within(&mut self, point: &Point, radius: f64) {
        let tick = self.tick() as i64;
        for idx in self.cells_within(point, radius) {
            self.last_visited[idx] = tick;
        }
    }

    /// Area directly confirmed empty (radar or close vision): visited, and
    /// heat sharply suppressed without being moved elsewhere.
    pub fn clear_circle(&mut self, point: &Point, radius: f64) {
        let tick = self.tick() as i64;
        let suppression = self.params.clear_suppression;
        for idx in self.cells_within(point, radius) {
            self.last_visited[idx] = tick;
            self.heat[idx] *= suppression;
        }
    }

    /// Adds belief mass around a real ghost sighting with linear falloff.
    pub fn bump_ghost(&mut self, x: f64, y: f64) {
        let sighting = Point::new(x, y);
        let falloff = self.params.ghost_falloff;
        let mass = self.params.bump_mass;
        for idx in 0..self.cell_count() {
            let d = self.cell_center(idx).distance(&sighting);
            let weight = (1.0 - d / falloff).max(0.0);
            self.heat[idx] += mass * weight;
        }
    }

    /// `bump_ghost` at most once per ghost id per tick.
    pub fn note_ghost(&mut self, ghost: &Entity) -> bool {
        if !self.bumped.insert(ghost.id) {
            return false;
        }
        self.bump_ghost(ghost.position.x, ghost.position.y);
        true
    }

    /// Removes the mass inside a circle we just saw to be empty and moves it
    /// proportionally onto the rest of the grid, preserving the total.
    pub fn subtract_seen(&mut self, point: &Point, radius: f64) {
        let total_before = self.total_heat();
        let seen = self.cells_within(point, radius);
        for &idx in &seen {
            self.heat[idx] = 0.0;
        }
        let remaining = self.total_heat();
        if total_before <= 0.0 {
            return;
        }
        if remaining > self.params.heat_epsilon {
            let scale = total_before / remaining;
            for value in self.heat.iter_mut() {
                *value *= scale;
            }
        } else {
            let unseen: Vec<usize> = (0..self.cell_count())
                .filter(|idx| !seen.contains(idx))
                .collect();
            if unseen.is_empty() {
                return;
            }
            let share = total_before / unseen.len() as f64;
            for idx in unseen {
                self.heat[idx] = share;
            }
        }
    }

    /// Vision of one unit for the current tick: visited cells plus
    /// redistributed mass. Each unit is processed once per tick.
    pub fn observe_vision(&mut self, unit_id: u32, point: &Point, radius: f64) -> bool {
        if !self.observed_units.insert(unit_id) {
            return false;
        }
        self.mark_visited(point);
        self.mark_visited_within(point, radius);
        self.subtract_seen(point, radius);
        true
    }

    /// One step of 4-neighbour diffusion, renormalised to the previous total.
    pub fn diffuse_ghosts(&mut self) {
        let total_before = self.total_heat();
        if total_before <= 0.0 {
            return;
        }
        let rate = self.params.diffusion_rate.clamp(0.0, 1.0);
        let mut next = vec![0.0; self.cell_count()];
        for idx in 0..self.cell_count() {
            let value = self.heat[idx];
            if value == 0.0 {
                continue;
            }
            let neighbors: Vec<usize> = self.neighbors(idx).collect();
            if neighbors.is_empty() {
                next[idx] += value;
                continue;
            }
            next[idx] += value * (1.0 - rate);
            let share = value * rate / neighbors.len() as f64;
            for nb in neighbors {
                next[nb] += share;
            }
        }
        let total_after: f64 = next.iter().sum();
        if total_after > 0.0 {
            let scale = total_before / total_after;
            for value in next.iter_mut() {
                *value *= scale;
            }
        }
        self.heat = next;
    }

    /// Uniform multiplicative decay; tiny values snap to zero.
    pub fn decay_ghosts(&mut self) {
        let decay = self.params.heat_decay;
        let eps = self.params.heat_epsilon;
        for value in self.heat.iter_mut() {
            *value *= decay;
            if *value < eps {
                *value = 0.0;
            }
        }
    }

    pub fn total_heat(&self) -> f64 {
        self.heat.iter().sum()
    }

    pub fn heat_at(&self, point: &Point) -> f64 {
        self.heat[self.cell_of(point)]
    }

    pub fn corridor_at(&self, point: &Point) -> f64 {
        self.corridor[self.cell_of(point)]
    }

    pub fn last_visited_at(&self, point: &Point) -> Option<u32> {
        let value = self.last_visited[self.cell_of(point)];
        u32::try_from(value).ok()
    }

    /// Writes a predicted path into the corridor layer, keeping the larger value.
    pub fn mark_corridor(&mut self, path: &[Point], probability: f64) {
        for point in path {
            let idx = self.cell_of(point);
            self.corridor[idx] = self.corridor[idx].max(probability);
        }
    }

    /// Best cell to look at from `point` and its score.
    ///
    /// Score is `age + heat * K - distance * C`. Cells are scanned row-major
    /// and only a strictly better score replaces the current best, so ties go
    /// to the first cell in scan order.
    #[tracing::instrument(level = "trace", skip(self))]
    pub fn frontier(&self, point: &Point) -> Option<(Point, f64)> {
        if self.tick() < self.params.frontier_warmup_ticks {
            return None;
        }
        let tick = self.tick() as f64;
        let mut best: Option<(Point, f64)> = None;
        for row in 0..self.rows {
            for col in 0..self.cols {
                let idx = self.index(col, row);
                let center = self.cell_center(idx);
                let age = match self.last_visited[idx] {
                    NEVER_VISITED => self.params.never_visited_age,
                    visited => tick - visited as f64,
                };
                let score = age + self.heat[idx] * self.params.frontier_heat_weight
                    - point.distance(&center) * self.params.frontier_distance_cost;
                if best.is_none_or(|(_, best_score)| score > best_score) {
                    best = Some((center, score));
                }
            }
        }
        best
    }

    pub fn pick_frontier_target(&self, point: &Point) -> Option<Point> {
        self.frontier(point).map(|(center, _)| center)
    }

    pub fn track_enemies(&mut self, enemies: &[Entity], tick: u32) {
        self.enemies.track_enemies(enemies, tick);
    }

    pub fn enemies(&self) -> &EnemyTracker {
        &self.enemies
    }

    /// Enemies out of sight this tick but still within memory.
    pub fn remembered_enemies(&self) -> Vec<&EnemyTrack> {
        self.enemies
            .remembered(self.tick(), self.params.enemy_memory_ticks)
            .collect()
    }

    pub fn predict_enemy_path(&self, enemy: &EnemyTrack, base: Point, horizon: usize) -> Vec<Point> {
        self.enemies
            .predict_enemy_path(enemy, base, horizon, self.move_speed, &self.bounds)
    }
}
