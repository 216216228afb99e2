use std::collections::BTreeMap;

use crate::infra::{Bounds, Point};
use crate::state::{Entity, EntityState};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sighting {
    pub position: Point,
    pub tick: u32,
}

/// What we last knew about one enemy unit.
#[derive(Debug, Clone, PartialEq)]
pub struct EnemyTrack {
    pub id: u32,
    pub last: Sighting,
    pub previous: Option<Sighting>,
    pub state: EntityState,
    pub payload: Option<u32>,
    pub stun_remaining: Option<u32>,
}

impl EnemyTrack {
    /// Displacement per tick between the last two sightings.
    pub fn velocity(&self) -> Point {
        match self.previous {
            Some(prev) if self.last.tick > prev.tick => {
                let dt = (self.last.tick - prev.tick) as f64;
                let d = self.last.position.sub(&prev.position);
                Point::new(d.x / dt, d.y / dt)
            }
            _ => Point::default(),
        }
    }

    pub fn is_carrying(&self) -> bool {
        self.state == EntityState::Carrying
    }

    /// Snapshot usable wherever a visible entity is expected.
    pub fn as_entity(&self) -> Entity {
        Entity {
            id: self.id,
            position: self.last.position,
            range: None,
            state: self.state,
            payload: self.payload,
            stun_remaining: self.stun_remaining,
            stun_cooldown: None,
        }
    }
}

/// Last two sightings per enemy id.
#[derive(Debug, Clone, Default)]
pub struct EnemyTracker {
    tracks: BTreeMap<u32, EnemyTrack>,
}

impl EnemyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records this tick's sightings. Seeing the same enemy twice on one tick
    /// overwrites the latest sighting instead of shifting history.
    #[tracing::instrument(level = "trace", skip(self, enemies), fields(seen = enemies.len()))]
    pub fn track_enemies(&mut self, enemies: &[Entity], tick: u32) {
        for enemy in enemies {
            let sighting = Sighting {
                position: enemy.position,
                tick,
            };
            match self.tracks.get_mut(&enemy.id) {
                Some(track) => {
                    if track.last.tick != tick {
                        track.previous = Some(track.last);
                    }
                    track.last = sighting;
                    track.state = enemy.state;
                    track.payload = enemy.payload;
                    track.stun_remaining = enemy.stun_remaining;
                }
                None => {
                    self.tracks.insert(
                        enemy.id,
                        EnemyTrack {
                            id: enemy.id,
                            last: sighting,
                            previous: None,
                            state: enemy.state,
                            payload: enemy.payload,
                            stun_remaining: enemy.stun_remaining,
                        },
                    );
                }
            }
        }
    }

    pub fn get(&self, id: u32) -> Option<&EnemyTrack> {
        self.tracks.get(&id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &EnemyTrack> {
        self.tracks.values()
    }

    /// Enemies not seen this tick but seen within `memory_ticks`.
    pub fn remembered(&self, tick: u32, memory_ticks: u32) -> impl Iterator<Item = &EnemyTrack> {
        self.tracks.values().filter(move |track| {
            track.last.tick < tick && tick - track.last.tick <= memory_ticks
        })
    }

    /// Constant-velocity extrapolation of `horizon` future points.
    ///
    /// A carrier drifting away from `base` (or standing still) is assumed to be
    /// heading home, so its velocity is replaced by one of length `speed`
    /// pointing at `base`.
    pub fn predict_enemy_path(
        &self,
        track: &EnemyTrack,
        base: Point,
        horizon: usize,
        speed: f64,
        bounds: &Bounds,
    ) -> Vec<Point> {
        let origin = track.last.position;
        let to_base = base.sub(&origin);
        let mut velocity = track.velocity();
        if to_base.length() > 0.0 && (velocity.length() == 0.0 || velocity.dot(&to_base) < 0.0) {
            let scale = speed / to_base.length();
            velocity = Point::new(to_base.x * scale, to_base.y * scale);
        }

        (1..=horizon)
            .map(|k| {
                let k = k as f64;
                bounds.clamp(Point::new(origin.x + velocity.x * k, origin.y + velocity.y * k))
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.tracks.clear();
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Bounds {
        Bounds::new(16001.0, 9001.0)
    }

    #[test]
    fn test_velocity_from_two_sightings() {
        let mut tracker = EnemyTracker::new();
        tracker.track_enemies(&[Entity::new(5, Point::new(1000.0, 1000.0))], 1);
        tracker.track_enemies(&[Entity::new(5, Point::new(1800.0, 1000.0))], 2);
        // A second report on the same tick only refreshes the latest sighting.
        tracker.track_enemies(&[Entity::new(5, Point::new(1800.0, 1000.0))], 2);

        let track = tracker.get(5).unwrap();
        assert_eq!(track.velocity(), Point::new(800.0, 0.0));
    }

    #[test]
    fn test_prediction_keeps_homeward_velocity() {
        let mut tracker = EnemyTracker::new();
        let base = Point::new(16000.0, 1000.0);
        tracker.track_enemies(&[Entity::new(5, Point::new(1000.0, 1000.0)).carrying(9)], 1);
        tracker.track_enemies(&[Entity::new(5, Point::new(1400.0, 1000.0)).carrying(9)], 2);

        let track = tracker.get(5).unwrap();
        let path = tracker.predict_enemy_path(track, base, 3, 800.0, &bounds());
        assert_eq!(
            path,
            vec![
                Point::new(1800.0, 1000.0),
                Point::new(2200.0, 1000.0),
                Point::new(2600.0, 1000.0)
            ]
        );
    }

    #[test]
    fn test_prediction_reorients_toward_base() {
        let mut tracker = EnemyTracker::new();
        let base = Point::new(16000.0, 9000.0);
        tracker.track_enemies(&[Entity::new(2, Point::new(5000.0, 5000.0))], 1);
        tracker.track_enemies(&[Entity::new(2, Point::new(4200.0, 5000.0))], 2);

        let track = tracker.get(2).unwrap();
        let path = tracker.predict_enemy_path(track, base, 2, 800.0, &bounds());
        let first_step = path[0].distance(&track.last.position);
        assert!((first_step - 800.0).abs() < 1e-6);
        assert!(path[1].distance(&base) < path[0].distance(&base));
    }

    #[test]
    fn test_prediction_clamped_to_map() {
        let mut tracker = EnemyTracker::new();
        tracker.track_enemies(&[Entity::new(1, Point::new(15900.0, 8900.0))], 1);
        let track = tracker.get(1).unwrap();
        let path =
            tracker.predict_enemy_path(track, Point::new(16000.0, 9000.0), 3, 800.0, &bounds());
        assert!(path.iter().all(|p| bounds().contains(p)));
        assert_eq!(path[2], Point::new(16000.0, 9000.0));
    }

    #[test]
    fn test_remembered_excludes_current_and_stale() {
        let mut tracker = EnemyTracker::new();
        tracker.track_enemies(&[Entity::new(1, Point::new(0.0, 0.0))], 2);
        tracker.track_enemies(&[Entity::new(2, Point::new(0.0, 0.0))], 9);
        tracker.track_enemies(&[Entity::new(3, Point::new(0.0, 0.0))], 10);

        let ids: Vec<u32> = tracker.remembered(10, 5).map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }
}
