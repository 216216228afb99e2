use crate::infra::Point;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityState {
    Idle,
    Carrying,
    Stunned,
    Busting,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: u32,
    pub position: Point,
    /// Distance to the observing unit, when the engine precomputes it.
    pub range: Option<f64>,
    pub state: EntityState,
    /// Id of the ghost being carried.
    pub payload: Option<u32>,
    pub stun_remaining: Option<u32>,
    pub stun_cooldown: Option<u32>,
}

impl Entity {
    pub fn new(id: u32, position: Point) -> Self {
        Self {
            id,
            position,
            range: None,
            state: EntityState::Idle,
            payload: None,
            stun_remaining: None,
            stun_cooldown: None,
        }
    }

    pub fn carrying(mut self, ghost_id: u32) -> Self {
        self.state = EntityState::Carrying;
        self.payload = Some(ghost_id);
        self
    }

    pub fn stunned(mut self, ticks: u32) -> Self {
        self.state = EntityState::Stunned;
        self.stun_remaining = Some(ticks);
        self
    }

    pub fn with_cooldown(mut self, ticks: u32) -> Self {
        self.stun_cooldown = Some(ticks);
        self
    }

    pub fn is_carrying(&self) -> bool {
        self.state == EntityState::Carrying
    }

    pub fn is_stunned(&self) -> bool {
        self.state == EntityState::Stunned || self.stun_remaining.is_some_and(|t| t > 0)
    }

    /// Whether this entity can fire a stun right now, as far as we can tell.
    /// An unknown cooldown counts as ready.
    pub fn can_stun(&self) -> bool {
        !self.is_stunned() && self.stun_cooldown.is_none_or(|c| c == 0)
    }

    pub fn distance(&self, other: &Entity) -> f64 {
        self.position.distance(&other.position)
    }
}

/// Everything one unit sees on one tick, already normalised.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub tick: u32,
    pub me: Entity,
    pub radar_used: bool,
    pub friends: Vec<Entity>,
    pub enemies: Vec<Entity>,
    pub ghosts: Vec<Entity>,
    pub own_base: Point,
    pub enemy_base: Point,
    pub team_size: usize,
}

impl Observation {
    pub fn new(tick: u32, me: Entity, own_base: Point, enemy_base: Point) -> Self {
        Self {
            tick,
            me,
            radar_used: false,
            friends: Vec::new(),
            enemies: Vec::new(),
            ghosts: Vec::new(),
            own_base,
            enemy_base,
            team_size: 1,
        }
    }

    /// Team units in ascending id order, self included.
    pub fn team(&self) -> Vec<&Entity> {
        let mut team: Vec<&Entity> = std::iter::once(&self.me)
            .chain(self.friends.iter().filter(|f| f.id != self.me.id))
            .collect();
        team.sort_by_key(|e| e.id);
        team
    }

    /// Position of `self` within the ascending-id team roster.
    pub fn local_index(&self) -> usize {
        self.team()
            .iter()
            .position(|e| e.id == self.me.id)
            .unwrap_or(0)
    }

    pub fn ghost(&self, id: u32) -> Option<&Entity> {
        self.ghosts.iter().find(|g| g.id == id)
    }

    pub fn enemy(&self, id: u32) -> Option<&Entity> {
        self.enemies.iter().find(|e| e.id == id)
    }

    pub fn friend(&self, id: u32) -> Option<&Entity> {
        if self.me.id == id {
            return Some(&self.me);
        }
        self.friends.iter().find(|e| e.id == id)
    }

    pub fn nearest_ghost(&self) -> Option<&Entity> {
        self.ghosts.iter().min_by(|a, b| {
            let da = self.me.position.distance(&a.position);
            let db = self.me.position.distance(&b.position);
            da.total_cmp(&db).then(a.id.cmp(&b.id))
        })
    }
}

/// Entity record as the engine reports it: protocol codes, no optional fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawEntity {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    /// Team id of a buster, or `-1` for a ghost.
    pub entity_type: i32,
    /// 0 idle, 1 carrying, 2 stunned, 3 busting. Ghosts report 0.
    pub state: i32,
    /// Carried ghost id, stun ticks left, or busters on a ghost.
    pub value: i32,
}

/// Per-unit extra facts the engine sends alongside the entity list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RawSelfStatus {
    pub stun_cooldown: Option<u32>,
    pub radar_used: Option<bool>,
}

pub const GHOST_TYPE: i32 = -1;

impl Observation {
    /// The one place where loosely typed engine records become entities.
    #[allow(clippy::too_many_arguments)]
    pub fn ingest(
        tick: u32,
        my_id: u32,
        my_team: i32,
        status: RawSelfStatus,
        raw: &[RawEntity],
        own_base: Point,
        enemy_base: Point,
        team_size: usize,
    ) -> Option<Self> {
        let mut me = None;
        let mut friends = Vec::new();
        let mut enemies = Vec::new();
        let mut ghosts = Vec::new();

        for record in raw {
            let entity = normalize(record);
            if record.entity_type == GHOST_TYPE {
                ghosts.push(entity);
            } else if record.entity_type == my_team {
                if record.id == my_id {
                    me = Some(entity);
                } else {
                    friends.push(entity);
                }
            } else {
                enemies.push(entity);
            }
        }

        let mut me = me?;
        if status.stun_cooldown.is_some() {
            me.stun_cooldown = status.stun_cooldown;
        }
        for entity in friends.iter_mut().chain(enemies.iter_mut()).chain(ghosts.iter_mut()) {
            entity.range = Some(me.position.distance(&entity.position));
        }

        Some(Self {
            tick,
            me,
            radar_used: status.radar_used.unwrap_or(false),
            friends,
            enemies,
            ghosts,
            own_base,
            enemy_base,
            team_size,
        })
    }
}

fn normalize(record: &RawEntity) -> Entity {
    let mut entity = Entity::new(record.id, Point::new(record.x as f64, record.y as f64));
    if record.entity_type == GHOST_TYPE {
        return entity;
    }
    let value = u32::try_from(record.value).ok();
    match record.state {
        1 => {
            entity.state = EntityState::Carrying;
            entity.payload = value;
        }
        2 => {
            entity.state = EntityState::Stunned;
            entity.stun_remaining = Some(value.unwrap_or(0));
        }
        3 => entity.state = EntityState::Busting,
        _ => {}
    }
    entity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(id: u32, x: i32, y: i32, entity_type: i32, state: i32, value: i32) -> RawEntity {
        RawEntity {
            id,
            x,
            y,
            entity_type,
            state,
            value,
        }
    }

    #[test]
    fn test_ingest_splits_and_normalizes() {
        let records = [
            raw(1, 1000, 1000, 0, 0, -1),
            raw(0, 500, 500, 0, 1, 7),
            raw(4, 3000, 1000, 1, 2, 6),
            raw(7, 2000, 2000, GHOST_TYPE, 0, 0),
        ];
        let status = RawSelfStatus {
            stun_cooldown: Some(4),
            radar_used: Some(true),
        };
        let obs = Observation::ingest(
            12,
            1,
            0,
            status,
            &records,
            Point::new(0.0, 0.0),
            Point::new(16000.0, 9000.0),
            2,
        )
        .unwrap();

        assert_eq!(obs.me.id, 1);
        assert_eq!(obs.me.stun_cooldown, Some(4));
        assert!(obs.radar_used);
        assert_eq!(obs.friends.len(), 1);
        assert_eq!(obs.friends[0].payload, Some(7));
        assert!(obs.friends[0].is_carrying());
        assert_eq!(obs.enemies[0].stun_remaining, Some(6));
        assert!(obs.enemies[0].is_stunned());
        assert_eq!(obs.ghosts[0].id, 7);
        assert!((obs.ghosts[0].range.unwrap() - 1000.0_f64.hypot(1000.0)).abs() < 1e-9);
        assert_eq!(obs.local_index(), 1);
    }

    #[test]
    fn test_ingest_without_self_is_none() {
        let records = [raw(3, 0, 0, 1, 0, -1)];
        let obs = Observation::ingest(
            0,
            9,
            0,
            RawSelfStatus::default(),
            &records,
            Point::new(0.0, 0.0),
            Point::new(16000.0, 9000.0),
            1,
        );
        assert!(obs.is_none());
    }
}
