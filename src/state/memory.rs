use std::collections::BTreeMap;

/// Facts about one of our units that the engine does not repeat every tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemoryRecord {
    pub stun_ready_at: u32,
    pub radar_used: bool,
    pub patrol_index: usize,
    pub last_seen: u32,
}

impl MemoryRecord {
    pub fn stun_ready(&self, tick: u32) -> bool {
        tick >= self.stun_ready_at
    }
}

/// Per-unit memory for one match, keyed by unit id.
#[derive(Debug, Clone, Default)]
pub struct AgentMemory {
    records: BTreeMap<u32, MemoryRecord>,
}

impl AgentMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the record on first use and stamps it as seen on `tick`.
    pub fn touch(&mut self, unit_id: u32, tick: u32) -> &mut MemoryRecord {
        let record = self.records.entry(unit_id).or_insert_with(|| MemoryRecord {
            last_seen: tick,
            ..MemoryRecord::default()
        });
        record.last_seen = record.last_seen.max(tick);
        record
    }

    pub fn get(&self, unit_id: u32) -> Option<&MemoryRecord> {
        self.records.get(&unit_id)
    }

    pub fn stun_ready(&self, unit_id: u32, tick: u32) -> bool {
        self.get(unit_id).is_none_or(|r| r.stun_ready(tick))
    }

    pub fn radar_used(&self, unit_id: u32) -> bool {
        self.get(unit_id).is_some_and(|r| r.radar_used)
    }

    pub fn record_stun(&mut self, unit_id: u32, tick: u32, cooldown: u32) {
        self.touch(unit_id, tick).stun_ready_at = tick + cooldown;
    }

    pub fn record_radar(&mut self, unit_id: u32, tick: u32) {
        self.touch(unit_id, tick).radar_used = true;
    }

    pub fn patrol_index(&self, unit_id: u32) -> usize {
        self.get(unit_id).map_or(0, |r| r.patrol_index)
    }

    pub fn advance_patrol(&mut self, unit_id: u32, tick: u32, waypoint_count: usize) {
        let record = self.touch(unit_id, tick);
        record.patrol_index = (record.patrol_index + 1) % waypoint_count.max(1);
    }

    /// Drops units that were absent for the whole previous tick.
    pub fn prune(&mut self, tick: u32) -> usize {
        let before = self.records.len();
        self.records
            .retain(|_, record| record.last_seen.saturating_add(1) >= tick);
        let pruned = before - self.records.len();
        if pruned > 0 {
            tracing::debug!(tick, pruned, "Pruned memory records of absent units");
        }
        pruned
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
