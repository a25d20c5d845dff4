//! Engine-private annotations keyed by entity id
//!
//! None of this is part of the wire state. The maps are kept in step with
//! the entity collections: entries are created when an entity first shows
//! up and released when it is purged.

use std::collections::HashMap;
use std::time::Duration;

use super::rules::{DAMAGE_FLASH_MS, DAMAGE_FLASH_RETRIGGER_MS};
use super::state::{BattleState, Side};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitRuntime {
    pub target: Option<String>,
    /// Simulation time of the last attack (seconds)
    pub last_attack: f64,
}

/// Tower death/revival state machine.
///
/// A tower seen dead stays visually dead until the server reports it alive
/// for a full confirmation window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TowerLife {
    #[default]
    Alive,
    Dead,
    Reviving {
        frames: u32,
    },
}

impl TowerLife {
    pub fn is_locked(self) -> bool {
        !matches!(self, TowerLife::Alive)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TowerRuntime {
    pub last_attack: f64,
    pub life: TowerLife,
}

/// Combat payload of a locally spawned projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectileMeta {
    pub owner: Side,
    pub damage: i32,
    pub aoe_radius: f32,
}

#[derive(Debug, Default)]
pub struct RuntimeState {
    pub units: HashMap<String, UnitRuntime>,
    pub towers: HashMap<String, TowerRuntime>,
    /// Consecutive snapshots a unit has been absent from
    pub missing_frames: HashMap<String, u32>,
    pub projectiles: HashMap<String, ProjectileMeta>,
    /// Clock reading of the last recorded hit per entity
    pub last_damage: HashMap<String, Duration>,
    next_projectile_seq: u64,
}

impl RuntimeState {
    pub fn new() -> Self {
        Self {
            next_projectile_seq: 1,
            ..Self::default()
        }
    }

    /// Bring the maps in line with a freshly adopted state
    pub fn sync_with(&mut self, state: &BattleState) {
        self.units
            .retain(|id, _| state.units.iter().any(|u| &u.id == id));
        for unit in &state.units {
            self.units.entry(unit.id.clone()).or_default();
        }

        self.towers.retain(|id, _| state.tower(id).is_some());
        for (_, tower) in state.towers() {
            let runtime = self.towers.entry(tower.id.clone()).or_default();
            if !tower.is_alive() {
                runtime.life = TowerLife::Dead;
            }
        }

        self.missing_frames
            .retain(|id, _| state.units.iter().any(|u| &u.id == id));
    }

    pub fn unit_mut(&mut self, id: &str) -> &mut UnitRuntime {
        self.units.entry(id.to_string()).or_default()
    }

    pub fn tower_mut(&mut self, id: &str) -> &mut TowerRuntime {
        self.towers.entry(id.to_string()).or_default()
    }

    pub fn tower_life(&self, id: &str) -> TowerLife {
        self.towers.get(id).map(|t| t.life).unwrap_or_default()
    }

    /// Drop everything held for a unit that left the battle
    pub fn release_unit(&mut self, id: &str) {
        self.units.remove(id);
        self.missing_frames.remove(id);
        self.last_damage.remove(id);
    }

    pub fn next_projectile_id(&mut self) -> String {
        let id = format!("local_proj_{}", self.next_projectile_seq);
        self.next_projectile_seq += 1;
        id
    }

    /// Record a hit for flash purposes. Returns false when the hit landed
    /// inside the retrigger window of the previous one.
    pub fn record_damage(&mut self, id: &str, now: Duration) -> bool {
        if let Some(last) = self.last_damage.get(id) {
            if now.saturating_sub(*last) < Duration::from_millis(DAMAGE_FLASH_RETRIGGER_MS) {
                return false;
            }
        }
        self.last_damage.insert(id.to_string(), now);
        true
    }

    /// Flash intensity in [0, 1], fading linearly after a hit
    pub fn damage_flash(&self, id: &str, now: Duration) -> f32 {
        let Some(last) = self.last_damage.get(id) else {
            return 0.0;
        };
        let fade = Duration::from_millis(DAMAGE_FLASH_MS);
        let age = now.saturating_sub(*last);
        if age >= fade {
            return 0.0;
        }
        1.0 - age.as_secs_f32() / fade.as_secs_f32()
    }

    /// Forget flashes that have fully faded
    pub fn expire_damage(&mut self, now: Duration) {
        let fade = Duration::from_millis(DAMAGE_FLASH_MS);
        self.last_damage
            .retain(|_, last| now.saturating_sub(*last) < fade);
    }

    pub fn clear(&mut self) {
        *self = Self::new();
    }
}
