//! Merging authoritative snapshots into the predicted state
//!
//! Every field has its own correction policy. Positions blend unless the
//! error is tiny or huge, resources never run ahead of the server, and a
//! dead tower only comes back after the server has insisted for a number
//! of consecutive snapshots.

use std::collections::HashMap;
use std::time::Duration;

use tracing::debug;

use super::combat::CombatSystem;
use super::rules::MAX_RESOURCE;
use super::runtime::{RuntimeState, TowerLife};
use super::state::{BattleState, PlayerSide, Side, Tower, Unit};
use crate::ws::protocol::Snapshot;

/// Correction thresholds and rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Axis error below this snaps to the server value
    pub snap_epsilon: f32,
    /// Axis error above this is treated as a teleport and snaps
    pub teleport_threshold: f32,
    /// Fraction of the remaining position error removed per snapshot
    pub position_blend: f32,
    /// Fraction of an upward resource error removed per snapshot
    pub resource_blend: f32,
    /// Snapshots a unit may be absent from before it is purged
    pub missing_unit_threshold: u32,
    /// Consecutive alive reports needed to revive a dead tower
    pub revive_confirm_frames: u32,
    /// Frame gaps longer than this pause the simulation for one frame
    pub max_frame_gap: Duration,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            snap_epsilon: 0.25,
            teleport_threshold: 40.0,
            position_blend: 0.2,
            resource_blend: 0.2,
            missing_unit_threshold: 4,
            revive_confirm_frames: 12,
            max_frame_gap: Duration::from_millis(100),
        }
    }
}

/// Correct one coordinate axis toward the server value
pub fn correct_position(local: f32, server: f32, tuning: &Tuning) -> f32 {
    let diff = (local - server).abs();
    if diff < tuning.snap_epsilon || diff > tuning.teleport_threshold {
        return server;
    }
    local + (server - local) * tuning.position_blend
}

/// Spending shows up immediately; gains are eased in
pub fn correct_resource(local: f32, server: f32, tuning: &Tuning) -> f32 {
    let merged = if server < local {
        server
    } else {
        local + (server - local) * tuning.resource_blend
    };
    merged.clamp(0.0, MAX_RESOURCE)
}

/// Merge `snapshot` into `state`, updating the runtime annotations
pub fn reconcile(
    state: &mut BattleState,
    runtime: &mut RuntimeState,
    snapshot: &Snapshot,
    tuning: &Tuning,
    now: Duration,
) {
    state.tick = state.tick.max(snapshot.tick);

    for (side, server_side) in [(Side::One, &snapshot.player1), (Side::Two, &snapshot.player2)] {
        if let Some(server_side) = server_side {
            reconcile_side(state.side_mut(side), server_side, runtime, tuning, now);
        }
    }

    reconcile_units(state, &snapshot.units, runtime, tuning, now);
}

fn reconcile_side(
    local: &mut PlayerSide,
    server: &PlayerSide,
    runtime: &mut RuntimeState,
    tuning: &Tuning,
    now: Duration,
) {
    local.resource = correct_resource(local.resource, server.resource, tuning);

    for server_tower in &server.towers {
        if let Some(tower) = local.towers.iter_mut().find(|t| t.id == server_tower.id) {
            reconcile_tower(tower, server_tower, runtime, tuning, now);
        }
    }
}

fn reconcile_tower(
    tower: &mut Tower,
    server: &Tower,
    runtime: &mut RuntimeState,
    tuning: &Tuning,
    now: Duration,
) {
    tower.max_hp = server.max_hp;
    tower.x = correct_position(tower.x, server.x, tuning);
    tower.y = correct_position(tower.y, server.y, tuning);

    let life = runtime.tower_life(&tower.id);

    if server.hp <= 0 {
        if life != TowerLife::Dead {
            debug!(tower_id = %tower.id, "Server confirmed tower destroyed");
        }
        tower.hp = 0;
        runtime.tower_mut(&tower.id).life = TowerLife::Dead;
    } else if life.is_locked() {
        let frames = match life {
            TowerLife::Reviving { frames } => frames + 1,
            _ => 1,
        };
        if frames >= tuning.revive_confirm_frames {
            debug!(tower_id = %tower.id, hp = server.hp, "Tower revived");
            tower.hp = server.hp;
            runtime.tower_mut(&tower.id).life = TowerLife::Alive;
        } else {
            tower.hp = 0;
            runtime.tower_mut(&tower.id).life = TowerLife::Reviving { frames };
        }
    } else {
        if server.hp < tower.hp {
            let deficit = tower.hp - server.hp;
            CombatSystem::damage_tower(tower, deficit, runtime, now);
        }
        if tower.hp <= 0 {
            tower.hp = server.hp;
        }
    }

    tower.clamp_hp();
}

fn reconcile_units(
    state: &mut BattleState,
    server_units: &[Unit],
    runtime: &mut RuntimeState,
    tuning: &Tuning,
    now: Duration,
) {
    let mut unseen: HashMap<&str, &Unit> =
        server_units.iter().map(|u| (u.id.as_str(), u)).collect();
    let local_units = std::mem::take(&mut state.units);
    let mut merged = Vec::with_capacity(local_units.len().max(server_units.len()));

    for mut unit in local_units {
        let Some(server) = unseen.remove(unit.id.as_str()) else {
            let missing = runtime.missing_frames.entry(unit.id.clone()).or_insert(0);
            *missing += 1;

            if *missing < tuning.missing_unit_threshold && unit.is_alive() {
                merged.push(unit);
            } else {
                debug!(unit_id = %unit.id, missing = *missing, "Purging unit absent from server");
                runtime.release_unit(&unit.id);
            }
            continue;
        };

        runtime.missing_frames.remove(&unit.id);

        if server.hp < unit.hp {
            let deficit = unit.hp - server.hp;
            CombatSystem::damage_unit(&mut unit, deficit, runtime, now);
        }

        unit.kind = server.kind;
        unit.owner = server.owner;
        unit.max_hp = server.max_hp;
        unit.x = correct_position(unit.x, server.x, tuning);
        unit.y = correct_position(unit.y, server.y, tuning);

        if !unit.is_alive() && server.hp > 0 {
            unit.hp = server.hp;
        }
        unit.clamp_hp();

        merged.push(unit);
    }

    // Keep the server's ordering for newcomers
    for server in server_units {
        if unseen.remove(server.id.as_str()).is_some() {
            let mut unit = server.clone();
            unit.clamp_hp();
            runtime.unit_mut(&unit.id);
            merged.push(unit);
        }
    }

    state.units = merged;
}
