//! Combat system - targeting, cadence, damage application

use std::time::Duration;

use tracing::debug;

use super::physics::PhysicsSystem;
use super::projectile::{ProjectileSystem, Shot};
use super::rules::{TowerStats, UnitStats};
use super::runtime::{RuntimeState, TowerLife};
use super::state::{BattleState, ProjectileKind, Side, Tower, TowerKind, Unit, UnitKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Unit,
    Tower,
}

/// A chosen enemy and where it stood when chosen
#[derive(Debug, Clone, PartialEq)]
pub struct Target {
    pub id: String,
    pub kind: TargetKind,
    pub x: f32,
    pub y: f32,
}

/// Index of a living entity inside the battle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetSlot {
    Unit(usize),
    Tower(Side, usize),
}

/// How a unit type delivers its damage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackStyle {
    /// Damage lands the moment the attack fires
    Strike,
    /// Damage rides on a projectile aimed at the target's current position
    Shot(ProjectileKind),
}

impl AttackStyle {
    pub fn for_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Aoe => AttackStyle::Shot(ProjectileKind::Aoe),
            UnitKind::Ranged | UnitKind::Single | UnitKind::Defense => {
                AttackStyle::Shot(ProjectileKind::Ranged)
            }
            UnitKind::Melee | UnitKind::Unknown => AttackStyle::Strike,
        }
    }
}

/// Combat rules shared by the local stepper and reconciliation
pub struct CombatSystem;

impl CombatSystem {
    /// Check if enough simulation time passed since the last attack
    pub fn can_attack(sim_time: f64, last_attack: f64, cadence: f64) -> bool {
        sim_time - last_attack >= cadence
    }

    /// Apply damage to health, clamped at zero
    pub fn apply_damage(current_hp: i32, damage: i32) -> i32 {
        (current_hp - damage).max(0)
    }

    /// Kings wake up once any lateral tower on their side has fallen
    pub fn king_active(towers: &[Tower]) -> bool {
        towers
            .iter()
            .any(|t| t.kind == TowerKind::Lateral && !t.is_alive())
    }

    /// Nearest living enemy, units first then towers. A tower only wins if
    /// strictly closer; equal distances keep the first one found.
    pub fn nearest_enemy(state: &BattleState, unit: &Unit) -> Option<Target> {
        let enemy = unit.owner.enemy();
        let mut nearest: Option<Target> = None;
        let mut min_dist = f32::MAX;

        for other in state.units.iter().filter(|u| u.owner == enemy && u.is_alive()) {
            let dist = PhysicsSystem::distance(unit.x, unit.y, other.x, other.y);
            if dist < min_dist {
                min_dist = dist;
                nearest = Some(Target {
                    id: other.id.clone(),
                    kind: TargetKind::Unit,
                    x: other.x,
                    y: other.y,
                });
            }
        }

        for tower in state.side(enemy).towers.iter().filter(|t| t.is_alive()) {
            let dist = PhysicsSystem::distance(unit.x, unit.y, tower.x, tower.y);
            if dist < min_dist {
                min_dist = dist;
                nearest = Some(Target {
                    id: tower.id.clone(),
                    kind: TargetKind::Tower,
                    x: tower.x,
                    y: tower.y,
                });
            }
        }

        nearest
    }

    /// Find a living unit or tower by id
    pub fn locate(state: &BattleState, id: &str) -> Option<TargetSlot> {
        if let Some(idx) = state.units.iter().position(|u| u.id == id && u.is_alive()) {
            return Some(TargetSlot::Unit(idx));
        }
        for side in [Side::One, Side::Two] {
            if let Some(idx) = state
                .side(side)
                .towers
                .iter()
                .position(|t| t.id == id && t.is_alive())
            {
                return Some(TargetSlot::Tower(side, idx));
            }
        }
        None
    }

    pub fn slot_position(state: &BattleState, slot: TargetSlot) -> (f32, f32) {
        match slot {
            TargetSlot::Unit(idx) => (state.units[idx].x, state.units[idx].y),
            TargetSlot::Tower(side, idx) => {
                let tower = &state.side(side).towers[idx];
                (tower.x, tower.y)
            }
        }
    }

    /// Shared damage path for units: clamps at zero and starts a flash
    pub fn damage_unit(unit: &mut Unit, damage: i32, runtime: &mut RuntimeState, now: Duration) {
        let prev = unit.hp;
        unit.hp = Self::apply_damage(unit.hp, damage);
        if unit.hp < prev {
            runtime.record_damage(&unit.id, now);
        }
    }

    /// Shared damage path for towers. A tower brought to zero is locked dead
    /// until reconciliation confirms a revival.
    pub fn damage_tower(tower: &mut Tower, damage: i32, runtime: &mut RuntimeState, now: Duration) {
        let prev = tower.hp;
        tower.hp = Self::apply_damage(tower.hp, damage);
        if tower.hp < prev {
            runtime.record_damage(&tower.id, now);
        }
        if !tower.is_alive() {
            let tower_runtime = runtime.tower_mut(&tower.id);
            if tower_runtime.life != TowerLife::Dead {
                debug!(tower_id = %tower.id, "Tower destroyed");
            }
            tower_runtime.life = TowerLife::Dead;
        }
    }

    pub fn damage_slot(
        state: &mut BattleState,
        slot: TargetSlot,
        damage: i32,
        runtime: &mut RuntimeState,
        now: Duration,
    ) {
        match slot {
            TargetSlot::Unit(idx) => Self::damage_unit(&mut state.units[idx], damage, runtime, now),
            TargetSlot::Tower(side, idx) => {
                Self::damage_tower(&mut state.side_mut(side).towers[idx], damage, runtime, now)
            }
        }
    }

    /// Fire every unit whose cadence has elapsed and whose target is in reach
    pub fn resolve_unit_attacks(
        state: &mut BattleState,
        runtime: &mut RuntimeState,
        sim_time: f64,
        now: Duration,
    ) {
        for i in 0..state.units.len() {
            let unit = &state.units[i];
            if !unit.is_alive() {
                continue;
            }

            let stats = UnitStats::for_kind(unit.kind);
            let unit_runtime = runtime.unit_mut(&unit.id);
            let Some(target_id) = unit_runtime.target.clone() else {
                continue;
            };
            if !Self::can_attack(sim_time, unit_runtime.last_attack, stats.attack_speed) {
                continue;
            }

            let Some(slot) = Self::locate(state, &target_id) else {
                continue;
            };
            let (target_x, target_y) = Self::slot_position(state, slot);
            if PhysicsSystem::distance(unit.x, unit.y, target_x, target_y) > stats.range {
                continue;
            }

            let (owner, x, y, kind) = (unit.owner, unit.x, unit.y, unit.kind);
            runtime.unit_mut(&state.units[i].id).last_attack = sim_time;

            match AttackStyle::for_kind(kind) {
                AttackStyle::Strike => Self::damage_slot(state, slot, stats.damage, runtime, now),
                AttackStyle::Shot(projectile_kind) => ProjectileSystem::spawn(
                    state,
                    runtime,
                    Shot {
                        owner,
                        from: (x, y),
                        to: (target_x, target_y),
                        kind: projectile_kind,
                        damage: stats.damage,
                        aoe_radius: stats.aoe_radius,
                    },
                ),
            }
        }
    }

    /// Towers shoot the nearest enemy unit in range on their own cadence
    pub fn resolve_tower_attacks(
        state: &mut BattleState,
        runtime: &mut RuntimeState,
        sim_time: f64,
    ) {
        for side in [Side::One, Side::Two] {
            let king_active = Self::king_active(&state.side(side).towers);

            for t in 0..state.side(side).towers.len() {
                let tower = &state.side(side).towers[t];
                if !tower.is_alive() || (tower.kind == TowerKind::King && !king_active) {
                    continue;
                }

                let stats = TowerStats::for_kind(tower.kind);
                let last_attack = runtime.tower_mut(&tower.id).last_attack;
                if !Self::can_attack(sim_time, last_attack, stats.attack_speed) {
                    continue;
                }

                let mut nearest: Option<(f32, f32)> = None;
                let mut min_dist = f32::MAX;
                for unit in state.units.iter().filter(|u| u.owner != side && u.is_alive()) {
                    let dist = PhysicsSystem::distance(tower.x, tower.y, unit.x, unit.y);
                    if dist <= stats.range && dist < min_dist {
                        min_dist = dist;
                        nearest = Some((unit.x, unit.y));
                    }
                }

                let Some(aim) = nearest else {
                    continue;
                };

                let origin = (tower.x, tower.y);
                runtime.tower_mut(&state.side(side).towers[t].id).last_attack = sim_time;
                ProjectileSystem::spawn(
                    state,
                    runtime,
                    Shot {
                        owner: side,
                        from: origin,
                        to: aim,
                        kind: ProjectileKind::Tower,
                        damage: stats.damage,
                        aoe_radius: 0.0,
                    },
                );
            }
        }
    }
}
