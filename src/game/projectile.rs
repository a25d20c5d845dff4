//! Locally simulated projectiles

use std::time::Duration;

use super::combat::CombatSystem;
use super::physics::PhysicsSystem;
use super::rules::{PROJECTILE_SPEED, PROJECTILE_TOWER_HIT_RADIUS, PROJECTILE_UNIT_HIT_RADIUS};
use super::runtime::{ProjectileMeta, RuntimeState};
use super::state::{BattleState, Projectile, ProjectileKind, Side};

/// Everything needed to launch one projectile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shot {
    pub owner: Side,
    pub from: (f32, f32),
    /// Fixed impact point; projectiles do not home
    pub to: (f32, f32),
    pub kind: ProjectileKind,
    pub damage: i32,
    pub aoe_radius: f32,
}

pub struct ProjectileSystem;

impl ProjectileSystem {
    pub fn spawn(state: &mut BattleState, runtime: &mut RuntimeState, shot: Shot) {
        let id = runtime.next_projectile_id();
        runtime.projectiles.insert(
            id.clone(),
            ProjectileMeta {
                owner: shot.owner,
                damage: shot.damage,
                aoe_radius: shot.aoe_radius,
            },
        );
        state.projectiles.push(Projectile {
            id,
            owner_id: format!("owner_{}", shot.owner.number()),
            x: shot.from.0,
            y: shot.from.1,
            target_x: shot.to.0,
            target_y: shot.to.1,
            kind: shot.kind,
        });
    }

    /// Fly every projectile one step. Those that reach their impact point
    /// this step resolve and are removed.
    pub fn advance(state: &mut BattleState, runtime: &mut RuntimeState, dt: f32, now: Duration) {
        let step = PROJECTILE_SPEED * dt;
        let in_flight = std::mem::take(&mut state.projectiles);
        let mut remaining = Vec::with_capacity(in_flight.len());

        for mut projectile in in_flight {
            let dist = PhysicsSystem::distance(
                projectile.x,
                projectile.y,
                projectile.target_x,
                projectile.target_y,
            );

            if dist <= step {
                // Server-sent projectiles carry no payload and just vanish
                if let Some(meta) = runtime.projectiles.remove(&projectile.id) {
                    Self::impact(state, runtime, &projectile, meta, now);
                }
                continue;
            }

            let (x, y) = PhysicsSystem::move_towards(
                projectile.x,
                projectile.y,
                projectile.target_x,
                projectile.target_y,
                PROJECTILE_SPEED,
                dt,
            );
            projectile.x = x;
            projectile.y = y;
            remaining.push(projectile);
        }

        state.projectiles = remaining;
    }

    fn impact(
        state: &mut BattleState,
        runtime: &mut RuntimeState,
        projectile: &Projectile,
        meta: ProjectileMeta,
        now: Duration,
    ) {
        let (ix, iy) = (projectile.target_x, projectile.target_y);
        let enemy = meta.owner.enemy();

        if projectile.kind == ProjectileKind::Aoe {
            for unit in state.units.iter_mut() {
                if unit.owner == enemy
                    && unit.is_alive()
                    && PhysicsSystem::distance(ix, iy, unit.x, unit.y) <= meta.aoe_radius
                {
                    CombatSystem::damage_unit(unit, meta.damage, runtime, now);
                }
            }
            for tower in state.side_mut(enemy).towers.iter_mut() {
                if tower.is_alive()
                    && PhysicsSystem::distance(ix, iy, tower.x, tower.y) <= meta.aoe_radius
                {
                    CombatSystem::damage_tower(tower, meta.damage, runtime, now);
                }
            }
            return;
        }

        if let Some(unit) = state.units.iter_mut().find(|u| {
            u.owner == enemy
                && u.is_alive()
                && PhysicsSystem::distance(ix, iy, u.x, u.y) < PROJECTILE_UNIT_HIT_RADIUS
        }) {
            CombatSystem::damage_unit(unit, meta.damage, runtime, now);
            return;
        }

        if let Some(tower) = state.side_mut(enemy).towers.iter_mut().find(|t| {
            t.is_alive() && PhysicsSystem::distance(ix, iy, t.x, t.y) < PROJECTILE_TOWER_HIT_RADIUS
        }) {
            CombatSystem::damage_tower(tower, meta.damage, runtime, now);
        }
    }
}
