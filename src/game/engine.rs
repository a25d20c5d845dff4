//! Prediction engine - owns the local battle state and advances it per frame

use std::collections::HashMap;
use std::time::Duration;

use tracing::{debug, info, trace};

use super::combat::CombatSystem;
use super::pathing::next_waypoint;
use super::physics::PhysicsSystem;
use super::projectile::ProjectileSystem;
use super::reconcile::{reconcile, Tuning};
use super::rules::{UnitStats, MAX_RESOURCE, RESOURCE_REGEN_PER_SEC};
use super::runtime::{RuntimeState, TowerLife};
use super::state::{BattleState, Side, Tower, Unit};
use crate::util::time::{tick_to_secs, Clock, MonotonicClock};
use crate::ws::protocol::Snapshot;

/// Client-side predictive simulation.
///
/// The first snapshot is adopted as-is; every later one is merged through
/// [`reconcile`]. Between snapshots [`PredictionEngine::step`] advances the
/// state using elapsed time read from the clock.
pub struct PredictionEngine<C: Clock = MonotonicClock> {
    state: Option<BattleState>,
    runtime: RuntimeState,
    clock: C,
    tuning: Tuning,
    /// Simulation seconds, drives attack cadence
    sim_time: f64,
    last_update: Duration,
}

impl PredictionEngine<MonotonicClock> {
    pub fn new() -> Self {
        Self::with_clock(MonotonicClock::new(), Tuning::default())
    }
}

impl Default for PredictionEngine<MonotonicClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> PredictionEngine<C> {
    pub fn with_clock(clock: C, tuning: Tuning) -> Self {
        let last_update = clock.now();
        Self {
            state: None,
            runtime: RuntimeState::new(),
            clock,
            tuning,
            sim_time: 0.0,
            last_update,
        }
    }

    /// Feed an authoritative snapshot
    pub fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        let now = self.clock.now();

        match self.state.as_mut() {
            Some(state) => {
                reconcile(state, &mut self.runtime, snapshot, &self.tuning, now);
                trace!(tick = snapshot.tick, local_tick = state.tick, "Merged snapshot");
            }
            None => {
                let mut state = BattleState {
                    tick: snapshot.tick,
                    player1: snapshot.player1.clone().unwrap_or_default(),
                    player2: snapshot.player2.clone().unwrap_or_default(),
                    units: snapshot.units.clone(),
                    // Server projectiles carry no payload to simulate
                    projectiles: Vec::new(),
                };
                clamp_adopted(&mut state);
                self.runtime.sync_with(&state);
                self.sim_time = tick_to_secs(snapshot.tick);
                self.last_update = now;

                info!(
                    tick = snapshot.tick,
                    units = state.units.len(),
                    "Adopted initial snapshot"
                );
                self.state = Some(state);
            }
        }
    }

    /// Advance the local state by the time elapsed since the previous call.
    /// Returns `None` until a snapshot has been adopted.
    pub fn step(&mut self) -> Option<&BattleState> {
        let now = self.clock.now();
        let elapsed = now.saturating_sub(self.last_update);
        self.last_update = now;

        let state = self.state.as_mut()?;

        if elapsed > self.tuning.max_frame_gap {
            debug!(
                elapsed_ms = elapsed.as_millis() as u64,
                "Frame gap too large, holding state"
            );
            return Some(&*state);
        }

        let dt = elapsed.as_secs_f64();
        state.tick += 1;
        self.sim_time += dt;

        simulate_frame(state, &mut self.runtime, self.sim_time, dt as f32, now);

        trace!(
            tick = state.tick,
            units = state.units.len(),
            projectiles = state.projectiles.len(),
            "Stepped"
        );
        Some(&*state)
    }

    /// Drop all state; the next snapshot is adopted fresh
    pub fn reset(&mut self) {
        self.state = None;
        self.runtime.clear();
        self.sim_time = 0.0;
        self.last_update = self.clock.now();
    }

    pub fn state(&self) -> Option<&BattleState> {
        self.state.as_ref()
    }

    pub fn resource(&self, side: Side) -> Option<f32> {
        self.state.as_ref().map(|s| s.side(side).resource)
    }

    /// Flash intensity of an entity right now
    pub fn damage_flash(&self, id: &str) -> f32 {
        self.runtime.damage_flash(id, self.clock.now())
    }

    /// Every entity that is currently flashing
    pub fn damage_flashes(&self) -> HashMap<String, f32> {
        let now = self.clock.now();
        self.runtime
            .last_damage
            .keys()
            .filter_map(|id| {
                let flash = self.runtime.damage_flash(id, now);
                (flash > 0.0).then(|| (id.clone(), flash))
            })
            .collect()
    }

    pub fn unit_target(&self, id: &str) -> Option<&str> {
        self.runtime.units.get(id)?.target.as_deref()
    }

    pub fn tower_life(&self, id: &str) -> TowerLife {
        self.runtime.tower_life(id)
    }

    /// Current reading of the engine's clock
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn runtime(&self) -> &RuntimeState {
        &self.runtime
    }
}

/// One frame of battle rules. `sim_time` is the already advanced
/// simulation clock, `now` the wall reading used for damage flashes.
pub fn simulate_frame(
    state: &mut BattleState,
    runtime: &mut RuntimeState,
    sim_time: f64,
    dt: f32,
    now: Duration,
) {
    regenerate(state, dt);
    advance_units(state, runtime, dt);
    PhysicsSystem::apply_separation(&mut state.units);
    CombatSystem::resolve_unit_attacks(state, runtime, sim_time, now);
    CombatSystem::resolve_tower_attacks(state, runtime, sim_time);
    ProjectileSystem::advance(state, runtime, dt, now);
    purge_dead(state, runtime);
    runtime.expire_damage(now);
}

/// Adopted values obey the same bounds as merged ones
fn clamp_adopted(state: &mut BattleState) {
    for side in [Side::One, Side::Two] {
        let player = state.side_mut(side);
        player.resource = player.resource.clamp(0.0, MAX_RESOURCE);
        player.towers.iter_mut().for_each(Tower::clamp_hp);
    }
    state.units.iter_mut().for_each(Unit::clamp_hp);
}

fn regenerate(state: &mut BattleState, dt: f32) {
    for side in [Side::One, Side::Two] {
        let player = state.side_mut(side);
        player.resource = (player.resource + RESOURCE_REGEN_PER_SEC * dt).min(MAX_RESOURCE);
    }
}

/// Retarget every living unit, then walk the mobile ones that are out of
/// range toward their next waypoint
fn advance_units(state: &mut BattleState, runtime: &mut RuntimeState, dt: f32) {
    for i in 0..state.units.len() {
        if !state.units[i].is_alive() {
            continue;
        }

        let target = CombatSystem::nearest_enemy(state, &state.units[i]);
        let unit = &state.units[i];
        runtime.unit_mut(&unit.id).target = target.as_ref().map(|t| t.id.clone());

        let Some(target) = target else {
            continue;
        };
        let stats = UnitStats::for_kind(unit.kind);
        if !stats.is_mobile()
            || PhysicsSystem::distance(unit.x, unit.y, target.x, target.y) <= stats.range
        {
            continue;
        }

        let (wx, wy) = next_waypoint(unit.x, unit.y, target.x, target.y);
        let (x, y) = PhysicsSystem::move_towards(unit.x, unit.y, wx, wy, stats.move_speed, dt);
        let unit = &mut state.units[i];
        unit.x = x;
        unit.y = y;
    }
}

fn purge_dead(state: &mut BattleState, runtime: &mut RuntimeState) {
    state.units.retain(|unit| {
        if unit.is_alive() {
            return true;
        }
        debug!(unit_id = %unit.id, "Unit died");
        runtime.release_unit(&unit.id);
        false
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::state::{PlayerSide, Projectile, ProjectileKind, TowerKind, Unit, UnitKind};
    use crate::util::time::ManualClock;

    fn engine() -> (PredictionEngine<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (
            PredictionEngine::with_clock(clock.clone(), Tuning::default()),
            clock,
        )
    }

    fn snapshot(tick: u64, units: Vec<Unit>) -> Snapshot {
        Snapshot {
            tick,
            player1: Some(PlayerSide {
                resource: 5.0,
                towers: Vec::new(),
            }),
            player2: Some(PlayerSide {
                resource: 9.9,
                towers: Vec::new(),
            }),
            units,
            projectiles: vec![Projectile {
                id: "srv_1".into(),
                owner_id: "owner_1".into(),
                x: 0.0,
                y: 0.0,
                target_x: 10.0,
                target_y: 10.0,
                kind: ProjectileKind::Ranged,
            }],
        }
    }

    fn walker(id: &str, owner: Side, x: f32, y: f32) -> Unit {
        Unit {
            id: id.into(),
            kind: UnitKind::Melee,
            owner,
            hp: 500,
            max_hp: 500,
            x,
            y,
        }
    }

    #[test]
    fn nothing_to_step_before_first_snapshot() {
        let (mut engine, clock) = engine();
        clock.advance_ms(16);
        assert!(engine.step().is_none());
        assert!(engine.resource(Side::One).is_none());
    }

    #[test]
    fn first_snapshot_is_adopted_without_projectiles() {
        let (mut engine, _clock) = engine();
        engine.apply_snapshot(&snapshot(120, vec![]));

        let state = engine.state().unwrap();
        assert_eq!(state.tick, 120);
        assert!(state.projectiles.is_empty());
        assert_eq!(engine.sim_time(), 2.0);
    }

    #[test]
    fn step_regenerates_and_caps_resource() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(&snapshot(0, vec![]));

        clock.advance(Duration::from_micros(62_500));
        let state = engine.step().unwrap();
        assert_eq!(state.tick, 1);
        assert_eq!(state.player1.resource, 5.0625);
        assert!((state.player2.resource - 9.9625).abs() < 1e-5);

        clock.advance(Duration::from_micros(62_500));
        let state = engine.step().unwrap();
        assert_eq!(state.player2.resource, MAX_RESOURCE);
    }

    #[test]
    fn long_frame_gap_pauses_one_frame() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(&snapshot(0, vec![]));

        clock.advance_ms(500);
        let state = engine.step().unwrap();
        assert_eq!(state.tick, 0);
        assert_eq!(state.player1.resource, 5.0);

        clock.advance(Duration::from_micros(62_500));
        let state = engine.step().unwrap();
        assert_eq!(state.tick, 1);
        assert_eq!(state.player1.resource, 5.0625);
    }

    #[test]
    fn units_target_and_walk_toward_enemies() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(&snapshot(
            0,
            vec![
                walker("a", Side::One, 180.0, 800.0),
                walker("b", Side::Two, 180.0, 600.0),
            ],
        ));

        clock.advance(Duration::from_micros(62_500));
        let state = engine.step().unwrap();

        assert!(state.units[0].y < 800.0);
        assert!(state.units[1].y > 600.0);
        assert_eq!(engine.unit_target("a"), Some("b"));
        assert_eq!(engine.unit_target("b"), Some("a"));
    }

    #[test]
    fn dead_units_are_purged_with_their_annotations() {
        let (mut engine, clock) = engine();
        let mut corpse = walker("dead", Side::One, 100.0, 700.0);
        corpse.hp = 0;
        engine.apply_snapshot(&snapshot(0, vec![corpse, walker("alive", Side::One, 300.0, 700.0)]));
        assert!(engine.runtime().units.contains_key("dead"));

        clock.advance_ms(16);
        let state = engine.step().unwrap();

        assert_eq!(state.units.len(), 1);
        assert_eq!(state.units[0].id, "alive");
        assert!(!engine.runtime().units.contains_key("dead"));
    }

    #[test]
    fn reset_forgets_everything() {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(&snapshot(60, vec![walker("u", Side::One, 100.0, 700.0)]));
        clock.advance_ms(16);
        engine.step();

        engine.reset();

        assert!(engine.state().is_none());
        assert!(engine.runtime().units.is_empty());
        assert_eq!(engine.sim_time(), 0.0);

        engine.apply_snapshot(&snapshot(600, vec![]));
        assert_eq!(engine.state().unwrap().tick, 600);
        assert_eq!(engine.sim_time(), 10.0);
    }

    #[test]
    fn adoption_clamps_out_of_range_values() {
        let (mut engine, _clock) = engine();
        let mut overfull = walker("u", Side::One, 100.0, 700.0);
        overfull.hp = 900;
        let mut snap = snapshot(0, vec![overfull]);
        snap.player1 = Some(PlayerSide {
            resource: 14.0,
            towers: vec![Tower {
                id: "p1_king".into(),
                hp: -50,
                max_hp: 3000,
                x: 400.0,
                y: 940.0,
                kind: TowerKind::King,
            }],
        });
        snap.player2.as_mut().unwrap().resource = -1.0;

        engine.apply_snapshot(&snap);

        let state = engine.state().unwrap();
        assert_eq!(state.units[0].hp, 500);
        assert_eq!(state.player1.towers[0].hp, 0);
        assert_eq!(state.player1.resource, MAX_RESOURCE);
        assert_eq!(state.player2.resource, 0.0);
        assert_eq!(engine.tower_life("p1_king"), TowerLife::Dead);
    }
}
