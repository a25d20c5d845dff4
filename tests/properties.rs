//! Property tests for reconciliation, regeneration and pathing

mod common;

use std::time::Duration;

use proptest::prelude::*;

use arena_client::game::combat::CombatSystem;
use arena_client::game::pathing::next_waypoint;
use arena_client::game::physics::PhysicsSystem;
use arena_client::game::reconcile::{correct_position, correct_resource, reconcile, Tuning};
use arena_client::game::rules::{is_in_river, is_on_bridge, MAX_RESOURCE, RIVER_START_Y};
use arena_client::game::runtime::{RuntimeState, TowerLife};
use arena_client::game::state::{BattleState, PlayerSide, Side, TowerKind, UnitKind};
use arena_client::ws::protocol::Snapshot;

use common::*;

fn lateral_state(hp: i32) -> BattleState {
    BattleState {
        player2: side(5.0, vec![tower("p2_left", TowerKind::Lateral, 180.0, 140.0, hp)]),
        ..BattleState::default()
    }
}

fn lateral_snapshot(tick: u64, hp: i32) -> Snapshot {
    Snapshot {
        tick,
        player1: None,
        player2: Some(side(
            5.0,
            vec![tower("p2_left", TowerKind::Lateral, 180.0, 140.0, hp)],
        )),
        units: Vec::new(),
        projectiles: Vec::new(),
    }
}

proptest! {
    #[test]
    fn prop_tower_hp_stays_in_bounds(local_hp in 0i32..=1500, server_hp in -500i32..5000) {
        let mut state = lateral_state(local_hp);
        let mut runtime = RuntimeState::new();
        runtime.sync_with(&state);

        reconcile(
            &mut state,
            &mut runtime,
            &lateral_snapshot(1, server_hp),
            &Tuning::default(),
            Duration::ZERO,
        );

        let tower = &state.player2.towers[0];
        prop_assert!(tower.hp >= 0);
        prop_assert!(tower.hp <= tower.max_hp);
    }

    #[test]
    fn prop_unit_hp_stays_in_bounds(
        local_hp in -100i32..=1000,
        server_hp in -500i32..5000,
        max_hp in 1i32..=1500,
        newcomer_hp in -500i32..5000,
    ) {
        let mut local = unit("u1", UnitKind::Melee, Side::One, 100.0, 700.0);
        local.hp = local_hp;
        let mut state = BattleState {
            units: vec![local],
            ..BattleState::default()
        };
        let mut runtime = RuntimeState::new();
        runtime.sync_with(&state);

        let mut matched = unit("u1", UnitKind::Melee, Side::One, 101.0, 700.0);
        matched.hp = server_hp;
        matched.max_hp = max_hp;
        let mut newcomer = unit("u2", UnitKind::Ranged, Side::Two, 300.0, 200.0);
        newcomer.hp = newcomer_hp;
        newcomer.max_hp = max_hp;
        let snap = Snapshot {
            tick: 1,
            units: vec![matched, newcomer],
            ..Snapshot::default()
        };

        reconcile(&mut state, &mut runtime, &snap, &Tuning::default(), Duration::ZERO);

        prop_assert_eq!(state.units.len(), 2);
        for u in &state.units {
            prop_assert!(u.hp >= 0, "{} below zero: {}", u.id, u.hp);
            prop_assert!(u.hp <= u.max_hp, "{} above max: {}", u.id, u.hp);
        }
    }

    #[test]
    fn prop_adopted_snapshot_is_in_bounds(
        tower_hp in -2000i32..8000,
        unit_hp in -500i32..3000,
        max_hp in 1i32..=3000,
        p1_resource in -20.0f32..30.0,
        p2_resource in -20.0f32..30.0,
    ) {
        let (mut engine, _clock) = engine();
        let mut lateral = tower("p1_left", TowerKind::Lateral, 180.0, 860.0, tower_hp);
        lateral.max_hp = max_hp;
        let mut walker = unit("u1", UnitKind::Melee, Side::Two, 200.0, 300.0);
        walker.hp = unit_hp;
        walker.max_hp = max_hp;

        engine.apply_snapshot(&snapshot(
            0,
            side(p1_resource, vec![lateral, king(Side::One)]),
            side(p2_resource, vec![king(Side::Two)]),
            vec![walker],
        ));

        let state = engine.state().unwrap();
        for s in [Side::One, Side::Two] {
            let player = state.side(s);
            prop_assert!((0.0..=MAX_RESOURCE).contains(&player.resource));
            for t in &player.towers {
                prop_assert!(t.hp >= 0 && t.hp <= t.max_hp, "{} out of bounds: {}", t.id, t.hp);
            }
        }
        for u in &state.units {
            prop_assert!(u.hp >= 0 && u.hp <= u.max_hp, "{} out of bounds: {}", u.id, u.hp);
        }
    }

    #[test]
    fn prop_corrected_resource_in_range(local in -5.0f32..15.0, server in -5.0f32..15.0) {
        let merged = correct_resource(local, server, &Tuning::default());
        prop_assert!((0.0..=MAX_RESOURCE).contains(&merged));
    }

    #[test]
    fn prop_resource_never_runs_ahead_of_spending(local in 0.0f32..=10.0, server in 0.0f32..=10.0) {
        let merged = correct_resource(local, server, &Tuning::default());
        if server < local {
            prop_assert_eq!(merged, server);
        } else {
            prop_assert!(merged >= local && merged <= server);
        }
    }

    #[test]
    fn prop_regeneration_stays_capped(
        start in 0.0f32..=10.0,
        gaps in proptest::collection::vec(1u64..=100, 1..120),
    ) {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(&snapshot(
            0,
            side(start, vec![king(Side::One)]),
            side(start, vec![king(Side::Two)]),
            vec![],
        ));

        let mut previous = start;
        for gap in gaps {
            clock.advance(Duration::from_millis(gap));
            let state = engine.step().unwrap();
            let resource = state.player1.resource;
            prop_assert!(resource >= previous);
            prop_assert!(resource <= MAX_RESOURCE);
            previous = resource;
        }
    }

    #[test]
    fn prop_dead_tower_holds_through_revive_window(reports in 1u32..12, server_hp in 1i32..=1500) {
        let mut state = lateral_state(0);
        let mut runtime = RuntimeState::new();
        runtime.sync_with(&state);
        let tuning = Tuning::default();

        for tick in 1..=reports {
            let snap = lateral_snapshot(tick as u64, server_hp);
            reconcile(&mut state, &mut runtime, &snap, &tuning, Duration::ZERO);
        }

        prop_assert_eq!(state.player2.towers[0].hp, 0);
        prop_assert_eq!(runtime.tower_life("p2_left"), TowerLife::Reviving { frames: reports });

        for tick in reports + 1..=tuning.revive_confirm_frames {
            let snap = lateral_snapshot(tick as u64, server_hp);
            reconcile(&mut state, &mut runtime, &snap, &tuning, Duration::ZERO);
        }

        prop_assert_eq!(state.player2.towers[0].hp, server_hp);
        prop_assert_eq!(runtime.tower_life("p2_left"), TowerLife::Alive);
    }

    #[test]
    fn prop_missing_units_survive_below_threshold(absent in 1u32..10) {
        let mut state = BattleState {
            units: vec![unit("ghost", UnitKind::Melee, Side::One, 100.0, 700.0)],
            ..BattleState::default()
        };
        let mut runtime = RuntimeState::new();
        runtime.sync_with(&state);
        let tuning = Tuning::default();

        let empty = Snapshot::default();
        for _ in 0..absent {
            reconcile(&mut state, &mut runtime, &empty, &tuning, Duration::ZERO);
        }

        let present = state.unit("ghost").is_some();
        prop_assert_eq!(present, absent < tuning.missing_unit_threshold);
        prop_assert_eq!(runtime.units.contains_key("ghost"), present);
    }

    #[test]
    fn prop_position_correction_never_grows_error(local in 0.0f32..800.0, server in 0.0f32..800.0) {
        let tuning = Tuning::default();
        let corrected = correct_position(local, server, &tuning);

        prop_assert!((corrected - server).abs() <= (local - server).abs());
        prop_assert_eq!(correct_position(server, server, &tuning), server);
        if (local - server).abs() > tuning.teleport_threshold {
            prop_assert_eq!(corrected, server);
        }
    }

    #[test]
    fn prop_king_wakes_with_any_lateral_down(left in 0i32..=1500, right in 0i32..=1500) {
        let towers = vec![
            tower("p2_left", TowerKind::Lateral, 180.0, 140.0, left),
            tower("p2_right", TowerKind::Lateral, 620.0, 140.0, right),
            king(Side::Two),
        ];

        prop_assert_eq!(CombatSystem::king_active(&towers), left == 0 || right == 0);
    }

    #[test]
    fn prop_long_gaps_freeze_the_frame(gap_ms in 101u64..5000) {
        let (mut engine, clock) = engine();
        engine.apply_snapshot(&snapshot(
            30,
            side(4.0, vec![king(Side::One)]),
            side(4.0, vec![king(Side::Two)]),
            vec![],
        ));

        clock.advance(Duration::from_millis(gap_ms));
        let state = engine.step().unwrap();

        prop_assert_eq!(state.tick, 30);
        prop_assert_eq!(state.player1.resource, 4.0);
    }

    #[test]
    fn prop_crossing_walkers_stay_on_bridges(x in 20.0f32..780.0, y in 540.0f32..980.0) {
        let (tx, ty) = (400.0, 60.0);
        let (mut x, mut y) = (x, y);

        for _ in 0..3000 {
            let (wx, wy) = next_waypoint(x, y, tx, ty);
            let next = PhysicsSystem::move_towards(x, y, wx, wy, 60.0, 1.0 / 60.0);
            x = next.0;
            y = next.1;

            if is_in_river(y) {
                prop_assert!(is_on_bridge(x, y), "off a bridge at ({}, {})", x, y);
            }
        }

        prop_assert!(y < RIVER_START_Y);
    }
}

#[test]
fn missing_side_leaves_local_side_alone() {
    let mut state = BattleState {
        player1: PlayerSide {
            resource: 7.0,
            towers: vec![king(Side::One)],
        },
        ..BattleState::default()
    };
    let mut runtime = RuntimeState::new();
    runtime.sync_with(&state);

    reconcile(
        &mut state,
        &mut runtime,
        &lateral_snapshot(5, 1500),
        &Tuning::default(),
        Duration::ZERO,
    );

    assert_eq!(state.tick, 5);
    assert_eq!(state.player1.resource, 7.0);
    assert_eq!(state.player1.towers[0].hp, 3000);
}
