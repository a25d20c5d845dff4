//! Builders shared by the integration tests

#![allow(dead_code)]

use std::time::Duration;

use arena_client::game::rules::{TowerStats, UnitStats};
use arena_client::game::state::{PlayerSide, Side, Tower, TowerKind, Unit, UnitKind};
use arena_client::game::{PredictionEngine, Tuning};
use arena_client::util::time::ManualClock;
use arena_client::ws::protocol::Snapshot;

/// Frame length that sums exactly: sixteen frames make one second
pub const FRAME: Duration = Duration::from_micros(62_500);

pub fn engine() -> (PredictionEngine<ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    (
        PredictionEngine::with_clock(clock.clone(), Tuning::default()),
        clock,
    )
}

/// Advance the clock and step, `frames` times
pub fn step_frames(engine: &mut PredictionEngine<ManualClock>, clock: &ManualClock, frames: u32) {
    for _ in 0..frames {
        clock.advance(FRAME);
        engine.step();
    }
}

pub fn tower(id: &str, kind: TowerKind, x: f32, y: f32, hp: i32) -> Tower {
    Tower {
        id: id.to_string(),
        hp,
        max_hp: TowerStats::for_kind(kind).max_hp,
        x,
        y,
        kind,
    }
}

pub fn king(side: Side) -> Tower {
    match side {
        Side::One => tower("p1_king", TowerKind::King, 400.0, 940.0, 3000),
        Side::Two => tower("p2_king", TowerKind::King, 400.0, 60.0, 3000),
    }
}

pub fn unit(id: &str, kind: UnitKind, owner: Side, x: f32, y: f32) -> Unit {
    let hp = UnitStats::for_kind(kind).hp;
    Unit {
        id: id.to_string(),
        kind,
        owner,
        hp,
        max_hp: hp,
        x,
        y,
    }
}

pub fn side(resource: f32, towers: Vec<Tower>) -> PlayerSide {
    PlayerSide { resource, towers }
}

pub fn snapshot(tick: u64, p1: PlayerSide, p2: PlayerSide, units: Vec<Unit>) -> Snapshot {
    Snapshot {
        tick,
        player1: Some(p1),
        player2: Some(p2),
        units,
        projectiles: Vec::new(),
    }
}
