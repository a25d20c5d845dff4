//! Snapshot building and bookkeeping

use tracing::debug;

use super::rules::TowerStats;
use super::state::{BattleState, PlayerSide, Side, Tower, TowerKind};
use crate::ws::protocol::Snapshot;

/// Resource each player starts a battle with
pub const STARTING_RESOURCE: f32 = 5.0;

/// Tower layout for one side: left lateral, right lateral, king
pub fn starting_towers(side: Side) -> Vec<Tower> {
    let (lateral_y, king_y) = match side {
        Side::One => (860.0, 940.0),
        Side::Two => (140.0, 60.0),
    };
    let prefix = format!("p{}", side.number());

    [
        ("left", TowerKind::Lateral, 180.0, lateral_y),
        ("right", TowerKind::Lateral, 620.0, lateral_y),
        ("king", TowerKind::King, 400.0, king_y),
    ]
    .into_iter()
    .map(|(name, kind, x, y)| {
        let max_hp = TowerStats::for_kind(kind).max_hp;
        Tower {
            id: format!("{prefix}_{name}"),
            hp: max_hp,
            max_hp,
            x,
            y,
            kind,
        }
    })
    .collect()
}

/// A fresh battle at tick 0
pub fn opening_state() -> BattleState {
    BattleState {
        tick: 0,
        player1: PlayerSide {
            resource: STARTING_RESOURCE,
            towers: starting_towers(Side::One),
        },
        player2: PlayerSide {
            resource: STARTING_RESOURCE,
            towers: starting_towers(Side::Two),
        },
        units: Vec::new(),
        projectiles: Vec::new(),
    }
}

/// Builds wire snapshots from a simulated battle at a fixed tick interval
pub struct SnapshotBuilder {
    ticks_since_snapshot: u32,
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            ticks_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to send a snapshot
    pub fn should_send(&mut self) -> bool {
        self.ticks_since_snapshot += 1;
        if self.ticks_since_snapshot >= self.snapshot_interval {
            self.ticks_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (used for important events)
    pub fn force_next(&mut self) {
        self.ticks_since_snapshot = self.snapshot_interval;
    }

    pub fn build(&self, state: &BattleState) -> Snapshot {
        Snapshot {
            tick: state.tick,
            player1: Some(state.player1.clone()),
            player2: Some(state.player2.clone()),
            units: state.units.clone(),
            projectiles: state.projectiles.clone(),
        }
    }
}

/// Counters over received snapshots, for debugging
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SnapshotStats {
    pub total_snapshots: u64,
    pub total_bytes: u64,
    pub avg_units_per_snapshot: f32,
    /// Snapshots whose tick did not advance past the newest seen
    pub stale_snapshots: u64,
    pub last_tick: Option<u64>,
}

impl SnapshotStats {
    pub fn record(&mut self, snapshot: &Snapshot, bytes: usize) {
        self.total_snapshots += 1;
        self.total_bytes += bytes as u64;

        // Running average
        let n = self.total_snapshots as f32;
        self.avg_units_per_snapshot =
            self.avg_units_per_snapshot * ((n - 1.0) / n) + (snapshot.units.len() as f32 / n);

        match self.last_tick {
            Some(last) if snapshot.tick <= last => {
                self.stale_snapshots += 1;
                debug!(tick = snapshot.tick, newest = last, "Stale snapshot");
            }
            _ => self.last_tick = Some(snapshot.tick),
        }
    }
}
