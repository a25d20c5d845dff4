//! Seeded stand-in for the match server
//!
//! Runs the same battle rules the client predicts with, accepts the
//! client's placements, spawns opponent units from a seeded RNG and emits
//! snapshots at a fixed interval. Used by the headless binary when no
//! replay file is given.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::game::engine::simulate_frame;
use crate::game::rules::{is_in_deploy_zone, UnitStats, ARENA_WIDTH, RIVER_END_Y, RIVER_START_Y};
use crate::game::runtime::RuntimeState;
use crate::game::snapshot::{opening_state, SnapshotBuilder};
use crate::game::state::{BattleState, Side, TowerKind, Unit, UnitKind};
use crate::util::time::{tick_to_secs, SERVER_TPS};
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Ticks between opponent placement attempts
const OPPONENT_SPAWN_EVERY: u64 = 150;
/// Matches that nobody wins end after this many ticks
const MATCH_TICK_LIMIT: u64 = SERVER_TPS as u64 * 180;
/// Ticks of countdown between match found and game start
const COUNTDOWN_TICKS: u64 = SERVER_TPS as u64 * 3;

const DEPLOYABLE: [UnitKind; 5] = [
    UnitKind::Melee,
    UnitKind::Ranged,
    UnitKind::Aoe,
    UnitKind::Single,
    UnitKind::Defense,
];

pub struct DemoServer {
    state: BattleState,
    runtime: RuntimeState,
    rng: ChaCha8Rng,
    builder: SnapshotBuilder,
    client_side: Side,
    ticks: u64,
    next_unit_id: u64,
    started: bool,
    finished: bool,
}

impl DemoServer {
    pub fn new(seed: u64, client_side: Side, snapshot_interval_ticks: u32) -> Self {
        Self {
            state: opening_state(),
            runtime: RuntimeState::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            builder: SnapshotBuilder::new(snapshot_interval_ticks),
            client_side,
            ticks: 0,
            next_unit_id: 1,
            started: false,
            finished: false,
        }
    }

    pub fn state(&self) -> &BattleState {
        &self.state
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Messages sent before the battle starts
    pub fn greeting(&self, seed: u64) -> ServerMsg {
        ServerMsg::MatchFound {
            room_id: Some(format!("demo_{seed}")),
            player_num: Some(self.client_side.number()),
            opponent_id: Some("demo_bot".to_string()),
        }
    }

    /// Handle a message from the client
    pub fn handle_client_msg(&mut self, msg: ClientMsg) {
        match msg {
            ClientMsg::SpawnUnit { card_type, x, y } => {
                if !self.started || self.finished {
                    warn!("Placement before the battle started");
                    return;
                }
                if !self.spawn_unit(self.client_side, card_type, x, y) {
                    debug!(?card_type, x, y, "Client placement refused");
                }
            }
            ClientMsg::JoinQueue | ClientMsg::LeaveQueue => {}
        }
    }

    /// Place a unit if the side can afford it and the spot is legal
    pub fn spawn_unit(&mut self, side: Side, kind: UnitKind, x: f32, y: f32) -> bool {
        let stats = UnitStats::for_kind(kind);
        let player = self.state.side_mut(side);
        if !is_in_deploy_zone(side, x, y) || player.resource < stats.cost as f32 {
            return false;
        }
        player.resource -= stats.cost as f32;

        let id = format!("unit_{}", self.next_unit_id);
        self.next_unit_id += 1;
        self.runtime.unit_mut(&id);
        self.state.units.push(Unit {
            id,
            kind,
            owner: side,
            hp: stats.hp,
            max_hp: stats.hp,
            x,
            y,
        });
        true
    }

    /// Advance one server tick, returning anything to send
    pub fn tick(&mut self) -> Vec<ServerMsg> {
        let mut out = Vec::new();
        if self.finished {
            return out;
        }

        self.ticks += 1;
        if !self.started {
            if self.ticks >= COUNTDOWN_TICKS {
                self.started = true;
                self.builder.force_next();
                out.push(ServerMsg::GameStart {
                    room_id: None,
                    player_num: Some(self.client_side.number()),
                });
            }
            return out;
        }

        let dt = 1.0 / SERVER_TPS as f32;
        self.state.tick += 1;
        let sim_time = tick_to_secs(self.state.tick);
        let now = Duration::from_secs_f64(sim_time);

        if self.state.tick % OPPONENT_SPAWN_EVERY == 0 {
            self.spawn_opponent();
        }
        simulate_frame(&mut self.state, &mut self.runtime, sim_time, dt, now);

        if self.builder.should_send() {
            out.push(ServerMsg::GameState {
                game_state: self.builder.build(&self.state),
            });
        }

        if let Some(winner) = self.winner() {
            info!(winner = winner.number(), tick = self.state.tick, "Demo match won");
            out.push(self.finish(Some(winner.number()), "king_destroyed"));
        } else if self.state.tick >= MATCH_TICK_LIMIT {
            info!(tick = self.state.tick, "Demo match timed out");
            out.push(self.finish(None, "timeout"));
        }
        out
    }

    fn finish(&mut self, winner: Option<u8>, reason: &str) -> ServerMsg {
        self.finished = true;
        ServerMsg::GameOver {
            winner,
            reason: Some(reason.to_string()),
        }
    }

    /// The side whose opponent lost their king, if any
    fn winner(&self) -> Option<Side> {
        [Side::One, Side::Two].into_iter().find(|side| {
            self.state
                .side(side.enemy())
                .towers
                .iter()
                .any(|t| t.kind == TowerKind::King && !t.is_alive())
        })
    }

    fn spawn_opponent(&mut self) {
        let side = self.client_side.enemy();
        let kind = DEPLOYABLE[self.rng.gen_range(0..DEPLOYABLE.len())];
        let x = self.rng.gen_range(40.0..ARENA_WIDTH - 40.0);
        let y = match side {
            Side::One => self.rng.gen_range(RIVER_END_Y + 40.0..800.0),
            Side::Two => self.rng.gen_range(200.0..RIVER_START_Y - 40.0),
        };
        if self.spawn_unit(side, kind, x, y) {
            debug!(?kind, x, y, "Opponent placed a unit");
        }
    }

    /// Drive the demo in real time until the match ends or the client goes away
    pub async fn run(
        mut self,
        seed: u64,
        outbound: mpsc::Sender<String>,
        mut inbound: mpsc::Receiver<String>,
    ) {
        info!(seed, "Demo server started");

        if send(&outbound, &self.greeting(seed)).await.is_err() {
            return;
        }

        let tick_duration = Duration::from_micros(1_000_000 / SERVER_TPS as u64);
        let mut tick_interval = interval(tick_duration);
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while !self.finished {
            tick_interval.tick().await;

            // Drain input queue
            while let Ok(text) = inbound.try_recv() {
                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => self.handle_client_msg(msg),
                    Err(e) => warn!(error = %e, "Failed to parse client message"),
                }
            }

            for msg in self.tick() {
                if send(&outbound, &msg).await.is_err() {
                    debug!("Client disconnected");
                    return;
                }
            }
        }

        info!(tick = self.state.tick, "Demo server finished");
    }
}

async fn send(outbound: &mpsc::Sender<String>, msg: &ServerMsg) -> Result<(), ()> {
    let text = serde_json::to_string(msg).map_err(|e| {
        warn!(error = %e, "Failed to encode server message");
    })?;
    outbound.send(text).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(seed: u64) -> DemoServer {
        let mut server = DemoServer::new(seed, Side::One, 3);
        let mut msgs = Vec::new();
        while !server.started {
            msgs.extend(server.tick());
        }
        assert!(matches!(msgs.as_slice(), [ServerMsg::GameStart { .. }]));
        server
    }

    #[test]
    fn placements_cost_resource_and_respect_deploy_zone() {
        let mut server = started(1);

        assert!(!server.spawn_unit(Side::One, UnitKind::Melee, 100.0, 300.0));
        assert!(server.spawn_unit(Side::One, UnitKind::Melee, 100.0, 700.0));
        assert_eq!(server.state().player1.resource, 2.0);
        assert!(!server.spawn_unit(Side::One, UnitKind::Single, 100.0, 700.0));
        assert_eq!(server.state().units.len(), 1);
    }

    #[test]
    fn snapshots_follow_the_interval() {
        let mut server = started(2);
        let snapshots = (0..9)
            .flat_map(|_| server.tick())
            .filter(|m| matches!(m, ServerMsg::GameState { .. }))
            .count();
        // Forced one right after start, then every third tick
        assert_eq!(snapshots, 3);
    }

    #[test]
    fn same_seed_same_battle() {
        let run = |seed| {
            let mut server = started(seed);
            for _ in 0..600 {
                server.tick();
            }
            server.state().clone()
        };
        assert_eq!(run(7), run(7));
    }

    #[test]
    fn fallen_king_ends_the_match() {
        let mut server = started(3);
        for tower in server.state.player2.towers.iter_mut() {
            tower.hp = 0;
        }

        let msgs = server.tick();

        assert!(server.is_finished());
        assert!(matches!(
            msgs.last(),
            Some(ServerMsg::GameOver { winner: Some(1), .. })
        ));
        assert!(server.tick().is_empty());
    }
}
