//! Client session loop
//!
//! A single task owns the engine. Server messages, player intents and frame
//! ticks are handled one at a time from one `select!`, so a snapshot merge
//! can never land in the middle of a step.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, trace, warn};

use super::{Intent, IntentError, Transport};
use crate::game::rules::{clamp_to_arena, is_in_deploy_zone};
use crate::game::snapshot::SnapshotStats;
use crate::game::state::{BattleState, Side};
use crate::game::{PredictionEngine, ResourceGauge, VisualSmoother};
use crate::util::rate_limit::IntentRateLimiter;
use crate::util::time::Clock;
use crate::ws::protocol::{decode_server_msg, ClientMsg, ServerMsg, Snapshot};

/// Where the local player is in the match lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchPhase {
    #[default]
    Waiting,
    Countdown,
    InProgress,
    Ended,
}

/// HUD resource values for one player
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ResourceReadout {
    /// Whole units shown as a number
    pub display: u32,
    /// Bar fill in [0, 1]
    pub fill: f32,
}

/// Everything presentation needs for one frame
#[derive(Debug, Clone, Default)]
pub struct RenderFrame {
    pub frame: u64,
    pub phase: MatchPhase,
    pub player: Option<Side>,
    /// Smoothed state, absent until the first snapshot
    pub state: Option<BattleState>,
    /// Flash intensity per entity id, only entities currently flashing
    pub damage_flashes: HashMap<String, f32>,
    pub resources: [ResourceReadout; 2],
    pub winner: Option<u8>,
}

impl RenderFrame {
    pub fn resource(&self, side: Side) -> ResourceReadout {
        self.resources[side_index(side)]
    }
}

fn side_index(side: Side) -> usize {
    match side {
        Side::One => 0,
        Side::Two => 1,
    }
}

struct IntentRequest {
    intent: Intent,
    reply: oneshot::Sender<Result<(), IntentError>>,
}

/// Cheap handle for talking to a running session
#[derive(Clone)]
pub struct SessionHandle {
    intents: mpsc::Sender<IntentRequest>,
    frame: Arc<RwLock<RenderFrame>>,
}

impl SessionHandle {
    /// Submit an intent and wait for the session's verdict
    pub async fn send_intent(&self, intent: Intent) -> Result<(), IntentError> {
        let (reply, verdict) = oneshot::channel();
        self.intents
            .send(IntentRequest { intent, reply })
            .await
            .map_err(|_| IntentError::SessionClosed)?;
        verdict.await.map_err(|_| IntentError::SessionClosed)?
    }

    /// Latest published frame
    pub fn frame(&self) -> RenderFrame {
        self.frame.read().clone()
    }
}

/// Totals reported when a session ends
#[derive(Debug, Clone, Default)]
pub struct SessionSummary {
    pub frames: u64,
    pub snapshots: SnapshotStats,
    pub phase: MatchPhase,
    pub winner: Option<u8>,
}

pub struct ClientSession<C: Clock, T: Transport> {
    engine: PredictionEngine<C>,
    smoother: VisualSmoother,
    gauges: [ResourceGauge; 2],
    transport: T,
    limiter: IntentRateLimiter,
    phase: MatchPhase,
    player: Option<Side>,
    room_id: Option<String>,
    winner: Option<u8>,
    stats: SnapshotStats,
    frames: u64,
    frame_interval: Duration,
    frame: Arc<RwLock<RenderFrame>>,
    inbound: mpsc::Receiver<String>,
    intents: mpsc::Receiver<IntentRequest>,
}

impl<C: Clock, T: Transport> ClientSession<C, T> {
    /// Create a session reading raw server text frames from `inbound`
    pub fn new(
        engine: PredictionEngine<C>,
        transport: T,
        inbound: mpsc::Receiver<String>,
        frame_interval: Duration,
    ) -> (Self, SessionHandle) {
        let (intent_tx, intent_rx) = mpsc::channel(32);
        let frame = Arc::new(RwLock::new(RenderFrame::default()));

        let handle = SessionHandle {
            intents: intent_tx,
            frame: frame.clone(),
        };

        let session = Self {
            engine,
            smoother: VisualSmoother::new(),
            gauges: [ResourceGauge::new(), ResourceGauge::new()],
            transport,
            limiter: IntentRateLimiter::new(),
            phase: MatchPhase::Waiting,
            player: None,
            room_id: None,
            winner: None,
            stats: SnapshotStats::default(),
            frames: 0,
            frame_interval,
            frame,
            inbound,
            intents: intent_rx,
        };

        (session, handle)
    }

    /// Replace the placement throttle
    pub fn with_limiter(mut self, limiter: IntentRateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    /// Run until the server stream closes
    pub async fn run(mut self) -> SessionSummary {
        info!("Session started");

        let mut frame_interval = interval(self.frame_interval);
        frame_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = frame_interval.tick() => self.on_frame(),
                inbound = self.inbound.recv() => match inbound {
                    Some(text) => self.on_server_text(&text),
                    None => {
                        info!("Server stream closed");
                        break;
                    }
                },
                Some(request) = self.intents.recv() => {
                    let verdict = self.handle_intent(request.intent);
                    let _ = request.reply.send(verdict);
                }
            }
        }

        self.on_frame();
        info!(
            frames = self.frames,
            snapshots = self.stats.total_snapshots,
            "Session finished"
        );

        SessionSummary {
            frames: self.frames,
            snapshots: self.stats,
            phase: self.phase,
            winner: self.winner,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn player(&self) -> Option<Side> {
        self.player
    }

    pub fn room_id(&self) -> Option<&str> {
        self.room_id.as_deref()
    }

    pub fn engine(&self) -> &PredictionEngine<C> {
        &self.engine
    }

    pub fn stats(&self) -> &SnapshotStats {
        &self.stats
    }

    /// Decode and apply one raw server frame
    pub fn on_server_text(&mut self, text: &str) {
        match decode_server_msg(text) {
            Ok(ServerMsg::GameState { game_state }) => {
                self.stats.record(&game_state, text.len());
                self.apply_game_state(&game_state);
            }
            Ok(msg) => self.on_server_msg(msg),
            Err(e) => {
                warn!(error = %e, "Ignoring undecodable server message");
            }
        }
    }

    pub fn on_server_msg(&mut self, msg: ServerMsg) {
        match msg {
            ServerMsg::MatchFound {
                room_id,
                player_num,
                opponent_id,
            } => {
                self.room_id = room_id;
                self.player = player_num.and_then(|n| Side::try_from(n).ok());
                self.winner = None;
                self.phase = MatchPhase::Countdown;
                self.clear_battle();
                // Ticks restart with every match
                self.stats.last_tick = None;
                info!(
                    room_id = ?self.room_id,
                    player = ?self.player,
                    opponent_id = ?opponent_id,
                    "Match found"
                );
            }
            ServerMsg::GameStart {
                room_id,
                player_num,
            } => {
                if room_id.is_some() {
                    self.room_id = room_id;
                }
                if let Some(side) = player_num.and_then(|n| Side::try_from(n).ok()) {
                    self.player = Some(side);
                }
                self.phase = MatchPhase::InProgress;
                info!(room_id = ?self.room_id, player = ?self.player, "Game started");
            }
            ServerMsg::GameState { game_state } => {
                self.stats.record(&game_state, 0);
                self.apply_game_state(&game_state);
            }
            ServerMsg::GameOver { winner, reason } => {
                self.winner = winner;
                self.phase = MatchPhase::Ended;
                self.clear_battle();
                info!(winner = ?winner, reason = ?reason, "Game over");
            }
            ServerMsg::Error { error } => {
                warn!(error = error.as_deref().unwrap_or("unknown"), "Server reported an error");
            }
            ServerMsg::JoinQueue | ServerMsg::LeaveQueue => {
                debug!("Queue acknowledged");
            }
        }
    }

    fn apply_game_state(&mut self, snapshot: &Snapshot) {
        if self.phase == MatchPhase::Ended {
            debug!(tick = snapshot.tick, "Ignoring snapshot after game over");
            return;
        }
        self.engine.apply_snapshot(snapshot);
    }

    fn clear_battle(&mut self) {
        self.engine.reset();
        self.smoother.reset();
        self.gauges.iter_mut().for_each(ResourceGauge::reset);
    }

    /// Validate an intent and forward it to the server
    pub fn handle_intent(&mut self, intent: Intent) -> Result<(), IntentError> {
        match intent {
            Intent::JoinQueue => self.transport.send(ClientMsg::JoinQueue)?,
            Intent::LeaveQueue => self.transport.send(ClientMsg::LeaveQueue)?,
            Intent::PlaceUnit { kind, x, y } => {
                let side = match (self.phase, self.player) {
                    (MatchPhase::InProgress, Some(side)) => side,
                    _ => return Err(IntentError::NoActiveMatch),
                };

                let (x, y) = clamp_to_arena(x, y);
                if !is_in_deploy_zone(side, x, y) {
                    warn!(x, y, player = side.number(), "Placement outside deploy zone");
                    return Err(IntentError::OutsideDeployZone { x, y });
                }

                if !self.limiter.check_placement() {
                    warn!(player = side.number(), "Placement rate limited");
                    return Err(IntentError::RateLimited);
                }

                self.transport.send(ClientMsg::SpawnUnit {
                    card_type: kind,
                    x,
                    y,
                })?;
                debug!(?kind, x, y, "Placement sent");
            }
        }
        Ok(())
    }

    /// Step, smooth and publish one frame
    pub fn on_frame(&mut self) {
        self.frames += 1;
        let now = self.engine.now();

        let smoother = &mut self.smoother;
        let state = self.engine.step().map(|state| smoother.smooth(state));

        let mut resources = [ResourceReadout::default(); 2];
        for side in [Side::One, Side::Two] {
            let gauge = &mut self.gauges[side_index(side)];
            if let Some(amount) = self.engine.resource(side) {
                gauge.sample(amount, now);
            }
            resources[side_index(side)] = ResourceReadout {
                display: gauge.display(),
                fill: gauge.fill(),
            };
        }

        let frame = RenderFrame {
            frame: self.frames,
            phase: self.phase,
            player: self.player,
            state,
            damage_flashes: self.engine.damage_flashes(),
            resources,
            winner: self.winner,
        };

        trace!(frame = frame.frame, "Publishing frame");
        *self.frame.write() = frame;
    }
}
