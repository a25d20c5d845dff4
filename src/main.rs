//! Arena Client - headless driver for the prediction engine
//!
//! Feeds server messages into a client session, either from a JSON-lines
//! replay (`REPLAY_PATH`) or from a seeded in-process demo server, and logs
//! what the client would draw.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use arena_client::client::demo::DemoServer;
use arena_client::client::replay::{load_replay, play_replay};
use arena_client::client::{ChannelTransport, ClientSession, Intent, MatchPhase, SessionHandle};
use arena_client::config::Config;
use arena_client::game::rules::{ARENA_HEIGHT, ARENA_WIDTH};
use arena_client::game::state::{Side, UnitKind};
use arena_client::game::PredictionEngine;
use arena_client::util::time::{frame_interval, MonotonicClock};

/// How often the autopilot tries to place a unit
const AUTOPILOT_INTERVAL: Duration = Duration::from_millis(1500);
/// How often a frame summary is logged
const REPORT_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    init_tracing(&config.log_level);

    info!("Starting Arena Client");
    info!(
        frame_rate = config.frame_rate,
        snapshot_interval_ms = config.snapshot_interval.as_millis() as u64,
        "Client configured"
    );

    let (server_tx, server_rx) = mpsc::channel::<String>(256);
    let (client_tx, mut client_rx) = mpsc::channel::<String>(64);

    let engine = PredictionEngine::with_clock(MonotonicClock::new(), config.tuning);
    let (session, handle) = ClientSession::new(
        engine,
        ChannelTransport::new(client_tx),
        server_rx,
        frame_interval(config.frame_rate),
    );

    let feed = match &config.replay_path {
        Some(path) => {
            let entries = load_replay(path).await?;
            info!(path = %path.display(), entries = entries.len(), "Replaying recording");

            // Nobody is listening on the other end of a recording
            tokio::spawn(async move {
                while let Some(text) = client_rx.recv().await {
                    debug!(msg = %text, "Dropping outbound message during replay");
                }
            });
            tokio::spawn(play_replay(entries, server_tx, config.snapshot_interval))
        }
        None => {
            info!(seed = config.demo_seed, player = config.player.number(), "Running demo match");
            let server = DemoServer::new(
                config.demo_seed,
                config.player,
                config.snapshot_interval_ticks(),
            );
            tokio::spawn(server.run(config.demo_seed, server_tx, client_rx))
        }
    };

    let autopilot = tokio::spawn(autopilot(handle.clone(), config.demo_seed));
    let reporter = tokio::spawn(report(handle));
    let mut session_task = tokio::spawn(session.run());

    tokio::select! {
        summary = &mut session_task => {
            let summary = summary?;
            info!(
                frames = summary.frames,
                snapshots = summary.snapshots.total_snapshots,
                stale_snapshots = summary.snapshots.stale_snapshots,
                bytes = summary.snapshots.total_bytes,
                phase = ?summary.phase,
                winner = ?summary.winner,
                "Session complete"
            );
        }
        _ = shutdown_signal() => {
            session_task.abort();
        }
    }

    feed.abort();
    autopilot.abort();
    reporter.abort();

    info!("Client shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Stand-in for a player: places a random affordable unit on its own half
async fn autopilot(handle: SessionHandle, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
    let mut ticker = tokio::time::interval(AUTOPILOT_INTERVAL);

    loop {
        ticker.tick().await;

        let frame = handle.frame();
        let Some(side) = frame.player else {
            continue;
        };
        if frame.phase != MatchPhase::InProgress {
            continue;
        }

        let kind = match rng.gen_range(0..4) {
            0 => UnitKind::Melee,
            1 => UnitKind::Ranged,
            2 => UnitKind::Aoe,
            _ => UnitKind::Single,
        };
        let x = rng.gen_range(0.0..ARENA_WIDTH);
        // Picks on the opponent half are refused by the session
        let y = rng.gen_range(0.0..ARENA_HEIGHT);

        match handle.send_intent(Intent::PlaceUnit { kind, x, y }).await {
            Ok(()) => debug!(?kind, x, y, player = side.number(), "Autopilot placed a unit"),
            Err(e) => debug!(error = %e, "Autopilot placement rejected"),
        }
    }
}

/// Periodic summary of what the client would draw
async fn report(handle: SessionHandle) {
    let mut ticker = tokio::time::interval(REPORT_INTERVAL);

    loop {
        ticker.tick().await;

        let frame = handle.frame();
        let Some(state) = &frame.state else {
            debug!(frame = frame.frame, phase = ?frame.phase, "Waiting for first snapshot");
            continue;
        };

        let towers_standing = |side: Side| {
            state
                .side(side)
                .towers
                .iter()
                .filter(|t| t.is_alive())
                .count()
        };

        info!(
            frame = frame.frame,
            tick = state.tick,
            phase = ?frame.phase,
            units = state.units.len(),
            projectiles = state.projectiles.len(),
            flashing = frame.damage_flashes.len(),
            p1_resource = frame.resource(Side::One).display,
            p2_resource = frame.resource(Side::Two).display,
            p1_towers = towers_standing(Side::One),
            p2_towers = towers_standing(Side::Two),
            "Frame"
        );
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
