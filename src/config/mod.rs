//! Configuration module - environment variable parsing

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::game::reconcile::Tuning;
use crate::game::state::Side;
use crate::util::time::{DEFAULT_FRAME_RATE, SERVER_TPS};

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Frames rendered per second
    pub frame_rate: u32,

    /// JSON-lines recording of server messages to replay instead of the demo
    pub replay_path: Option<PathBuf>,
    /// Spacing between snapshots, both for replay pacing and the demo server
    pub snapshot_interval: Duration,
    /// Seed for the demo server and the autopilot
    pub demo_seed: u64,
    /// Which side the local player controls in the demo
    pub player: Side,

    /// Reconciliation thresholds
    pub tuning: Tuning,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Tuning::default();

        let player_num: u8 = parse_or("PLAYER_NUM", 1)?;
        let player = Side::try_from(player_num).map_err(|_| ConfigError::Invalid {
            key: "PLAYER_NUM",
            value: player_num.to_string(),
        })?;

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            frame_rate: parse_or("FRAME_RATE", DEFAULT_FRAME_RATE)?,

            replay_path: env::var("REPLAY_PATH").ok().map(PathBuf::from),
            snapshot_interval: Duration::from_millis(parse_or("SNAPSHOT_INTERVAL_MS", 50)?),
            demo_seed: parse_or("DEMO_SEED", 7)?,
            player,

            tuning: Tuning {
                snap_epsilon: parse_or("POSITION_SNAP_EPSILON", defaults.snap_epsilon)?,
                teleport_threshold: parse_or(
                    "POSITION_TELEPORT_THRESHOLD",
                    defaults.teleport_threshold,
                )?,
                position_blend: parse_or("POSITION_BLEND", defaults.position_blend)?,
                resource_blend: parse_or("RESOURCE_BLEND", defaults.resource_blend)?,
                missing_unit_threshold: parse_or(
                    "MISSING_UNIT_THRESHOLD",
                    defaults.missing_unit_threshold,
                )?,
                revive_confirm_frames: parse_or(
                    "REVIVE_CONFIRM_FRAMES",
                    defaults.revive_confirm_frames,
                )?,
                max_frame_gap: Duration::from_millis(parse_or(
                    "MAX_FRAME_GAP_MS",
                    defaults.max_frame_gap.as_millis() as u64,
                )?),
            },
        })
    }

    /// Snapshot spacing in server ticks, at least one
    pub fn snapshot_interval_ticks(&self) -> u32 {
        let ticks = self.snapshot_interval.as_millis() as u64 * SERVER_TPS as u64 / 1000;
        ticks.clamp(1, u32::MAX as u64) as u32
    }
}

/// Read `key`, falling back to `default` when unset
fn parse_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { key, value }),
        Err(env::VarError::NotPresent) => Ok(default),
        Err(env::VarError::NotUnicode(raw)) => Err(ConfigError::Invalid {
            key,
            value: raw.to_string_lossy().into_owned(),
        }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}")]
    Invalid { key: &'static str, value: String },
}
