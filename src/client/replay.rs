//! JSON-lines recordings of server traffic

use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::ws::protocol::{decode_server_msg, ServerMsg};

/// Replay loading errors
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("Failed to read replay: {0}")]
    Io(#[from] std::io::Error),

    #[error("Line {line}: {source}")]
    Decode {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
}

/// One recorded server frame
#[derive(Debug, Clone)]
pub struct ReplayEntry {
    pub text: String,
    /// Snapshots are paced; everything else is delivered immediately
    pub is_snapshot: bool,
}

/// Parse a recording, one server message per non-blank line
pub fn parse_replay(contents: &str) -> Result<Vec<ReplayEntry>, ReplayError> {
    contents
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            let msg = decode_server_msg(line).map_err(|source| ReplayError::Decode {
                line: idx + 1,
                source,
            })?;
            Ok(ReplayEntry {
                text: line.trim().to_string(),
                is_snapshot: matches!(msg, ServerMsg::GameState { .. }),
            })
        })
        .collect()
}

pub async fn load_replay(path: &Path) -> Result<Vec<ReplayEntry>, ReplayError> {
    let contents = tokio::fs::read_to_string(path).await?;
    parse_replay(&contents)
}

/// Feed a recording into a session, one snapshot per `spacing`
pub async fn play_replay(
    entries: Vec<ReplayEntry>,
    outbound: mpsc::Sender<String>,
    spacing: Duration,
) {
    info!(entries = entries.len(), "Replay started");

    for entry in entries {
        if entry.is_snapshot {
            tokio::time::sleep(spacing).await;
        }
        if outbound.send(entry.text).await.is_err() {
            debug!("Session went away, stopping replay");
            return;
        }
    }

    info!("Replay finished");
}
