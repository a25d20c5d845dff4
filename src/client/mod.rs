//! Client side of a match: transport seam, player intents, session loop

pub mod demo;
pub mod replay;
pub mod session;

use tokio::sync::mpsc;

use crate::game::state::UnitKind;
use crate::ws::protocol::{encode_client_msg, ClientMsg};

pub use session::{
    ClientSession, MatchPhase, RenderFrame, ResourceReadout, SessionHandle, SessionSummary,
};

/// Transport errors
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Transport channel closed")]
    Closed,

    #[error("Transport buffer full")]
    Full,

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Outbound half of a server connection
pub trait Transport: Send {
    fn send(&mut self, msg: ClientMsg) -> Result<(), TransportError>;
}

/// In-process transport that hands encoded text frames to a channel
pub struct ChannelTransport {
    tx: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(tx: mpsc::Sender<String>) -> Self {
        Self { tx }
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, msg: ClientMsg) -> Result<(), TransportError> {
        let text = encode_client_msg(&msg)?;
        self.tx.try_send(text).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => TransportError::Full,
            mpsc::error::TrySendError::Closed(_) => TransportError::Closed,
        })
    }
}

/// Something the local player wants to do
#[derive(Debug, Clone, PartialEq)]
pub enum Intent {
    JoinQueue,
    LeaveQueue,
    PlaceUnit { kind: UnitKind, x: f32, y: f32 },
}

/// Reasons an intent never reaches the server
#[derive(Debug, thiserror::Error)]
pub enum IntentError {
    #[error("No match in progress")]
    NoActiveMatch,

    #[error("Placement at ({x}, {y}) is outside the deploy zone")]
    OutsideDeployZone { x: f32, y: f32 },

    #[error("Too many placements, slow down")]
    RateLimited,

    #[error("Session is no longer running")]
    SessionClosed,

    #[error(transparent)]
    Transport(#[from] TransportError),
}
