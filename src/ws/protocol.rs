//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};

use crate::game::state::{null_as_empty, PlayerSide, Projectile, Unit, UnitKind};

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMsg {
    /// Enter the matchmaking queue
    JoinQueue,

    /// Leave the matchmaking queue
    LeaveQueue,

    /// Place a unit on the arena
    SpawnUnit {
        #[serde(rename = "cardType")]
        card_type: UnitKind,
        x: f32,
        y: f32,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerMsg {
    /// Queue acknowledgements, nothing to do client-side
    JoinQueue,
    LeaveQueue,

    /// Opponent found, room assigned
    MatchFound {
        #[serde(rename = "roomId", default)]
        room_id: Option<String>,
        #[serde(rename = "playerNum", default)]
        player_num: Option<u8>,
        #[serde(rename = "opponentId", default)]
        opponent_id: Option<String>,
    },

    /// Battle begins
    GameStart {
        #[serde(rename = "roomId", default)]
        room_id: Option<String>,
        #[serde(rename = "playerNum", default)]
        player_num: Option<u8>,
    },

    /// Authoritative snapshot (sent at regular intervals)
    GameState {
        #[serde(rename = "gameState")]
        game_state: Snapshot,
    },

    /// Match has ended
    GameOver {
        #[serde(default)]
        winner: Option<u8>,
        #[serde(default)]
        reason: Option<String>,
    },

    /// Error message
    Error {
        #[serde(default)]
        error: Option<String>,
    },
}

impl ServerMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            ServerMsg::JoinQueue => "JOIN_QUEUE",
            ServerMsg::LeaveQueue => "LEAVE_QUEUE",
            ServerMsg::MatchFound { .. } => "MATCH_FOUND",
            ServerMsg::GameStart { .. } => "GAME_START",
            ServerMsg::GameState { .. } => "GAME_STATE",
            ServerMsg::GameOver { .. } => "GAME_OVER",
            ServerMsg::Error { .. } => "ERROR",
        }
    }
}

/// Full battle state at a server tick.
///
/// Every collection tolerates being absent. A missing player side means
/// that side is left untouched during reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub tick: u64,
    #[serde(default)]
    pub player1: Option<PlayerSide>,
    #[serde(default)]
    pub player2: Option<PlayerSide>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub units: Vec<Unit>,
    /// Server-side projectiles. Presentation only, never reconciled.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub projectiles: Vec<Projectile>,
}

/// Decode a raw text frame from the server
pub fn decode_server_msg(text: &str) -> Result<ServerMsg, serde_json::Error> {
    serde_json::from_str(text)
}

/// Encode a client message for the wire
pub fn encode_client_msg(msg: &ClientMsg) -> Result<String, serde_json::Error> {
    serde_json::to_string(msg)
}
