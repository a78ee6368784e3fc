use serde::{Deserialize, Serialize};

use crate::board::{BoardSnapshot, PlayerRoles, StoneColor, TurnStatus};

#[derive(Debug, Deserialize, Default)]
pub struct ViewerQuery {
    pub viewer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlayRequest {
    pub x: i64,
    pub y: i64,
}

#[derive(Debug, Deserialize)]
pub struct CreateGameRequest {
    pub opponent: String,
}

#[derive(Debug, Serialize)]
pub struct CreateGameResponse {
    pub game_address: String,
}

#[derive(Debug, Serialize)]
pub struct TxResponse {
    pub tx_hash: String,
}

/// Snapshot plus the viewer-specific flags a client needs to render and gate.
#[derive(Debug, Serialize)]
pub struct GameStateResponse {
    #[serde(flatten)]
    pub snapshot: BoardSnapshot,
    #[serde(flatten)]
    pub roles: PlayerRoles,
    #[serde(flatten)]
    pub turn: TurnStatus,
    /// Parity hint only; never used to gate submission.
    pub preview_next_color: StoneColor,
}

impl GameStateResponse {
    pub fn new(snapshot: BoardSnapshot, roles: PlayerRoles, turn: TurnStatus) -> Self {
        let preview_next_color = snapshot.next_color_preview();
        Self {
            snapshot,
            roles,
            turn,
            preview_next_color,
        }
    }
}
