use ethers::{
    contract::parse_log,
    types::{Address, Log},
};
use serde::Serialize;

use crate::services::onchain::{CaptureFilter, EndFilter, MoveFilter};

/// A game contract log, decoded as far as this service cares.
/// Any variant is a signal to re-run reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum GameEvent {
    Move {
        player: Address,
        x: String,
        y: String,
    },
    Capture {
        player: Address,
        count: String,
    },
    End {
        result: String,
        black_score: String,
        white_score: String,
    },
    /// Emitted by the watched contract but not one of the known events.
    Unknown,
}

impl GameEvent {
    pub fn name(&self) -> &'static str {
        match self {
            GameEvent::Move { .. } => "Move",
            GameEvent::Capture { .. } => "Capture",
            GameEvent::End { .. } => "End",
            GameEvent::Unknown => "Unknown",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GameEvent::End { .. })
    }
}

/// Decodes a game contract log.
pub fn parse_game_log(log: &Log) -> GameEvent {
    if let Ok(ev) = parse_log::<MoveFilter>(log.clone()) {
        return GameEvent::Move {
            player: ev.player,
            x: ev.x.to_string(),
            y: ev.y.to_string(),
        };
    }
    if let Ok(ev) = parse_log::<CaptureFilter>(log.clone()) {
        return GameEvent::Capture {
            player: ev.player,
            count: ev.count.to_string(),
        };
    }
    if let Ok(ev) = parse_log::<EndFilter>(log.clone()) {
        return GameEvent::End {
            result: ev.result,
            black_score: ev.black_score.to_string(),
            white_score: ev.white_score.to_string(),
        };
    }
    GameEvent::Unknown
}
