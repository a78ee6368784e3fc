use chrono::{DateTime, Utc};
use ethers::types::Address;
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use super::codec::{index_to_coord, state_to_color, Coord, StoneColor};
use crate::{
    constants::INTERSECTION_COUNT,
    error::{AppError, Result},
};

/// Scalar part of one reconciliation pass, read alongside the intersections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarReads {
    pub turn: Address,
    pub captured_white: u64,
    pub captured_black: u64,
    pub white_passed_once: bool,
    pub black_passed_once: bool,
}

/// Full reconciled state of one game. Rebuilt wholesale on every pass and
/// shared behind an `Arc`; nothing patches it in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    pub contract_address: Address,
    #[serde(rename = "stones", serialize_with = "serialize_stones")]
    pub board: BTreeMap<Coord, StoneColor>,
    pub turn_address: Address,
    pub captured_black: u64,
    pub captured_white: u64,
    pub black_passed_once: bool,
    pub white_passed_once: bool,
    pub move_count: usize,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct StoneEntry {
    x: u8,
    y: u8,
    color: StoneColor,
}

fn serialize_stones<S>(board: &BTreeMap<Coord, StoneColor>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(board.iter().map(|(c, color)| StoneEntry {
        x: c.x,
        y: c.y,
        color: *color,
    }))
}

impl BoardSnapshot {
    /// Assembles a snapshot from positionally ordered intersection states.
    pub fn from_reads(contract_address: Address, scalars: ScalarReads, states: &[u8]) -> Result<Self> {
        if states.len() != INTERSECTION_COUNT {
            return Err(AppError::Internal(format!(
                "expected {} intersections, got {}",
                INTERSECTION_COUNT,
                states.len()
            )));
        }

        let mut board = BTreeMap::new();
        for (index, state) in states.iter().enumerate() {
            if let Some(color) = state_to_color(*state)? {
                board.insert(index_to_coord(index)?, color);
            }
        }
        let move_count = board.len();

        Ok(Self {
            contract_address,
            board,
            turn_address: scalars.turn,
            captured_black: scalars.captured_black,
            captured_white: scalars.captured_white,
            black_passed_once: scalars.black_passed_once,
            white_passed_once: scalars.white_passed_once,
            move_count,
            fetched_at: Utc::now(),
        })
    }

    pub fn stone_at(&self, x: usize, y: usize) -> Option<StoneColor> {
        let coord = Coord::new(x, y).ok()?;
        self.board.get(&coord).copied()
    }

    /// Display hint only: stone-count parity, even means Black.
    /// `turn_address` stays the sole basis for gating moves.
    pub fn next_color_preview(&self) -> StoneColor {
        if self.move_count % 2 == 0 {
            StoneColor::Black
        } else {
            StoneColor::White
        }
    }
}

#[cfg(test)]
pub(crate) fn empty_states() -> Vec<u8> {
    vec![0; INTERSECTION_COUNT]
}

#[cfg(test)]
pub(crate) fn sample_scalars(turn: Address) -> ScalarReads {
    ScalarReads {
        turn,
        captured_white: 0,
        captured_black: 0,
        white_passed_once: false,
        black_passed_once: false,
    }
}
