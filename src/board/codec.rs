//! Mapping between the contract's flat intersection storage and board coordinates.
//!
//! The contract stores the 19x19 board row-major: `index = y * 19 + x`.

use serde::{Deserialize, Serialize};

use crate::{
    constants::{BOARD_WIDTH, INTERSECTION_COUNT, STATE_BLACK, STATE_EMPTY, STATE_WHITE},
    error::{AppError, Result},
};

/// Stone color as game semantics; UI palettes are a rendering concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoneColor {
    Black,
    White,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: u8,
    pub y: u8,
}

impl Coord {
    pub fn new(x: usize, y: usize) -> Result<Self> {
        if x >= BOARD_WIDTH || y >= BOARD_WIDTH {
            return Err(AppError::OutOfRange {
                x: x as i64,
                y: y as i64,
            });
        }
        Ok(Self {
            x: x as u8,
            y: y as u8,
        })
    }

    /// Accepts client-supplied coordinates, which may be negative.
    pub fn from_signed(x: i64, y: i64) -> Result<Self> {
        match (usize::try_from(x), usize::try_from(y)) {
            (Ok(ux), Ok(uy)) => Self::new(ux, uy),
            _ => Err(AppError::OutOfRange { x, y }),
        }
    }
}

pub fn index_to_coord(index: usize) -> Result<Coord> {
    if index >= INTERSECTION_COUNT {
        return Err(AppError::IndexOutOfRange(index));
    }
    Coord::new(index % BOARD_WIDTH, index / BOARD_WIDTH)
}

pub fn coord_to_index(x: usize, y: usize) -> Result<usize> {
    let coord = Coord::new(x, y)?;
    Ok(coord.y as usize * BOARD_WIDTH + coord.x as usize)
}

/// Decodes the on-chain `State` enum. `Empty` has no color.
pub fn state_to_color(state: u8) -> Result<Option<StoneColor>> {
    match state {
        STATE_EMPTY => Ok(None),
        STATE_BLACK => Ok(Some(StoneColor::Black)),
        STATE_WHITE => Ok(Some(StoneColor::White)),
        other => Err(AppError::UnknownState(other)),
    }
}
