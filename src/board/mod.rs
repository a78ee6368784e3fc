pub mod codec;
pub mod render;
pub mod snapshot;
pub mod turn;

pub use codec::{coord_to_index, Coord, StoneColor};
pub use snapshot::{BoardSnapshot, ScalarReads};
pub use turn::{normalize_address, parse_address, PlayerRoles, TurnStatus};
