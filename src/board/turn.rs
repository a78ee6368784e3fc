use ethers::types::Address;
use serde::Serialize;
use std::str::FromStr;

use super::snapshot::BoardSnapshot;
use crate::error::{AppError, Result};

/// Parses an address in any hex casing. `Address` equality is byte-wise,
/// so parsed addresses compare case-insensitively.
pub fn parse_address(raw: &str) -> Result<Address> {
    let trimmed = raw.trim();
    if !(trimmed.starts_with("0x") || trimmed.starts_with("0X")) || trimmed.len() != 42 {
        return Err(AppError::BadRequest(format!("Invalid EVM address: {}", raw)));
    }
    Address::from_str(&trimmed[2..])
        .map_err(|_| AppError::BadRequest(format!("Invalid EVM address: {}", raw)))
}

/// Canonical lowercase `0x` form.
pub fn normalize_address(address: &Address) -> String {
    format!("{:#x}", address)
}

/// Viewer role flags, computed once per session from `black()` / `white()`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlayerRoles {
    pub is_black_player: bool,
    pub is_white_player: bool,
}

impl PlayerRoles {
    pub fn derive(black: Address, white: Address, viewer: Option<Address>) -> Self {
        match viewer {
            Some(viewer) => Self {
                is_black_player: viewer == black,
                is_white_player: viewer == white,
            },
            None => Self::default(),
        }
    }

    pub fn has_role(&self) -> bool {
        self.is_black_player || self.is_white_player
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TurnStatus {
    pub is_my_turn: bool,
    pub can_submit: bool,
}

impl TurnStatus {
    /// UI gate only; the contract remains the authority on legality.
    pub fn derive(snapshot: &BoardSnapshot, roles: PlayerRoles, viewer: Option<Address>) -> Self {
        let is_my_turn = viewer.is_some_and(|v| v == snapshot.turn_address);
        Self {
            is_my_turn,
            can_submit: is_my_turn && roles.has_role(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::snapshot::{empty_states, sample_scalars};

    fn addr(byte: u8) -> Address {
        Address::from([byte; 20])
    }

    #[test]
    fn parse_address_ignores_case() {
        let lower = parse_address("0xabcdefabcdefabcdefabcdefabcdefabcdefabcd").unwrap();
        let upper = parse_address("0xABCDEFABCDEFABCDEFABCDEFABCDEFABCDEFABCD").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(
            normalize_address(&upper),
            "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd"
        );
    }

    #[test]
    fn parse_address_rejects_garbage() {
        assert!(parse_address("abcdef").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xzzcdefabcdefabcdefabcdefabcdefabcdefabcd").is_err());
    }

    #[test]
    fn roles_follow_viewer() {
        let roles = PlayerRoles::derive(addr(1), addr(2), Some(addr(1)));
        assert!(roles.is_black_player);
        assert!(!roles.is_white_player);
        assert!(!PlayerRoles::derive(addr(1), addr(2), None).has_role());
    }

    #[test]
    fn not_my_turn_disables_submission_even_with_role() {
        let snapshot =
            BoardSnapshot::from_reads(addr(9), sample_scalars(addr(2)), &empty_states()).unwrap();
        let roles = PlayerRoles::derive(addr(1), addr(2), Some(addr(1)));
        let status = TurnStatus::derive(&snapshot, roles, Some(addr(1)));
        assert!(!status.is_my_turn);
        assert!(!status.can_submit);
    }

    #[test]
    fn my_turn_without_role_still_cannot_submit() {
        let snapshot =
            BoardSnapshot::from_reads(addr(9), sample_scalars(addr(3)), &empty_states()).unwrap();
        let status = TurnStatus::derive(&snapshot, PlayerRoles::default(), Some(addr(3)));
        assert!(status.is_my_turn);
        assert!(!status.can_submit);
    }

    #[test]
    fn parity_preview_never_grants_turn() {
        // empty board previews Black, but turn() says White is to move
        let snapshot =
            BoardSnapshot::from_reads(addr(9), sample_scalars(addr(2)), &empty_states()).unwrap();
        let roles = PlayerRoles::derive(addr(1), addr(2), Some(addr(1)));
        assert_eq!(snapshot.next_color_preview(), crate::board::StoneColor::Black);
        assert!(!TurnStatus::derive(&snapshot, roles, Some(addr(1))).can_submit);
    }
}
