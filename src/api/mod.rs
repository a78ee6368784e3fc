// src/api/mod.rs
pub mod games;
pub mod health;

use ethers::types::Address;
use std::sync::Arc;

use crate::{
    board::parse_address,
    config::Config,
    error::{AppError, Result},
    services::{EventBridge, EvmChain, MoveSubmitter, StateReconciler},
};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub chain: Arc<EvmChain>,
    pub reconciler: Arc<StateReconciler>,
    pub bridge: Arc<EventBridge>,
    pub submitter: Option<Arc<MoveSubmitter>>,
}

impl AppState {
    pub fn require_submitter(&self) -> Result<Arc<MoveSubmitter>> {
        self.submitter.clone().ok_or_else(|| {
            AppError::MissingWalletOrRole("no signer configured".to_string())
        })
    }
}

pub fn parse_game_address(raw: &str) -> Result<Address> {
    parse_address(raw).map_err(|_| AppError::InvalidGameAddress(raw.to_string()))
}

pub fn parse_viewer(raw: Option<&str>) -> Result<Option<Address>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => Ok(Some(parse_address(value)?)),
        None => Ok(None),
    }
}
