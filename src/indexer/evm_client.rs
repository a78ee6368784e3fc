use ethers::{
    providers::{Http, Middleware, Provider},
    types::{Address, Filter},
};
use std::sync::Arc;

use super::event_parser::{parse_game_log, GameEvent};
use crate::error::{AppError, Result};

/// Log feed for game contracts, polled by the event bridge.
#[async_trait::async_trait]
pub trait GameLogSource: Send + Sync {
    async fn head_block(&self) -> Result<u64>;
    async fn game_events(&self, game: Address, from_block: u64, to_block: u64) -> Result<Vec<GameEvent>>;
}

/// EVM JSON-RPC client
pub struct EvmLogClient {
    provider: Arc<Provider<Http>>,
}

impl EvmLogClient {
    pub fn new(provider: Arc<Provider<Http>>) -> Self {
        Self { provider }
    }
}

fn game_filter(game: Address, from_block: u64, to_block: u64) -> Filter {
    Filter::new()
        .address(game)
        .from_block(from_block)
        .to_block(to_block)
}

#[async_trait::async_trait]
impl GameLogSource for EvmLogClient {
    /// Get current block number
    async fn head_block(&self) -> Result<u64> {
        let number = self
            .provider
            .get_block_number()
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(number.as_u64())
    }

    /// Get decoded events for a game contract, in log order
    async fn game_events(&self, game: Address, from_block: u64, to_block: u64) -> Result<Vec<GameEvent>> {
        let logs = self
            .provider
            .get_logs(&game_filter(game, from_block, to_block))
            .await
            .map_err(|e| AppError::BlockchainRPC(e.to_string()))?;
        Ok(logs.iter().map(parse_game_log).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_targets_game_and_range() {
        let game = Address::from([1u8; 20]);
        let filter = game_filter(game, 10, 20);
        let serialized = serde_json::to_value(&filter).unwrap();
        assert_eq!(
            serialized["address"],
            serde_json::json!(format!("{:#x}", game))
        );
        assert_eq!(serialized["fromBlock"], "0xa");
        assert_eq!(serialized["toBlock"], "0x14");
    }
}
