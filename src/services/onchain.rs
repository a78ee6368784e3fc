use ethers::{
    providers::{Http, Provider},
    types::{Address, U256},
};
use std::sync::Arc;

use crate::{
    board::parse_address,
    config::Config,
    error::{AppError, Result},
    indexer::evm_client::EvmLogClient,
};

ethers::contract::abigen!(
    GoGame,
    r#"[
        function WIDTH() view returns (uint256)
        function white() view returns (address)
        function black() view returns (address)
        function turn() view returns (address)
        function capturedWhiteStones() view returns (uint256)
        function capturedBlackStones() view returns (uint256)
        function whitePassedOnce() view returns (bool)
        function blackPassedOnce() view returns (bool)
        function intersections(uint256) view returns (uint256, uint256, uint8)
        function play(uint256 x, uint256 y)
        function pass()
        event Move(address indexed player, uint256 x, uint256 y)
        event Capture(address indexed player, uint256 count)
        event End(string result, uint256 blackScore, uint256 whiteScore)
    ]"#
);

ethers::contract::abigen!(
    GoFactory,
    r#"[
        function gameCount() view returns (uint256)
        function games(uint256) view returns (address)
        function createGame(address player1, address player2) returns (address)
        event GameCreated(address gameAddress)
    ]"#
);

/// Read surface of one deployed game contract.
#[async_trait::async_trait]
pub trait GameReader: Send + Sync {
    fn address(&self) -> Address;
    async fn width(&self) -> Result<u64>;
    async fn black(&self) -> Result<Address>;
    async fn white(&self) -> Result<Address>;
    async fn turn(&self) -> Result<Address>;
    async fn captured_white_stones(&self) -> Result<u64>;
    async fn captured_black_stones(&self) -> Result<u64>;
    async fn white_passed_once(&self) -> Result<bool>;
    async fn black_passed_once(&self) -> Result<bool>;
    /// Raw `state` field of `intersections(index)`.
    async fn intersection_state(&self, index: usize) -> Result<u8>;
}

/// Shared HTTP provider plus the configured factory.
pub struct EvmChain {
    provider: Arc<Provider<Http>>,
    factory_address: Option<Address>,
}

impl EvmChain {
    pub fn from_config(config: &Config) -> Result<Self> {
        let provider = Provider::<Http>::try_from(config.ethereum_rpc_url.as_str())
            .map_err(|e| AppError::Internal(format!("Invalid EVM RPC URL: {}", e)))?;
        let factory_address = config
            .go_factory_address
            .as_deref()
            .map(parse_address)
            .transpose()?;
        Ok(Self {
            provider: Arc::new(provider),
            factory_address,
        })
    }

    pub fn provider(&self) -> Arc<Provider<Http>> {
        self.provider.clone()
    }

    pub fn game(&self, address: Address) -> EvmGameReader {
        EvmGameReader {
            contract: GoGame::new(address, self.provider.clone()),
        }
    }

    pub fn log_source(&self) -> EvmLogClient {
        EvmLogClient::new(self.provider.clone())
    }

    pub fn factory_address(&self) -> Result<Address> {
        self.factory_address
            .ok_or_else(|| AppError::BadRequest("GO_FACTORY_ADDRESS is not configured".to_string()))
    }

    pub fn factory(&self) -> Result<GoFactory<Provider<Http>>> {
        Ok(GoFactory::new(self.factory_address()?, self.provider.clone()))
    }
}

pub struct EvmGameReader {
    contract: GoGame<Provider<Http>>,
}

// Internal helper that maps contract call failures for `rpc_error`.
fn rpc_error(method: &str, err: impl std::fmt::Display) -> AppError {
    AppError::BlockchainRPC(format!("{}: {}", method, err))
}

#[async_trait::async_trait]
impl GameReader for EvmGameReader {
    fn address(&self) -> Address {
        self.contract.address()
    }

    async fn width(&self) -> Result<u64> {
        let value = self
            .contract
            .width()
            .call()
            .await
            .map_err(|e| rpc_error("WIDTH", e))?;
        u256_to_u64(value, "WIDTH")
    }

    async fn black(&self) -> Result<Address> {
        self.contract
            .black()
            .call()
            .await
            .map_err(|e| rpc_error("black", e))
    }

    async fn white(&self) -> Result<Address> {
        self.contract
            .white()
            .call()
            .await
            .map_err(|e| rpc_error("white", e))
    }

    async fn turn(&self) -> Result<Address> {
        self.contract
            .turn()
            .call()
            .await
            .map_err(|e| rpc_error("turn", e))
    }

    async fn captured_white_stones(&self) -> Result<u64> {
        let value = self
            .contract
            .captured_white_stones()
            .call()
            .await
            .map_err(|e| rpc_error("capturedWhiteStones", e))?;
        u256_to_u64(value, "capturedWhiteStones")
    }

    async fn captured_black_stones(&self) -> Result<u64> {
        let value = self
            .contract
            .captured_black_stones()
            .call()
            .await
            .map_err(|e| rpc_error("capturedBlackStones", e))?;
        u256_to_u64(value, "capturedBlackStones")
    }

    async fn white_passed_once(&self) -> Result<bool> {
        self.contract
            .white_passed_once()
            .call()
            .await
            .map_err(|e| rpc_error("whitePassedOnce", e))
    }

    async fn black_passed_once(&self) -> Result<bool> {
        self.contract
            .black_passed_once()
            .call()
            .await
            .map_err(|e| rpc_error("blackPassedOnce", e))
    }

    async fn intersection_state(&self, index: usize) -> Result<u8> {
        let (_x, _y, state) = self
            .contract
            .intersections(U256::from(index))
            .call()
            .await
            .map_err(|e| rpc_error(&format!("intersections({})", index), e))?;
        Ok(state)
    }
}

pub fn u256_to_u64(value: U256, field: &str) -> Result<u64> {
    if value > U256::from(u64::MAX) {
        return Err(AppError::BlockchainRPC(format!(
            "On-chain value out of range for {} (expected u64)",
            field
        )));
    }
    Ok(value.as_u64())
}
