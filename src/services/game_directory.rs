use ethers::{
    contract::parse_log,
    providers::{Http, Provider},
    types::{Address, TransactionReceipt, U256},
};
use futures_util::future::try_join_all;
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    services::{
        move_submitter::MoveSubmitter,
        onchain::{u256_to_u64, GameCreatedFilter, GoFactory},
    },
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameListing {
    pub id: u64,
    pub address: Address,
}

/// Zero address marks a factory slot that was never filled.
pub fn collect_listings(addresses: Vec<Address>) -> Vec<GameListing> {
    addresses
        .into_iter()
        .enumerate()
        .filter(|(_, address)| !address.is_zero())
        .map(|(id, address)| GameListing {
            id: id as u64,
            address,
        })
        .collect()
}

pub async fn list_games(factory: &GoFactory<Provider<Http>>) -> Result<Vec<GameListing>> {
    let count = factory
        .game_count()
        .call()
        .await
        .map_err(|e| AppError::BlockchainRPC(format!("gameCount: {}", e)))?;
    let count = u256_to_u64(count, "gameCount")?;

    let addresses = try_join_all((0..count).map(|i| async move {
        factory
            .games(U256::from(i))
            .call()
            .await
            .map_err(|e| AppError::BlockchainRPC(format!("games({}): {}", i, e)))
    }))
    .await?;

    let listings = collect_listings(addresses);
    tracing::debug!("Factory lists {} games ({} slots)", listings.len(), count);
    Ok(listings)
}

fn created_game_address(receipt: &TransactionReceipt) -> Option<Address> {
    receipt
        .logs
        .iter()
        .find_map(|log| parse_log::<GameCreatedFilter>(log.clone()).ok())
        .map(|event| event.game_address)
}

/// Deploys a game between the signer and `opponent` and returns its address.
pub async fn create_game(
    submitter: &MoveSubmitter,
    factory_address: Address,
    opponent: Address,
) -> Result<Address> {
    if opponent.is_zero() {
        return Err(AppError::BadRequest("Invalid opponent address".to_string()));
    }
    let factory = GoFactory::new(factory_address, submitter.client());
    let call = factory.create_game(submitter.address(), opponent);
    let receipt = submitter.submit_for_receipt(call, "createGame").await?;

    let game = created_game_address(&receipt).ok_or_else(|| {
        AppError::TransactionFailed(format!(
            "createGame tx {:#x} emitted no GameCreated event",
            receipt.transaction_hash
        ))
    })?;
    tracing::info!("Created game {:#x} against {:#x}", game, opponent);
    Ok(game)
}
