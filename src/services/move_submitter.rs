use ethers::{
    contract::ContractCall,
    middleware::SignerMiddleware,
    providers::{Http, Provider},
    signers::{LocalWallet, Signer},
    types::{Address, TransactionReceipt, H256, U256, U64},
};
use std::sync::Arc;

use crate::{
    board::{coord_to_index, PlayerRoles},
    config::Config,
    error::{AppError, Result},
    services::onchain::{GameReader, GoGame},
};

pub type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Advisory gate mirroring what the UI enforces: the signer must hold a
/// role and `turn()` must name it. The contract still has the final say.
pub fn check_move_gate(black: Address, white: Address, turn: Address, signer: Address) -> Result<()> {
    let roles = PlayerRoles::derive(black, white, Some(signer));
    if !roles.has_role() {
        return Err(AppError::MissingWalletOrRole(format!(
            "{:#x} is not a player in this game",
            signer
        )));
    }
    if turn != signer {
        return Err(AppError::MissingWalletOrRole(format!(
            "not {:#x}'s turn",
            signer
        )));
    }
    Ok(())
}

fn ensure_receipt_succeeded(receipt: Option<TransactionReceipt>, action: &str) -> Result<TransactionReceipt> {
    let receipt = receipt.ok_or_else(|| {
        AppError::TransactionFailed(format!("{} transaction dropped from mempool", action))
    })?;
    if receipt.status == Some(U64::zero()) {
        return Err(AppError::TransactionFailed(format!(
            "{} reverted in tx {:#x}",
            action, receipt.transaction_hash
        )));
    }
    Ok(receipt)
}

/// Submits `play` / `pass` through an external signer and waits for the
/// receipt. The board is not touched here; the resulting event drives the
/// next reconciliation.
pub struct MoveSubmitter {
    client: Arc<SignerClient>,
}

impl MoveSubmitter {
    pub fn from_config(config: &Config, provider: Arc<Provider<Http>>) -> Result<Option<Self>> {
        let Some(private_key) = config.player_private_key.as_deref() else {
            return Ok(None);
        };
        let wallet = private_key
            .trim()
            .trim_start_matches("0x")
            .parse::<LocalWallet>()
            .map_err(|e| AppError::Internal(format!("Invalid PLAYER_PRIVATE_KEY: {}", e)))?
            .with_chain_id(config.chain_id);

        tracing::info!("Move submission enabled for {:#x}", wallet.address());
        let client = SignerMiddleware::new((*provider).clone(), wallet);
        Ok(Some(Self {
            client: Arc::new(client),
        }))
    }

    pub fn address(&self) -> Address {
        self.client.address()
    }

    pub fn client(&self) -> Arc<SignerClient> {
        self.client.clone()
    }

    pub async fn ensure_can_move<R>(&self, reader: &R) -> Result<()>
    where
        R: GameReader + ?Sized,
    {
        let (black, white, turn) = tokio::try_join!(reader.black(), reader.white(), reader.turn())?;
        check_move_gate(black, white, turn, self.address())
    }

    pub async fn play<R>(&self, reader: &R, x: usize, y: usize) -> Result<H256>
    where
        R: GameReader + ?Sized,
    {
        coord_to_index(x, y)?;
        self.ensure_can_move(reader).await?;

        let contract = GoGame::new(reader.address(), self.client.clone());
        let call = contract.play(U256::from(x), U256::from(y));
        self.submit(call, "play").await
    }

    pub async fn pass<R>(&self, reader: &R) -> Result<H256>
    where
        R: GameReader + ?Sized,
    {
        self.ensure_can_move(reader).await?;

        let contract = GoGame::new(reader.address(), self.client.clone());
        let call = contract.pass();
        self.submit(call, "pass").await
    }

    pub(crate) async fn submit<D>(&self, call: ContractCall<SignerClient, D>, action: &str) -> Result<H256>
    where
        D: ethers::abi::Detokenize,
    {
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::TransactionFailed(e.to_string()))?;
        let tx_hash = pending.tx_hash();
        tracing::info!("Submitted {} tx {:#x}", action, tx_hash);

        let receipt = pending
            .await
            .map_err(|e| AppError::TransactionFailed(e.to_string()))?;
        let receipt = ensure_receipt_succeeded(receipt, action)?;
        tracing::info!(
            "Confirmed {} tx {:#x} in block {:?}",
            action,
            receipt.transaction_hash,
            receipt.block_number
        );
        Ok(receipt.transaction_hash)
    }

    pub(crate) async fn submit_for_receipt<D>(
        &self,
        call: ContractCall<SignerClient, D>,
        action: &str,
    ) -> Result<TransactionReceipt>
    where
        D: ethers::abi::Detokenize,
    {
        let pending = call
            .send()
            .await
            .map_err(|e| AppError::TransactionFailed(e.to_string()))?;
        let receipt = pending
            .await
            .map_err(|e| AppError::TransactionFailed(e.to_string()))?;
        ensure_receipt_succeeded(receipt, action)
    }
}
