use serde::Deserialize;
use std::env;
use url::Url;

use crate::constants::{
    CHAIN_ID_SEPOLIA, EVENT_MAX_BLOCKS_PER_TICK_DEFAULT, EVENT_POLL_INTERVAL_SECS_DEFAULT,
    RECONCILE_BATCH_SIZE_DEFAULT,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Blockchain
    pub ethereum_rpc_url: String,
    pub chain_id: u64,

    // Contract Addresses
    pub go_factory_address: Option<String>,

    // External signer
    pub player_private_key: Option<String>,

    // Reconciliation / event bridge
    pub reconcile_batch_size: usize,
    pub reconcile_max_inflight_batches: usize,
    pub event_poll_interval_secs: u64,
    pub event_max_blocks_per_tick: u64,

    // CORS
    pub cors_allowed_origins: String,
}

// Internal helper that supports `env_non_empty` operations.
fn env_non_empty(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            ethereum_rpc_url: env::var("ETHEREUM_RPC_URL")?,
            chain_id: env::var("CHAIN_ID")
                .unwrap_or_else(|_| CHAIN_ID_SEPOLIA.to_string())
                .parse()?,

            go_factory_address: env_non_empty("GO_FACTORY_ADDRESS"),
            player_private_key: env_non_empty("PLAYER_PRIVATE_KEY"),

            reconcile_batch_size: env::var("RECONCILE_BATCH_SIZE")
                .unwrap_or_else(|_| RECONCILE_BATCH_SIZE_DEFAULT.to_string())
                .parse()?,
            reconcile_max_inflight_batches: env::var("RECONCILE_MAX_INFLIGHT_BATCHES")
                .unwrap_or_else(|_| "0".to_string())
                .parse()?,
            event_poll_interval_secs: env::var("EVENT_POLL_INTERVAL_SECS")
                .unwrap_or_else(|_| EVENT_POLL_INTERVAL_SECS_DEFAULT.to_string())
                .parse()?,
            event_max_blocks_per_tick: env::var("EVENT_MAX_BLOCKS_PER_TICK")
                .unwrap_or_else(|_| EVENT_MAX_BLOCKS_PER_TICK_DEFAULT.to_string())
                .parse()?,

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.ethereum_rpc_url.trim().is_empty() {
            anyhow::bail!("ETHEREUM_RPC_URL is empty");
        }
        if let Err(e) = Url::parse(&self.ethereum_rpc_url) {
            anyhow::bail!("ETHEREUM_RPC_URL is not a valid URL: {}", e);
        }
        if self.reconcile_batch_size == 0 {
            anyhow::bail!("RECONCILE_BATCH_SIZE must be > 0");
        }
        if self.event_poll_interval_secs == 0 {
            anyhow::bail!("EVENT_POLL_INTERVAL_SECS must be > 0");
        }

        match self.go_factory_address.as_deref() {
            None => tracing::warn!("GO_FACTORY_ADDRESS not set; game discovery is disabled"),
            Some(addr) if addr.starts_with("0x0000000000") => {
                tracing::warn!("Using placeholder Go factory address")
            }
            Some(_) => {}
        }

        if self.player_private_key.is_none() {
            tracing::warn!("PLAYER_PRIVATE_KEY not set; move submission is disabled");
        }

        if self.event_max_blocks_per_tick == 0 {
            tracing::warn!("EVENT_MAX_BLOCKS_PER_TICK should be > 0");
        }

        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_testnet(&self) -> bool {
        if self.environment == "development" || self.environment == "testnet" {
            return true;
        }
        self.chain_id == CHAIN_ID_SEPOLIA
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 3000,
        environment: "development".to_string(),
        ethereum_rpc_url: "http://localhost:8545".to_string(),
        chain_id: CHAIN_ID_SEPOLIA,
        go_factory_address: None,
        player_private_key: None,
        reconcile_batch_size: RECONCILE_BATCH_SIZE_DEFAULT,
        reconcile_max_inflight_batches: 0,
        event_poll_interval_secs: EVENT_POLL_INTERVAL_SECS_DEFAULT,
        event_max_blocks_per_tick: EVENT_MAX_BLOCKS_PER_TICK_DEFAULT,
        cors_allowed_origins: "*".to_string(),
    }
}
