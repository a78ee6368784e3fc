use axum::{extract::State, Json};
use ethers::providers::Middleware;
use serde::Serialize;

use super::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub rpc: String,
    pub block_number: Option<u64>,
    pub signer: Option<String>,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let block_number = state
        .chain
        .provider()
        .get_block_number()
        .await
        .ok()
        .map(|n| n.as_u64());
    let rpc_status = if block_number.is_some() {
        "connected".to_string()
    } else {
        "disconnected".to_string()
    };

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        rpc: rpc_status,
        block_number,
        signer: state
            .submitter
            .as_ref()
            .map(|s| crate::board::normalize_address(&s.address())),
    })
}
