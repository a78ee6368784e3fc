use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error("Invalid game address or game not found: {0}")]
    InvalidGameAddress(String),

    #[error("Reconciliation failed: {0}")]
    ReconciliationFailed(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Missing wallet or player role: {0}")]
    MissingWalletOrRole(String),

    #[error("Coordinate out of range: ({x}, {y})")]
    OutOfRange { x: i64, y: i64 },

    #[error("Intersection index out of range: {0}")]
    IndexOutOfRange(usize),

    #[error("Unknown intersection state: {0}")]
    UnknownState(u8),

    #[error("Blockchain RPC error: {0}")]
    BlockchainRPC(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl AppError {
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::InvalidGameAddress(_) => (StatusCode::NOT_FOUND, "INVALID_GAME"),
            AppError::ReconciliationFailed(_) => (StatusCode::BAD_GATEWAY, "RECONCILIATION_FAILED"),
            AppError::TransactionFailed(_) => (StatusCode::BAD_GATEWAY, "TRANSACTION_FAILED"),
            AppError::MissingWalletOrRole(_) => (StatusCode::FORBIDDEN, "MOVE_NOT_ALLOWED"),
            AppError::OutOfRange { .. } => (StatusCode::BAD_REQUEST, "OUT_OF_RANGE"),
            AppError::IndexOutOfRange(_) => (StatusCode::BAD_REQUEST, "OUT_OF_RANGE"),
            AppError::UnknownState(_) => (StatusCode::BAD_GATEWAY, "UNKNOWN_STATE"),
            AppError::BlockchainRPC(_) => (StatusCode::BAD_GATEWAY, "BLOCKCHAIN_RPC_ERROR"),
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }

        let body = Json(ErrorResponse {
            success: false,
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn taxonomy_maps_to_expected_codes() {
        assert_eq!(
            AppError::InvalidGameAddress("0xabc".into()).status_and_code(),
            (StatusCode::NOT_FOUND, "INVALID_GAME")
        );
        assert_eq!(
            AppError::MissingWalletOrRole("no signer".into()).status_and_code(),
            (StatusCode::FORBIDDEN, "MOVE_NOT_ALLOWED")
        );
        assert_eq!(
            AppError::OutOfRange { x: 19, y: 0 }.status_and_code().0,
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn reconciliation_failure_keeps_cause_in_message() {
        let err = AppError::ReconciliationFailed("timeout at index 12".into());
        assert!(err.to_string().contains("timeout at index 12"));
    }
}
