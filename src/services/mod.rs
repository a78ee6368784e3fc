// All service modules
pub mod event_bridge;
pub mod game_directory;
pub mod move_submitter;
pub mod onchain;
pub mod reconciler;
pub mod session;
pub mod snapshot_store;

#[cfg(test)]
pub(crate) mod fake_chain;

// Re-export for convenience
pub use event_bridge::EventBridge;
pub use move_submitter::MoveSubmitter;
pub use onchain::EvmChain;
pub use reconciler::StateReconciler;
pub use session::{GameSession, SessionNotice};
