pub mod event_parser;
pub mod evm_client;

pub use event_parser::GameEvent;
pub use evm_client::GameLogSource;
