// src/models/mod.rs
pub mod game;
pub mod response;

pub use game::{
    CreateGameRequest, CreateGameResponse, GameStateResponse, PlayRequest, TxResponse, ViewerQuery,
};
pub use response::ApiResponse;
