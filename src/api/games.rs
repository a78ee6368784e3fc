use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    Json,
};

use super::{parse_game_address, parse_viewer, AppState};
use crate::{
    board::{normalize_address, render::render_text, Coord, TurnStatus},
    error::{AppError, Result},
    models::{
        ApiResponse, CreateGameRequest, CreateGameResponse, GameStateResponse, PlayRequest,
        TxResponse, ViewerQuery,
    },
    services::{
        game_directory::{self, GameListing},
        session::{ensure_valid_game, read_roles},
    },
};

/// GET /api/v1/games
pub async fn list_games(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<GameListing>>>> {
    let factory = state.chain.factory()?;
    let games = game_directory::list_games(&factory).await?;
    Ok(Json(ApiResponse::success(games)))
}

/// POST /api/v1/games
pub async fn create_game(
    State(state): State<AppState>,
    Json(req): Json<CreateGameRequest>,
) -> Result<Json<ApiResponse<CreateGameResponse>>> {
    let submitter = state.require_submitter()?;
    let opponent = crate::board::parse_address(&req.opponent)?;
    let factory_address = state.chain.factory_address()?;

    let game = game_directory::create_game(&submitter, factory_address, opponent).await?;
    Ok(Json(ApiResponse::success(CreateGameResponse {
        game_address: normalize_address(&game),
    })))
}

/// GET /api/v1/games/{address}
pub async fn get_game(
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Json<ApiResponse<GameStateResponse>>> {
    let game = parse_game_address(&address)?;
    let viewer = parse_viewer(query.viewer.as_deref())?;
    let reader = state.chain.game(game);

    ensure_valid_game(&reader).await?;
    let roles = read_roles(&reader, viewer).await?;
    let snapshot = state.reconciler.reconcile(&reader).await?;
    let turn = TurnStatus::derive(&snapshot, roles, viewer);

    Ok(Json(ApiResponse::success(GameStateResponse::new(
        snapshot, roles, turn,
    ))))
}

/// GET /api/v1/games/{address}/board
pub async fn get_board_text(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<String> {
    let game = parse_game_address(&address)?;
    let reader = state.chain.game(game);

    ensure_valid_game(&reader).await?;
    let snapshot = state.reconciler.reconcile(&reader).await?;
    Ok(render_text(&snapshot))
}

/// POST /api/v1/games/{address}/play
pub async fn play(
    State(state): State<AppState>,
    Path(address): Path<String>,
    payload: std::result::Result<Json<PlayRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<TxResponse>>> {
    let Json(req) = payload.map_err(|e| AppError::BadRequest(e.body_text()))?;
    let target = Coord::from_signed(req.x, req.y)?;
    let submitter = state.require_submitter()?;
    let game = parse_game_address(&address)?;
    let reader = state.chain.game(game);
    ensure_valid_game(&reader).await?;

    let tx_hash = submitter
        .play(&reader, target.x as usize, target.y as usize)
        .await?;
    Ok(Json(ApiResponse::success(TxResponse {
        tx_hash: format!("{:#x}", tx_hash),
    })))
}

/// POST /api/v1/games/{address}/pass
pub async fn pass(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<ApiResponse<TxResponse>>> {
    let submitter = state.require_submitter()?;
    let game = parse_game_address(&address)?;
    let reader = state.chain.game(game);
    ensure_valid_game(&reader).await?;

    let tx_hash = submitter.pass(&reader).await?;
    Ok(Json(ApiResponse::success(TxResponse {
        tx_hash: format!("{:#x}", tx_hash),
    })))
}
