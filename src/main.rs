use axum::http::HeaderValue;
use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod board;
mod config;
mod constants;
mod error;
mod indexer;
mod models;
mod services;
mod websocket;

use config::Config;
use constants::API_VERSION;
use services::{EventBridge, EvmChain, MoveSubmitter, StateReconciler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "goban_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting Goban Backend Server");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);
    tracing::info!(
        "Chain ID: {} ({})",
        config.chain_id,
        if config.is_testnet() { "testnet" } else { "mainnet" }
    );

    let chain = EvmChain::from_config(&config)?;
    let submitter = MoveSubmitter::from_config(&config, chain.provider())?.map(Arc::new);

    let app_state = api::AppState {
        reconciler: Arc::new(StateReconciler::from_config(&config)),
        bridge: Arc::new(EventBridge::from_config(&config)),
        chain: Arc::new(chain),
        submitter,
        config: config.clone(),
    };

    let app = build_router(app_state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: api::AppState) -> Router {
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Games
        .route(
            "/api/v1/games",
            get(api::games::list_games).post(api::games::create_game),
        )
        .route("/api/v1/games/{address}", get(api::games::get_game))
        .route("/api/v1/games/{address}/board", get(api::games::get_board_text))
        .route("/api/v1/games/{address}/play", post(api::games::play))
        .route("/api/v1/games/{address}/pass", post(api::games::pass))
        // WebSocket endpoints
        .route("/ws/games/{address}", get(websocket::game::handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}
