use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use ethers::types::Address;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, timeout, Duration};

use crate::{
    api::{parse_game_address, parse_viewer, AppState},
    board::{BoardSnapshot, PlayerRoles, TurnStatus},
    constants::{WS_CLIENT_TIMEOUT_SECS, WS_HEARTBEAT_INTERVAL_SECS},
    error::{AppError, Result},
    models::{GameStateResponse, ViewerQuery},
    services::{GameSession, SessionNotice},
};

fn connected_payload(game: Address) -> String {
    serde_json::json!({
        "type": "connected",
        "game": format!("{:#x}", game),
    })
    .to_string()
}

fn snapshot_payload(snapshot: &BoardSnapshot, roles: PlayerRoles, viewer: Option<Address>) -> String {
    let turn = TurnStatus::derive(snapshot, roles, viewer);
    serde_json::json!({
        "type": "snapshot",
        "data": GameStateResponse::new(snapshot.clone(), roles, turn),
    })
    .to_string()
}

fn error_payload(err: &AppError) -> serde_json::Value {
    serde_json::json!({
        "type": "error",
        "code": err.status_and_code().1,
        "message": err.to_string(),
    })
}

fn notice_payload(notice: &SessionNotice) -> String {
    serde_json::to_string(notice).unwrap_or_default()
}

/// GET /ws/games/{address}
///
/// Malformed address or viewer input is rejected before the upgrade. The
/// `WIDTH()` probe runs once, inside `GameSession::open`, and an invalid game
/// is reported on the socket as an `error` message.
pub async fn handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(address): Path<String>,
    Query(query): Query<ViewerQuery>,
) -> Result<Response> {
    let game = parse_game_address(&address)?;
    let viewer = parse_viewer(query.viewer.as_deref())?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, game, viewer)))
}

async fn handle_socket(socket: WebSocket, state: AppState, game: Address, viewer: Option<Address>) {
    let (mut sender, mut receiver) = socket.split();

    let session = match GameSession::open(
        Arc::new(state.chain.game(game)),
        Arc::new(state.chain.log_source()),
        state.reconciler.clone(),
        state.bridge.as_ref(),
        viewer,
    )
    .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!("Failed to open session for {:#x}: {}", game, e);
            let payload = error_payload(&e);
            let _ = sender.send(Message::Text(payload.to_string().into())).await;
            let _ = sender.send(Message::Close(None)).await;
            return;
        }
    };

    let roles = session.roles();
    let mut snapshots = session.snapshots();
    let mut notices = session.notices();

    let _ = sender.send(Message::Text(connected_payload(game).into())).await;
    let initial = match (session.current(), session.initial_failure()) {
        (Some(snapshot), _) => snapshot_payload(&snapshot, roles, viewer),
        (None, Some(e)) => notice_payload(&SessionNotice::ReconciliationFailed {
            message: e.to_string(),
        }),
        (None, None) => String::new(),
    };
    if !initial.is_empty() && sender.send(Message::Text(initial.into())).await.is_err() {
        session.close();
        return;
    }

    let mut send_task = tokio::spawn(async move {
        let mut heartbeat = interval(Duration::from_secs(WS_HEARTBEAT_INTERVAL_SECS));

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = snapshots.borrow_and_update().clone();
                    let Some(snapshot) = latest else { continue };
                    let json = snapshot_payload(&snapshot, roles, viewer);
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                result = notices.recv() => {
                    match result {
                        Ok(notice) => {
                            if sender.send(Message::Text(notice_payload(&notice).into())).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Game socket lagged, skipped {} notices", skipped);
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            }
        }
    });

    let mut recv_task = tokio::spawn(async move {
        loop {
            let next_msg = timeout(Duration::from_secs(WS_CLIENT_TIMEOUT_SECS), receiver.next()).await;
            let msg = match next_msg {
                Ok(Some(Ok(msg))) => msg,
                Ok(Some(Err(_))) | Ok(None) => break,
                Err(_) => {
                    tracing::info!("WebSocket client timeout");
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Ignoring client message: {}", text);
                }
                Message::Close(_) => {
                    tracing::info!("Client disconnected");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => {
            recv_task.abort();
        }
        _ = &mut recv_task => {
            send_task.abort();
        }
    }

    tracing::info!(
        "WebSocket connection closed for game {:#x} (subscription active: {})",
        game,
        session.is_subscribed()
    );
    session.close();
}
