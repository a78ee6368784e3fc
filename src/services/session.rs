use ethers::types::Address;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::{
    board::{BoardSnapshot, PlayerRoles, TurnStatus},
    constants::{BOARD_WIDTH, SESSION_NOTICE_CAPACITY},
    error::{AppError, Result},
    indexer::{GameEvent, GameLogSource},
    services::{
        event_bridge::{EventBridge, Subscription},
        onchain::GameReader,
        reconciler::StateReconciler,
        snapshot_store::{SnapshotReceiver, SnapshotStore},
    },
};

/// Out-of-band messages for a session's viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionNotice {
    ReconciliationFailed {
        message: String,
    },
    GameOver {
        result: String,
        black_score: String,
        white_score: String,
    },
}

/// `WIDTH()` doubles as a probe that the address hosts a game contract.
pub async fn ensure_valid_game<R>(reader: &R) -> Result<()>
where
    R: GameReader + ?Sized,
{
    let address = reader.address();
    match reader.width().await {
        Ok(width) if width as usize == BOARD_WIDTH => Ok(()),
        Ok(width) => Err(AppError::InvalidGameAddress(format!(
            "{:#x} reports board width {}",
            address, width
        ))),
        Err(e) => {
            tracing::debug!("WIDTH probe failed for {:#x}: {}", address, e);
            Err(AppError::InvalidGameAddress(format!("{:#x}", address)))
        }
    }
}

pub async fn read_roles<R>(reader: &R, viewer: Option<Address>) -> Result<PlayerRoles>
where
    R: GameReader + ?Sized,
{
    if viewer.is_none() {
        return Ok(PlayerRoles::default());
    }
    let (black, white) = tokio::try_join!(reader.black(), reader.white())?;
    Ok(PlayerRoles::derive(black, white, viewer))
}

/// One viewer's binding to a game: snapshot container, role flags and the
/// event subscription that keeps the snapshot fresh. Dropping the session
/// releases the subscription.
pub struct GameSession {
    address: Address,
    viewer: Option<Address>,
    roles: PlayerRoles,
    store: SnapshotStore,
    notices: broadcast::Sender<SessionNotice>,
    initial_failure: Option<AppError>,
    subscription: Subscription,
}

// Internal helper that supports `spawn_refresh` operations.
fn spawn_refresh(
    reader: Arc<dyn GameReader>,
    reconciler: Arc<StateReconciler>,
    store: SnapshotStore,
    notices: broadcast::Sender<SessionNotice>,
) {
    tokio::spawn(async move {
        if let Err(e) = store.refresh(reconciler.as_ref(), reader.as_ref()).await {
            let _ = notices.send(SessionNotice::ReconciliationFailed {
                message: e.to_string(),
            });
        }
    });
}

impl GameSession {
    pub async fn open(
        reader: Arc<dyn GameReader>,
        log_source: Arc<dyn GameLogSource>,
        reconciler: Arc<StateReconciler>,
        bridge: &EventBridge,
        viewer: Option<Address>,
    ) -> Result<Self> {
        let address = reader.address();
        ensure_valid_game(reader.as_ref()).await?;

        let store = SnapshotStore::new();
        let (notices, _) = broadcast::channel(SESSION_NOTICE_CAPACITY);

        // Subscribe before the first read so nothing between them is missed.
        // Any `?` below drops the subscription with the rest of the setup.
        let subscription = {
            let (reader, reconciler, store, notices) =
                (reader.clone(), reconciler.clone(), store.clone(), notices.clone());
            bridge
                .subscribe(log_source, address, move |event| {
                    if let GameEvent::End {
                        result,
                        black_score,
                        white_score,
                    } = &event
                    {
                        tracing::info!(
                            "Game {:#x} ended: {} (black {}, white {})",
                            address,
                            result,
                            black_score,
                            white_score
                        );
                        let _ = notices.send(SessionNotice::GameOver {
                            result: result.clone(),
                            black_score: black_score.clone(),
                            white_score: white_score.clone(),
                        });
                    }
                    spawn_refresh(reader.clone(), reconciler.clone(), store.clone(), notices.clone());
                })
                .await?
        };

        let roles = read_roles(reader.as_ref(), viewer).await?;

        let initial_failure = store
            .refresh(reconciler.as_ref(), reader.as_ref())
            .await
            .err();

        tracing::info!(
            "Opened session for game {:#x} (viewer: {:?}, black: {}, white: {})",
            address,
            viewer,
            roles.is_black_player,
            roles.is_white_player
        );

        Ok(Self {
            address,
            viewer,
            roles,
            store,
            notices,
            initial_failure,
            subscription,
        })
    }

    pub fn roles(&self) -> PlayerRoles {
        self.roles
    }

    pub fn current(&self) -> Option<Arc<BoardSnapshot>> {
        self.store.current()
    }

    pub fn turn_status(&self, snapshot: &BoardSnapshot) -> TurnStatus {
        TurnStatus::derive(snapshot, self.roles, self.viewer)
    }

    pub fn initial_failure(&self) -> Option<&AppError> {
        self.initial_failure.as_ref()
    }

    pub fn snapshots(&self) -> SnapshotReceiver {
        self.store.subscribe()
    }

    pub fn notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notices.subscribe()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Explicit teardown; dropping the session has the same effect.
    pub fn close(self) {
        tracing::info!("Closing session for game {:#x}", self.address);
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake_chain::{addr, FakeGameReader, FakeLogSource};
    use std::sync::atomic::Ordering;
    use tokio::time::Duration;

    fn bridge() -> EventBridge {
        EventBridge::new(Duration::from_millis(10), 100)
    }

    #[tokio::test]
    async fn invalid_address_is_rejected_before_subscribing() {
        let mut reader = FakeGameReader::new();
        reader.valid = false;
        let source = Arc::new(FakeLogSource::new(1));

        let result =
            GameSession::open(Arc::new(reader), source.clone(), Arc::default(), &bridge(), None).await;
        assert!(matches!(result, Err(AppError::InvalidGameAddress(_))));
        assert_eq!(source.polls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn role_read_failure_releases_subscription() {
        let mut reader = FakeGameReader::new();
        reader.fail_roles = true;
        let source = Arc::new(FakeLogSource::new(1));

        let result = GameSession::open(
            Arc::new(reader),
            source.clone(),
            Arc::default(),
            &bridge(),
            Some(addr(1)),
        )
        .await;
        assert!(result.is_err());

        tokio::time::sleep(Duration::from_millis(30)).await;
        let polls = source.polls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(source.polls.load(Ordering::SeqCst), polls);
    }

    #[tokio::test]
    async fn opens_with_roles_and_initial_snapshot() {
        let reader = Arc::new(FakeGameReader::new().with_stone(0, 1));
        let source = Arc::new(FakeLogSource::new(5));

        let session = GameSession::open(reader, source, Arc::default(), &bridge(), Some(addr(1)))
            .await
            .unwrap();
        assert!(session.roles().is_black_player);
        assert!(session.initial_failure().is_none());
        assert!(session.is_subscribed());

        let snapshot = session.current().unwrap();
        assert_eq!(snapshot.move_count, 1);
        let status = session.turn_status(&snapshot);
        assert!(status.is_my_turn);
        assert!(status.can_submit);
        session.close();
    }

    #[tokio::test]
    async fn move_event_triggers_fresh_snapshot() {
        let reader = Arc::new(FakeGameReader::new());
        let source = Arc::new(FakeLogSource::new(5));
        let session = GameSession::open(
            reader.clone(),
            source.clone(),
            Arc::default(),
            &bridge(),
            None,
        )
        .await
        .unwrap();
        let mut snapshots = session.snapshots();
        assert_eq!(session.current().unwrap().move_count, 0);

        reader.set_state(40, 1);
        source.emit(GameEvent::Move {
            player: addr(1),
            x: "2".to_string(),
            y: "2".to_string(),
        });

        tokio::time::timeout(Duration::from_secs(1), snapshots.changed())
            .await
            .unwrap()
            .unwrap();
        let latest = session.current().unwrap();
        assert_eq!(latest.move_count, 1);
        assert_eq!(latest.stone_at(2, 2), Some(crate::board::StoneColor::Black));
    }

    #[tokio::test]
    async fn end_event_is_broadcast_with_scores() {
        let reader = Arc::new(FakeGameReader::new());
        let source = Arc::new(FakeLogSource::new(5));
        let session = GameSession::open(reader, source.clone(), Arc::default(), &bridge(), None)
            .await
            .unwrap();
        let mut notices = session.notices();

        source.emit(GameEvent::End {
            result: "Black wins".to_string(),
            black_score: "81".to_string(),
            white_score: "74".to_string(),
        });

        let notice = tokio::time::timeout(Duration::from_secs(1), notices.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            notice,
            SessionNotice::GameOver {
                result: "Black wins".to_string(),
                black_score: "81".to_string(),
                white_score: "74".to_string(),
            }
        );
    }

    #[tokio::test]
    async fn failed_event_refresh_notifies_and_keeps_last_snapshot() {
        let reader = Arc::new(FakeGameReader::new().with_stone(0, 1));
        let source = Arc::new(FakeLogSource::new(5));
        let session = GameSession::open(reader.clone(), source.clone(), Arc::default(), &bridge(), None)
            .await
            .unwrap();
        let before = session.current().unwrap();
        let mut notices = session.notices();

        reader.set_state(5, 9);
        source.emit(GameEvent::Unknown);

        let notice = tokio::time::timeout(Duration::from_secs(1), notices.recv())
            .await
            .unwrap()
            .unwrap();
        match notice {
            SessionNotice::ReconciliationFailed { message } => {
                assert!(message.contains("Unknown intersection state"), "{}", message)
            }
            other => panic!("expected ReconciliationFailed, got {:?}", other),
        }
        assert!(Arc::ptr_eq(&session.current().unwrap(), &before));
        assert!(session.is_subscribed());
    }

    #[tokio::test]
    async fn initial_reconciliation_failure_keeps_session_open() {
        let mut reader = FakeGameReader::new();
        reader.failing_indices = (10..20).collect();
        let source = Arc::new(FakeLogSource::new(5));

        let session = GameSession::open(Arc::new(reader), source, Arc::default(), &bridge(), None)
            .await
            .unwrap();
        assert!(matches!(
            session.initial_failure(),
            Some(AppError::ReconciliationFailed(_))
        ));
        assert!(session.current().is_none());
    }
}
