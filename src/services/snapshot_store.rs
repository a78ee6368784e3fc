use std::sync::Arc;
use tokio::sync::watch;

use crate::{
    board::BoardSnapshot,
    error::Result,
    services::{onchain::GameReader, reconciler::StateReconciler},
};

pub type SnapshotReceiver = watch::Receiver<Option<Arc<BoardSnapshot>>>;

/// Replace-only holder of the latest `BoardSnapshot` for one game.
///
/// Overlapping refreshes are not cancelled: whichever completes last is what
/// readers see, regardless of dispatch order.
#[derive(Clone)]
pub struct SnapshotStore {
    tx: Arc<watch::Sender<Option<Arc<BoardSnapshot>>>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    pub fn current(&self) -> Option<Arc<BoardSnapshot>> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> SnapshotReceiver {
        self.tx.subscribe()
    }

    pub fn publish(&self, snapshot: BoardSnapshot) -> Arc<BoardSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(Some(snapshot.clone()));
        snapshot
    }

    /// Reconciles and publishes. On failure the previous snapshot stays.
    pub async fn refresh<R>(&self, reconciler: &StateReconciler, reader: &R) -> Result<Arc<BoardSnapshot>>
    where
        R: GameReader + ?Sized,
    {
        let snapshot = reconciler.reconcile(reader).await?;
        Ok(self.publish(snapshot))
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fake_chain::{addr, FakeGameReader};
    use tokio::time::Duration;

    #[tokio::test]
    async fn failed_refresh_keeps_previous_snapshot() {
        let store = SnapshotStore::new();
        let reconciler = StateReconciler::default();

        let good = FakeGameReader::new().with_stone(0, 1);
        let first = store.refresh(&reconciler, &good).await.unwrap();

        let mut bad = FakeGameReader::new();
        bad.failing_indices = (10..20).collect();
        assert!(store.refresh(&reconciler, &bad).await.is_err());

        let current = store.current().unwrap();
        assert!(Arc::ptr_eq(&current, &first));
        assert_eq!(current.move_count, 1);
    }

    #[tokio::test]
    async fn subscribers_see_whole_replacements() {
        let store = SnapshotStore::new();
        let mut rx = store.subscribe();
        assert!(rx.borrow().is_none());

        let reader = FakeGameReader::new().with_stone(3, 2);
        store.refresh(&StateReconciler::default(), &reader).await.unwrap();

        rx.changed().await.unwrap();
        let seen = rx.borrow().clone().unwrap();
        assert_eq!(seen.move_count, 1);
        assert_eq!(seen.contract_address, addr(0xaa));
    }

    // Accepted behaviour: ordering is by completion, not dispatch.
    #[tokio::test]
    async fn last_completed_pass_wins_over_later_dispatch() {
        let store = SnapshotStore::new();
        let reconciler = Arc::new(StateReconciler::default());

        let mut slow = FakeGameReader::new().with_stone(0, 1);
        slow.delay = Duration::from_millis(60);
        let fast = FakeGameReader::new().with_stone(0, 1).with_stone(1, 2);

        let first = {
            let (store, reconciler) = (store.clone(), reconciler.clone());
            tokio::spawn(async move { store.refresh(&reconciler, &slow).await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let (store, reconciler) = (store.clone(), reconciler.clone());
            tokio::spawn(async move { store.refresh(&reconciler, &fast).await })
        };

        second.await.unwrap().unwrap();
        assert_eq!(store.current().unwrap().move_count, 2);

        first.await.unwrap().unwrap();
        assert_eq!(store.current().unwrap().move_count, 1);
    }
}
