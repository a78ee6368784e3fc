use futures_util::{
    future::try_join_all,
    stream::{self, StreamExt, TryStreamExt},
};
use std::ops::Range;

use crate::{
    board::{BoardSnapshot, ScalarReads},
    config::Config,
    constants::{INTERSECTION_COUNT, RECONCILE_BATCH_SIZE_DEFAULT},
    error::{AppError, Result},
    services::onchain::GameReader,
};

/// Builds one consistent `BoardSnapshot` from a batch of contract reads.
///
/// Intersections are fetched in fixed-size batches; every read inside a batch
/// is concurrent and, by default, all batches are launched at once. Results are
/// reassembled by position, so completion order does not matter.
///
/// The reads are not one atomic call: a move landing mid-pass can be partially
/// visible. The next event triggers another pass that picks it up.
pub struct StateReconciler {
    batch_size: usize,
    /// `0` launches every batch at once.
    max_inflight_batches: usize,
}

// Internal helper that supports `batch_ranges` operations.
fn batch_ranges(total: usize, batch_size: usize) -> Vec<Range<usize>> {
    let size = batch_size.max(1);
    (0..total.div_ceil(size))
        .map(|chunk| {
            let start = chunk * size;
            start..(start + size).min(total)
        })
        .collect()
}

impl StateReconciler {
    pub fn new(batch_size: usize, max_inflight_batches: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            max_inflight_batches,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.reconcile_batch_size, config.reconcile_max_inflight_batches)
    }

    /// Runs one full pass. Any failed read fails the whole pass with
    /// `ReconciliationFailed`; no partial snapshot is returned.
    pub async fn reconcile<R>(&self, reader: &R) -> Result<BoardSnapshot>
    where
        R: GameReader + ?Sized,
    {
        let address = reader.address();
        match self.read_snapshot(reader).await {
            Ok(snapshot) => {
                tracing::info!(
                    "Reconciled game {:#x}: {} stones, turn {:#x}",
                    address,
                    snapshot.move_count,
                    snapshot.turn_address
                );
                Ok(snapshot)
            }
            Err(e) => {
                tracing::warn!("Reconciliation failed for game {:#x}: {}", address, e);
                Err(match e {
                    AppError::ReconciliationFailed(_) => e,
                    other => AppError::ReconciliationFailed(other.to_string()),
                })
            }
        }
    }

    async fn read_snapshot<R>(&self, reader: &R) -> Result<BoardSnapshot>
    where
        R: GameReader + ?Sized,
    {
        let scalars = self.read_scalars(reader).await?;
        let states = self.read_intersections(reader).await?;
        BoardSnapshot::from_reads(reader.address(), scalars, &states)
    }

    async fn read_scalars<R>(&self, reader: &R) -> Result<ScalarReads>
    where
        R: GameReader + ?Sized,
    {
        let (turn, captured_white, captured_black, white_passed_once, black_passed_once) = tokio::try_join!(
            reader.turn(),
            reader.captured_white_stones(),
            reader.captured_black_stones(),
            reader.white_passed_once(),
            reader.black_passed_once(),
        )?;
        Ok(ScalarReads {
            turn,
            captured_white,
            captured_black,
            white_passed_once,
            black_passed_once,
        })
    }

    async fn read_intersections<R>(&self, reader: &R) -> Result<Vec<u8>>
    where
        R: GameReader + ?Sized,
    {
        let batches = batch_ranges(INTERSECTION_COUNT, self.batch_size);
        let inflight = match self.max_inflight_batches {
            0 => batches.len(),
            n => n,
        };

        // `buffered` yields in input order, which keeps index -> state positional.
        let chunks: Vec<Vec<u8>> = stream::iter(batches)
            .map(|range| read_batch(reader, range))
            .buffered(inflight.max(1))
            .try_collect()
            .await?;

        Ok(chunks.into_iter().flatten().collect())
    }
}

async fn read_batch<R>(reader: &R, range: Range<usize>) -> Result<Vec<u8>>
where
    R: GameReader + ?Sized,
{
    try_join_all(range.map(|index| reader.intersection_state(index))).await
}

impl Default for StateReconciler {
    fn default() -> Self {
        Self::new(RECONCILE_BATCH_SIZE_DEFAULT, 0)
    }
}
