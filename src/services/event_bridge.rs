use ethers::types::Address;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};

use crate::{
    config::Config,
    constants::EVENT_TRANSIENT_BACKOFF_MAX_SECS,
    error::Result,
    indexer::{GameEvent, GameLogSource},
};

// Internal helper that checks conditions for `is_transient_rpc_error`.
fn is_transient_rpc_error(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("error decoding response body")
        || lower.contains("too many requests")
        || lower.contains("429")
        || lower.contains("timeout")
        || lower.contains("timed out")
        || lower.contains("gateway")
        || lower.contains("temporarily unavailable")
        || lower.contains("connection reset")
}

// Internal helper that supports `transient_backoff_secs` operations.
fn transient_backoff_secs(base_secs: u64, failures: u32) -> u64 {
    let base = base_secs.max(1);
    let exponent = failures.saturating_sub(1).min(5);
    let candidate = base.saturating_mul(1_u64 << exponent);
    candidate.clamp(base, EVENT_TRANSIENT_BACKOFF_MAX_SECS.max(base))
}

/// Polls a game contract's logs and signals every Move / Capture / End.
pub struct EventBridge {
    poll_interval: Duration,
    max_blocks_per_tick: u64,
}

/// Live event subscription. Released on `unsubscribe` or drop, whichever
/// comes first, so a torn-down session never leaves a poller behind.
pub struct Subscription {
    address: Address,
    handle: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("Released event subscription for {:#x}", self.address);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

struct PollCursor {
    last_block: u64,
    max_blocks_per_tick: u64,
}

impl PollCursor {
    /// Next inclusive block range to scan, if the chain has moved.
    fn next_range(&self, head: u64) -> Option<(u64, u64)> {
        if head <= self.last_block {
            return None;
        }
        let from = self.last_block + 1;
        let to = from
            .saturating_add(self.max_blocks_per_tick.max(1) - 1)
            .min(head);
        Some((from, to))
    }
}

impl EventBridge {
    pub fn new(poll_interval: Duration, max_blocks_per_tick: u64) -> Self {
        Self {
            poll_interval,
            max_blocks_per_tick: max_blocks_per_tick.max(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Duration::from_secs(config.event_poll_interval_secs),
            config.event_max_blocks_per_tick,
        )
    }

    /// Starts watching `address` from the current head block. Events are
    /// delivered to `on_event` in log order; payloads beyond `End` need no
    /// interpretation by the callback.
    pub async fn subscribe<F>(
        &self,
        source: Arc<dyn GameLogSource>,
        address: Address,
        on_event: F,
    ) -> Result<Subscription>
    where
        F: Fn(GameEvent) + Send + Sync + 'static,
    {
        let head = source.head_block().await?;
        let mut cursor = PollCursor {
            last_block: head,
            max_blocks_per_tick: self.max_blocks_per_tick,
        };
        let poll_interval = self.poll_interval;
        let backoff_base_secs = poll_interval.as_secs();

        tracing::info!("Subscribing to game {:#x} events from block {}", address, head);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut transient_failures: u32 = 0;

            loop {
                ticker.tick().await;

                match poll_once(source.as_ref(), address, &mut cursor).await {
                    Ok(events) => {
                        transient_failures = 0;
                        for event in events {
                            tracing::debug!("Game {:#x} emitted {}", address, event.name());
                            let terminal = event.is_terminal();
                            on_event(event);
                            if terminal {
                                tracing::info!("Game {:#x} ended; watching for late logs", address);
                            }
                        }
                    }
                    Err(e) => {
                        let err_text = e.to_string();
                        if is_transient_rpc_error(&err_text) {
                            transient_failures = transient_failures.saturating_add(1);
                            let backoff_secs =
                                transient_backoff_secs(backoff_base_secs, transient_failures);
                            tracing::warn!(
                                "Event bridge transient error: {} (backoff={}s, failures={})",
                                err_text,
                                backoff_secs,
                                transient_failures
                            );
                            sleep(Duration::from_secs(backoff_secs)).await;
                        } else {
                            transient_failures = 0;
                            tracing::error!("Event bridge error for {:#x}: {}", address, err_text);
                        }
                    }
                }
            }
        });

        Ok(Subscription {
            address,
            handle: Some(handle),
        })
    }
}

async fn poll_once(
    source: &dyn GameLogSource,
    address: Address,
    cursor: &mut PollCursor,
) -> Result<Vec<GameEvent>> {
    let head = source.head_block().await?;
    let Some((from, to)) = cursor.next_range(head) else {
        return Ok(Vec::new());
    };
    tracing::debug!("Scanning game {:#x} blocks {} to {} (head: {})", address, from, to, head);
    let events = source.game_events(address, from, to).await?;
    cursor.last_block = to;
    Ok(events)
}
