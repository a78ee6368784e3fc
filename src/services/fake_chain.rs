//! In-memory stand-ins for the contract read seams.

use ethers::types::Address;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::time::{sleep, Duration};

use crate::{
    constants::INTERSECTION_COUNT,
    error::{AppError, Result},
    indexer::{GameEvent, GameLogSource},
    services::onchain::GameReader,
};

pub fn addr(byte: u8) -> Address {
    Address::from([byte; 20])
}

pub struct FakeGameReader {
    pub address: Address,
    pub valid: bool,
    pub black: Address,
    pub white: Address,
    pub turn: Address,
    pub captured_white: u64,
    pub captured_black: u64,
    pub states: Mutex<Vec<u8>>,
    pub failing_indices: HashSet<usize>,
    pub fail_roles: bool,
    pub delay: Duration,
    in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
    pub intersection_reads: AtomicUsize,
}

impl FakeGameReader {
    pub fn new() -> Self {
        Self {
            address: addr(0xaa),
            valid: true,
            black: addr(1),
            white: addr(2),
            turn: addr(1),
            captured_white: 0,
            captured_black: 0,
            states: Mutex::new(vec![0; INTERSECTION_COUNT]),
            failing_indices: HashSet::new(),
            fail_roles: false,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            intersection_reads: AtomicUsize::new(0),
        }
    }

    pub fn with_stone(self, index: usize, state: u8) -> Self {
        self.set_state(index, state);
        self
    }

    pub fn set_state(&self, index: usize, state: u8) {
        if let Ok(mut states) = self.states.lock() {
            states[index] = state;
        }
    }
}

#[async_trait::async_trait]
impl GameReader for FakeGameReader {
    fn address(&self) -> Address {
        self.address
    }

    async fn width(&self) -> Result<u64> {
        if self.valid {
            Ok(19)
        } else {
            Err(AppError::BlockchainRPC("execution reverted".to_string()))
        }
    }

    async fn black(&self) -> Result<Address> {
        if self.fail_roles {
            return Err(AppError::BlockchainRPC("black: timeout".to_string()));
        }
        Ok(self.black)
    }

    async fn white(&self) -> Result<Address> {
        Ok(self.white)
    }

    async fn turn(&self) -> Result<Address> {
        Ok(self.turn)
    }

    async fn captured_white_stones(&self) -> Result<u64> {
        Ok(self.captured_white)
    }

    async fn captured_black_stones(&self) -> Result<u64> {
        Ok(self.captured_black)
    }

    async fn white_passed_once(&self) -> Result<bool> {
        Ok(false)
    }

    async fn black_passed_once(&self) -> Result<bool> {
        Ok(true)
    }

    async fn intersection_state(&self, index: usize) -> Result<u8> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.intersection_reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        } else {
            tokio::task::yield_now().await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing_indices.contains(&index) {
            return Err(AppError::BlockchainRPC(format!("intersections({}): 429", index)));
        }
        let states = self
            .states
            .lock()
            .map_err(|_| AppError::Internal("poisoned".to_string()))?;
        Ok(states[index])
    }
}

/// Scripted log feed: events are keyed by block number.
pub struct FakeLogSource {
    pub head: AtomicU64,
    pub events: Mutex<BTreeMap<u64, Vec<GameEvent>>>,
    pub polls: AtomicUsize,
}

impl FakeLogSource {
    pub fn new(head: u64) -> Self {
        Self {
            head: AtomicU64::new(head),
            events: Mutex::new(BTreeMap::new()),
            polls: AtomicUsize::new(0),
        }
    }

    pub fn emit(&self, event: GameEvent) {
        let block = self.head.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut events) = self.events.lock() {
            events.entry(block).or_default().push(event);
        }
    }
}

#[async_trait::async_trait]
impl GameLogSource for FakeLogSource {
    async fn head_block(&self) -> Result<u64> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        Ok(self.head.load(Ordering::SeqCst))
    }

    async fn game_events(&self, _game: Address, from_block: u64, to_block: u64) -> Result<Vec<GameEvent>> {
        let events = self
            .events
            .lock()
            .map_err(|_| AppError::Internal("poisoned".to_string()))?;
        Ok(events
            .range(from_block..=to_block)
            .flat_map(|(_, evs)| evs.iter().cloned())
            .collect())
    }
}
