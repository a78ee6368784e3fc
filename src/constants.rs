/// Application constants

// Board geometry (row-major on-chain storage)
pub const BOARD_WIDTH: usize = 19;
pub const INTERSECTION_COUNT: usize = BOARD_WIDTH * BOARD_WIDTH;
pub const STAR_POINTS: [usize; 3] = [3, 9, 15];

// On-chain intersection state enum
pub const STATE_EMPTY: u8 = 0;
pub const STATE_BLACK: u8 = 1;
pub const STATE_WHITE: u8 = 2;

// Reconciliation
pub const RECONCILE_BATCH_SIZE_DEFAULT: usize = 10;

// Event bridge
pub const EVENT_POLL_INTERVAL_SECS_DEFAULT: u64 = 4;
pub const EVENT_MAX_BLOCKS_PER_TICK_DEFAULT: u64 = 500;
pub const EVENT_TRANSIENT_BACKOFF_MAX_SECS: u64 = 120;

// Chain
pub const CHAIN_ID_SEPOLIA: u64 = 11_155_111;

// API version
pub const API_VERSION: &str = "v1";

// WebSocket configuration
pub const WS_HEARTBEAT_INTERVAL_SECS: u64 = 30;
pub const WS_CLIENT_TIMEOUT_SECS: u64 = 90;
pub const SESSION_NOTICE_CAPACITY: usize = 32;
