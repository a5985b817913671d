// Leveling
pub const MAX_LEVEL: u32 = 40;
pub const LEVEL_CURVE_BASE: f64 = 1000.0;
pub const LEVEL_CURVE_GROWTH: f64 = 1.2;

// Base stats for a freshly created character
pub const BASE_HP: u32 = 100;
pub const BASE_MP: u32 = 50;
pub const BASE_PHYSICAL_ATTACK: u32 = 10;
pub const BASE_MAGICAL_ATTACK: u32 = 5;
pub const BASE_DEFENSE: u32 = 5;
pub const BASE_HIT_RATE: u32 = 5;

// Character names
pub const MAX_NAME_LEN: usize = 16;

// Storage layout (relative to the data directory)
pub const DATA_DIR_NAME: &str = ".riverstone";
pub const CHARACTER_DATA_FILE: &str = "character_data.json";
pub const REQUEST_FILE: &str = "request.txt";
pub const RESPONSE_FILE: &str = "response.txt";

// Store lock
pub const STORE_LOCK_TIMEOUT_MS: u64 = 2_000;
pub const STORE_LOCK_RETRY_MS: u64 = 10;

// Transports
pub const DEFAULT_SOCKET_ADDR: &str = "127.0.0.1:5554";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 250;
pub const DEFAULT_REPLY_TIMEOUT_SECONDS: u64 = 10;
pub const MAX_REQUEST_LEN: usize = 8 * 1024;
pub const MAX_REPLY_LEN: usize = 1024 * 1024;
