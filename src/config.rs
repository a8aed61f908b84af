//! Process configuration, read once from the environment at startup

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Default listen address
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Game rules copied into every room when it is created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomRules {
    /// Number of cards in a fresh deck
    pub card_count: u32,
    /// Ready players required before the owner can start
    pub min_players: usize,
    /// Reaching this score ends the game
    pub max_score: u32,
    /// Cards dealt to each player when the game starts
    pub hand_size: usize,
}

impl Default for RoomRules {
    fn default() -> Self {
        Self {
            card_count: 55,
            min_players: 2,
            max_score: 30,
            hand_size: 5,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameConfig {
    pub bind_addr: SocketAddr,
    /// `*` allows any origin
    pub allowed_origin: String,
    pub rules: RoomRules,
    /// Rooms older than this are evicted by the sweeper
    pub room_max_age: Duration,
    /// How often the sweeper runs
    pub sweep_interval: Duration,
    /// HMAC key for session tokens (None = generate one per process)
    pub session_secret: Option<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            allowed_origin: DEFAULT_ALLOWED_ORIGIN.to_string(),
            rules: RoomRules::default(),
            room_max_age: Duration::from_secs(30 * 60),
            sweep_interval: Duration::from_secs(60),
            session_secret: None,
        }
    }
}

impl GameConfig {
    /// Load config from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        let defaults = RoomRules::default();

        let rules = RoomRules {
            card_count: env_or("CARD_COUNT", defaults.card_count),
            min_players: env_or("MIN_PLAYERS", defaults.min_players),
            max_score: env_or("GAME_MAX_SCORE", defaults.max_score),
            hand_size: env_or("HAND_SIZE", defaults.hand_size),
        };

        let bind_addr = env_or(
            "BIND_ADDR",
            SocketAddr::from_str(DEFAULT_BIND_ADDR)
                .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 8080))),
        );

        let allowed_origin = std::env::var("ALLOWED_ORIGIN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGIN.to_string());

        let session_secret = std::env::var("SESSION_SECRET")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if session_secret.is_none() {
            tracing::warn!(
                "SESSION_SECRET not set - tokens are signed with a random key and won't survive a restart"
            );
        }

        let room_max_age_minutes: u64 = env_or("ROOM_MAX_AGE_MINUTES", 30);
        let sweep_seconds = match env_or::<u64>("ROOM_SWEEP_SECONDS", 60) {
            0 => {
                tracing::warn!("Ignoring ROOM_SWEEP_SECONDS=0, using default");
                60
            }
            secs => secs,
        };

        Self {
            bind_addr,
            allowed_origin,
            rules,
            room_max_age: Duration::from_secs(room_max_age_minutes.saturating_mul(60)),
            sweep_interval: Duration::from_secs(sweep_seconds),
            session_secret,
        }
    }
}

/// Parse an environment variable, warning and using `default` when it doesn't parse
fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!("Ignoring unparsable {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
