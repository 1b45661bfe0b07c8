use std::env;
use std::net::SocketAddr;
use std::time::Duration;

/// Timing and randomness of a game.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub night_duration: Duration,
    pub day_duration: Duration,
    // pause after a resolution so players can read the outcome
    pub reveal_delay: Duration,
    // fixed seed for role assignment; None draws from the OS
    pub role_seed: Option<u64>,
    pub channel_capacity: usize,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            night_duration: Duration::from_secs(25),
            day_duration: Duration::from_secs(35),
            reveal_delay: Duration::from_secs(5),
            role_seed: None,
            channel_capacity: 1000,
        }
    }
}

impl GameConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            night_duration: env_seconds("MAFIA_NIGHT_SECONDS").unwrap_or(defaults.night_duration),
            day_duration: env_seconds("MAFIA_DAY_SECONDS").unwrap_or(defaults.day_duration),
            reveal_delay: env_seconds("MAFIA_REVEAL_SECONDS").unwrap_or(defaults.reveal_delay),
            role_seed: env_parse("MAFIA_ROLE_SEED"),
            channel_capacity: env_parse("MAFIA_CHANNEL_CAPACITY")
                .filter(|c| *c > 0)
                .unwrap_or(defaults.channel_capacity),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub allowed_origin: String,
    pub log_level: tracing::Level,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([127, 0, 0, 1], 8080)),
            allowed_origin: "http://localhost:3000".to_string(),
            log_level: tracing::Level::DEBUG,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            addr: env_parse("MAFIA_BIND_ADDR").unwrap_or(defaults.addr),
            allowed_origin: env::var("MAFIA_ALLOWED_ORIGIN").unwrap_or(defaults.allowed_origin),
            log_level: env_parse("MAFIA_LOG_LEVEL").unwrap_or(defaults.log_level),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_seconds(key: &str) -> Option<Duration> {
    env_parse::<u64>(key).map(Duration::from_secs)
}
